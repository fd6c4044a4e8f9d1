//! # Treiber's lock-free stack
//!
//! The head of the stack is a single pointer in an `Atom<_, u64>`.  Push and
//! pop are each one compare-and-swap; `try_push` and `try_pop` expose that
//! single attempt so that callers can do something else (such as visiting an
//! elimination array) between attempts.
//!
//! Pop has to dereference the head node to find its successor, which races
//! with other pops freeing that node.  Worse, the node could be freed and a
//! new node allocated at the same address and pushed, so that the CAS on the
//! head succeeds even though the head is semantically different (the "ABA
//! problem").  Both are ruled out by retiring popped nodes through
//! `crossbeam-epoch`: no node is freed while a thread that might have read
//! its address is still pinned, so its address cannot be reused either.
use std::{
    mem::ManuallyDrop,
    ptr::{self, null_mut},
};

use crossbeam_epoch as epoch;

use crate::{atomic_try_update, atomic_try_update_once, Atom};

/// An element of the stack.  `val` is `ManuallyDrop` because a popped value
/// is moved out long before the node itself is reclaimed.
pub struct Node<T> {
    val: ManuallyDrop<T>,
    next: *mut Node<T>,
}

impl<T> Node<T> {
    pub fn boxed(val: T) -> Box<Node<T>> {
        Box::new(Node {
            val: ManuallyDrop::new(val),
            next: null_mut(),
        })
    }

    pub fn into_inner(self: Box<Self>) -> T {
        ManuallyDrop::into_inner(self.val)
    }
}

struct Head<T> {
    head: *mut Node<T>,
}

pub struct TreiberStack<T>
where
    T: Send,
{
    head: Atom<Head<T>, u64>,
}

impl<T> Default for TreiberStack<T>
where
    T: Send,
{
    fn default() -> Self {
        Self {
            head: Default::default(),
        }
    }
}

impl<T> TreiberStack<T>
where
    T: Send,
{
    pub fn new() -> Self {
        Default::default()
    }

    /// Links `node` in as the new head with a single CAS.  Gives the node
    /// back if another thread changed the head first.
    pub fn try_push(&self, node: Box<Node<T>>) -> Result<(), Box<Node<T>>> {
        let node = Box::into_raw(node);
        let linked = unsafe {
            atomic_try_update_once(&self.head, |head: &mut Head<T>| {
                // `node` is still private to us, so this write is not a
                // speculative side effect.
                (*node).next = head.head;
                head.head = node;
                (true, ())
            })
        };
        match linked {
            Some(()) => Ok(()),
            None => Err(unsafe { Box::from_raw(node) }),
        }
    }

    /// Unlinks the head with a single CAS.
    ///
    /// Returns `Ok(Some(v))` if `v` was popped, `Ok(None)` if the stack was
    /// observed empty, and `Err(())` if another thread changed the head first.
    #[allow(clippy::result_unit_err)]
    pub fn try_pop(&self) -> Result<Option<T>, ()> {
        let guard = epoch::pin();
        let node = unsafe {
            atomic_try_update_once(&self.head, |head: &mut Head<T>| {
                let ret = head.head;
                if ret.is_null() {
                    (false, ret)
                } else {
                    // Safe to dereference: `ret` was reachable after we
                    // pinned, so it cannot have been reclaimed yet.
                    head.head = (*ret).next;
                    (true, ret)
                }
            })
        };
        match node {
            None => Err(()),
            Some(node) if node.is_null() => Ok(None),
            Some(node) => unsafe {
                let val = ptr::read(&(*node).val);
                guard.defer_unchecked(move || drop(Box::from_raw(node)));
                Ok(Some(ManuallyDrop::into_inner(val)))
            },
        }
    }

    pub fn push(&self, val: T) {
        let mut node = Node::boxed(val);
        while let Err(n) = self.try_push(node) {
            node = n;
        }
    }

    /// Returns `None` if the stack is observed to be empty.
    pub fn pop(&self) -> Option<T> {
        loop {
            if let Ok(val) = self.try_pop() {
                return val;
            }
        }
    }
}

impl<T> Drop for TreiberStack<T>
where
    T: Send,
{
    fn drop(&mut self) {
        // No other thread can observe the stack any more, so the nodes can
        // be freed directly instead of going through the epoch collector.
        let mut node = unsafe {
            atomic_try_update(&self.head, |head: &mut Head<T>| {
                let ret = head.head;
                head.head = null_mut();
                (true, ret)
            })
        };
        while !node.is_null() {
            let boxed = unsafe { Box::from_raw(node) };
            node = boxed.next;
            drop(boxed.into_inner());
        }
    }
}
