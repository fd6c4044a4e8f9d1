//! # A lock-free elimination-backoff stack
//!
//! `EliminationBackoffStack` is a Treiber stack with an escape hatch: when a
//! push or pop loses the compare-and-swap race on the top pointer, it visits a
//! randomly chosen `Exchanger` in an `EliminationArray` instead of immediately
//! retrying.  If a push and a pop meet there, they hand the value over
//! privately and both return without ever touching the shared list.
//!
//! Every shared word in this crate (the stack top, each exchanger slot) is an
//! `Atom`, and every transition of those words is written as a small lambda
//! passed to `atomic_try_update` or `atomic_try_update_once`.
use std::marker::PhantomData;

// AtomicCell uses a lock-based fallback for u128 because stable rust does
// not include AtomicU128.  Everything in this crate fits in a u64, so all of
// our Atoms are lock-free on 64-bit targets.
use crossbeam_utils::atomic::AtomicCell;

pub mod bits;
pub mod clock;
pub mod config;
pub mod elimination;
pub mod exchanger;
pub mod policy;
pub mod stack;
pub mod treiber;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, EliminationConfig};
pub use elimination::EliminationArray;
pub use exchanger::{ExchangeError, Exchanger};
pub use policy::{PolicyConfig, RangePolicy};
pub use stack::{EliminationBackoffStack, PopError};
pub use treiber::TreiberStack;

/// An atomic integer of type `U` whose bits are viewed as a `T`.
pub struct Atom<T, U> {
    union: PhantomData<T>,
    inner: AtomicCell<U>,
}

impl<T, U> Default for Atom<T, U>
where
    U: Default + Send,
{
    fn default() -> Self {
        assert!(std::mem::size_of::<T>() <= std::mem::size_of::<U>());
        assert!(
            std::mem::size_of::<U>() <= 2
                || std::mem::size_of::<T>() > std::mem::size_of::<U>() / 2
        );
        Self {
            union: Default::default(),
            inner: Default::default(),
        }
    }
}

// TODO: Restrict these so that ptr T is OK, but most other things are not.
// The public types that embed an Atom carry their own `T: Send` bounds.
unsafe impl<T, U> Sync for Atom<T, U> {}
unsafe impl<T, U> Send for Atom<T, U> {}

/// A compare-and-swap loop over the bits of an `Atom`.
///
/// It loads the integer, reinterprets a copy of it as a `T`, and hands the
/// copy to `func`.  The lambda returns `(bool, R)`: if the flag is false the
/// loop stops and `R` is returned without writing anything; if it is true the
/// edited copy is compare-and-swapped over the value that was loaded.  A lost
/// race reloads and runs the lambda again.
///
/// # Safety
///
/// 1. The lambda must not have side effects that matter if it runs more than
///    once, and must not crash when handed stale input.
///
/// 2. The results of speculative reads must not escape: whatever the lambda
///    computes has to be recomputed on every iteration.
///
/// 3. Read set equivalence: if the compare-and-swap succeeds, every value the
///    lambda observed must still be current.  Values inside the integer are
///    checked by the CAS itself; anything reached through a pointer must be
///    protected some other way (the stacks in this crate pin an epoch).
///
/// If `T` owns memory (for example a `Box`), overwriting it inside the lambda
/// leaks or double-frees, so owned values are always stored as raw pointers.
pub unsafe fn atomic_try_update<T, U, F, R>(state: &Atom<T, U>, func: F) -> R
where
    F: Fn(&mut T) -> (bool, R),
    U: Copy + Eq,
{
    let mut old = state.inner.load();
    let mut newval = old;
    loop {
        let newval_ptr: *mut U = &mut newval;
        let res;
        unsafe {
            let newval_ptr: *mut T = newval_ptr as *mut T;
            res = func(&mut *newval_ptr);
            if !res.0 {
                return res.1;
            }
        }
        match state.inner.compare_exchange(old, newval) {
            Ok(_) => return res.1,
            Err(val) => {
                old = val;
                newval = old;
            }
        }
    }
}

/// A single iteration of `atomic_try_update`.
///
/// Returns `Some(R)` if the lambda declined to update or the compare-and-swap
/// succeeded, and `None` if another thread changed the word first.  Callers
/// that need to interleave other work between attempts (such as the
/// elimination stack) use this instead of the retrying variant.
///
/// # Safety
///
/// The same rules as `atomic_try_update` apply.  The lambda runs exactly once,
/// so it may also perform side effects on memory the caller owns exclusively.
pub unsafe fn atomic_try_update_once<T, U, F, R>(state: &Atom<T, U>, func: F) -> Option<R>
where
    F: FnOnce(&mut T) -> (bool, R),
    U: Copy + Eq,
{
    let old = state.inner.load();
    let mut newval = old;
    let newval_ptr: *mut U = &mut newval;
    let (update, res) = unsafe { func(&mut *(newval_ptr as *mut T)) };
    if !update {
        return Some(res);
    }
    state.inner.compare_exchange(old, newval).ok().map(|_| res)
}
