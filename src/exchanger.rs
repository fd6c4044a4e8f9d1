//! A timed, two-party rendezvous built on a single tagged word.
//!
//! The slot packs a pointer to the parked offer together with a stamp:
//!
//! ```text
//!   (none, Empty) --first arrival--> (a, Waiting) --second arrival--> (b, Busy)
//!        ^                                |                              |
//!        +---------first times out--------+                              |
//!        +-------------------first collects b----------------------------+
//! ```
//!
//! The first arrival parks its offer `a` and polls.  The second arrival swaps
//! `a` out for its own offer `b`, marks the slot `Busy`, and leaves with `a`.
//! The first arrival then takes `b` and empties the slot.  A third thread
//! that finds the slot `Busy` can only wait for the pair to finish.
//!
//! Only complementary offers pair up: exactly one of `a` and `b` must be
//! `None`.  A second arrival whose offer is of the same kind as the parked
//! one treats the slot as `Busy`.  Otherwise two pushers would swap values,
//! and a push could return while its value is still held, unlinked, by
//! another thread.
//!
//! A first arrival whose deadline passes has to take its offer back out of
//! the slot.  It does so with a compensating CAS from `(a, Waiting)` to
//! `(none, Empty)`; if that CAS loses, a partner has already marked the slot
//! `Busy`, and the exchange completes instead of timing out.
use std::{
    error::Error,
    fmt::{Debug, Display},
    ptr::null_mut,
    time::Duration,
};

use crossbeam_utils::Backoff;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::trace;

use crate::{
    atomic_try_update,
    bits::{Align8, FlagPtr},
    clock::Clock,
    Atom,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(usize)]
enum Stamp {
    Empty = 0,
    Waiting,
    Busy,
}

struct Slot<T> {
    flag_ptr: FlagPtr<Align8<T>>,
}

impl<T> Slot<T> {
    fn stamp(&self) -> Stamp {
        match self.flag_ptr.get_flag().try_into() {
            Ok(stamp) => stamp,
            Err(_) => panic!("torn read?"),
        }
    }

    fn set(&mut self, ptr: *mut Align8<T>, stamp: Stamp) {
        self.flag_ptr.set_ptr(ptr);
        self.flag_ptr.set_flag(stamp.into());
    }
}

enum Arrival<T> {
    First,
    Second(*mut Align8<T>),
    Busy,
}

/// Returned by `Exchanger::exchange` when no partner showed up in time.
/// Carries the caller's own offer, untouched.
#[derive(PartialEq, Eq)]
pub enum ExchangeError<T> {
    Timeout(Option<T>),
}

impl<T> ExchangeError<T> {
    pub fn into_inner(self) -> Option<T> {
        match self {
            ExchangeError::Timeout(offer) => offer,
        }
    }
}

impl<T> Debug for ExchangeError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeError::Timeout(_) => write!(f, "Timeout"),
        }
    }
}

impl<T> Display for ExchangeError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<T> Error for ExchangeError<T> {}

/// Lets a thread holding a value hand it to a thread holding `None`, within
/// a time limit.
///
/// `None` is a legitimate offer: a popper has nothing to give and only wants
/// to receive.  Two `Some` offers (or two `None` offers) never pair, so a
/// successful exchange returns `None` to the giver and `Some` to the taker.
pub struct Exchanger<T>
where
    T: Send,
{
    slot: Atom<Slot<T>, u64>,
}

impl<T> Default for Exchanger<T>
where
    T: Send,
{
    fn default() -> Self {
        Self {
            slot: Default::default(),
        }
    }
}

impl<T> Exchanger<T>
where
    T: Send,
{
    pub fn new() -> Self {
        Default::default()
    }

    /// Offers `offer` and waits up to `timeout` (as measured by `clock`) for
    /// a partner with the opposite kind of offer.  Returns the partner's
    /// offer, or hands `offer` back inside `ExchangeError::Timeout`.
    pub fn exchange<C: Clock>(
        &self,
        offer: Option<T>,
        timeout: Duration,
        clock: &C,
    ) -> Result<Option<T>, ExchangeError<T>> {
        let deadline = clock.now() + timeout;
        let mine = Align8::boxed(offer);
        let backoff = Backoff::new();
        while clock.now() < deadline {
            let arrival = unsafe {
                atomic_try_update(&self.slot, |s| match s.stamp() {
                    Stamp::Empty => {
                        s.set(mine, Stamp::Waiting);
                        (true, Arrival::First)
                    }
                    Stamp::Waiting if s.flag_ptr.get_ptr().is_null() == mine.is_null() => {
                        (false, Arrival::Busy)
                    }
                    Stamp::Waiting => {
                        let theirs = s.flag_ptr.get_ptr();
                        s.set(mine, Stamp::Busy);
                        (true, Arrival::Second(theirs))
                    }
                    Stamp::Busy => (false, Arrival::Busy),
                })
            };
            match arrival {
                Arrival::First => return self.await_partner(mine, deadline, clock),
                // The CAS that installed `mine` transferred `theirs` to us.
                Arrival::Second(theirs) => return Ok(unsafe { Align8::unbox(theirs) }),
                Arrival::Busy => backoff.snooze(),
            }
        }
        trace!("exchange timed out before reaching the slot");
        Err(ExchangeError::Timeout(unsafe { Align8::unbox(mine) }))
    }

    /// Returns true if no exchange is parked in or passing through the slot.
    pub fn is_idle(&self) -> bool {
        unsafe { atomic_try_update(&self.slot, |s| (false, s.stamp() == Stamp::Empty)) }
    }

    fn await_partner<C: Clock>(
        &self,
        mine: *mut Align8<T>,
        deadline: std::time::Instant,
        clock: &C,
    ) -> Result<Option<T>, ExchangeError<T>> {
        let backoff = Backoff::new();
        loop {
            let expired = clock.now() >= deadline;
            let outcome = unsafe {
                atomic_try_update(&self.slot, |s| match s.stamp() {
                    Stamp::Busy => {
                        let theirs = s.flag_ptr.get_ptr();
                        s.set(null_mut(), Stamp::Empty);
                        (true, Some(Ok(theirs)))
                    }
                    Stamp::Waiting if expired => {
                        debug_assert_eq!(s.flag_ptr.get_ptr(), mine);
                        s.set(null_mut(), Stamp::Empty);
                        (true, Some(Err(())))
                    }
                    Stamp::Waiting => (false, None),
                    // Only this thread may empty a slot it is waiting in.
                    Stamp::Empty => panic!("exchanger slot emptied under a waiting offer"),
                })
            };
            match outcome {
                Some(Ok(theirs)) => return Ok(unsafe { Align8::unbox(theirs) }),
                Some(Err(())) => {
                    trace!("exchange timed out waiting for a partner");
                    return Err(ExchangeError::Timeout(unsafe { Align8::unbox(mine) }));
                }
                None => backoff.snooze(),
            }
        }
    }
}

impl<T> Drop for Exchanger<T>
where
    T: Send,
{
    fn drop(&mut self) {
        let parked = unsafe {
            atomic_try_update(&self.slot, |s| {
                let ptr = s.flag_ptr.get_ptr();
                s.set(null_mut(), Stamp::Empty);
                (true, ptr)
            })
        };
        drop(unsafe { Align8::unbox(parked) });
    }
}
