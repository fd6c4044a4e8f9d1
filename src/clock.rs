//! Time source for exchange deadlines.
use std::time::Instant;

/// Something that can tell the time.  Exchanges compute their deadline from
/// it and poll it while waiting, so tests can substitute a clock that advances
/// on every read.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
