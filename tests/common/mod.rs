use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

use elimination_stack::Clock;

/// A clock that moves forward by `step` every time it is read, so that
/// deadlines expire after a known number of polls regardless of how fast
/// the machine is.
pub struct StepClock {
    base: Instant,
    ticks: AtomicU32,
    step: Duration,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            ticks: AtomicU32::new(0),
            step,
        }
    }

    #[allow(dead_code)]
    pub fn reads(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Clock for StepClock {
    fn now(&self) -> Instant {
        self.base + self.step * self.ticks.fetch_add(1, Ordering::SeqCst)
    }
}
