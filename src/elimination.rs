//! A fixed pool of exchangers, one of which is picked at random per visit.
use std::time::Duration;

use crossbeam_utils::CachePadded;
use rand::Rng;

use crate::{
    clock::Clock,
    exchanger::{ExchangeError, Exchanger},
};

pub struct EliminationArray<T>
where
    T: Send,
{
    exchangers: Box<[CachePadded<Exchanger<T>>]>,
    timeout: Duration,
}

impl<T> EliminationArray<T>
where
    T: Send,
{
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        assert!(capacity > 0, "an elimination array needs at least one exchanger");
        Self {
            exchangers: (0..capacity)
                .map(|_| CachePadded::new(Exchanger::new()))
                .collect(),
            timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.exchangers.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exchanges `offer` on one of the first `range` exchangers, picked
    /// uniformly with `rng`.  `range` is clamped to `[1, capacity]`.
    pub fn visit<R: Rng + ?Sized, C: Clock>(
        &self,
        offer: Option<T>,
        range: usize,
        rng: &mut R,
        clock: &C,
    ) -> Result<Option<T>, ExchangeError<T>> {
        let range = range.clamp(1, self.capacity());
        let i = rng.gen_range(0..range);
        self.exchangers[i].exchange(offer, self.timeout, clock)
    }

    /// True if every exchanger's slot is empty.
    pub fn is_idle(&self) -> bool {
        self.exchangers.iter().all(|e| e.is_idle())
    }
}
