//! Adaptive choice of how much of the elimination array a thread searches.
//!
//! Each thread keeps its own `RangePolicy`, so none of this is synchronized.
//! The policy counts how many elimination attempts it was asked about and how
//! many of them succeeded or timed out, and nudges the searched range:
//!
//!  - recent successes are plentiful: keep the range as it is;
//!  - timeouts dominate: shrink the range, so colliding threads are more
//!    likely to land on the same exchanger;
//!  - otherwise: grow the range to spread the load.
//!
//! Counters restart every `window` requests.  The range itself carries over.
use tracing::debug;

/// Thresholds for `RangePolicy`.  These are heuristics; only the overall
/// shape (hold, shrink, grow, periodic reset) matters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Number of requests after which the counters reset.
    pub window: usize,
    /// Hold the range while `successes + success_slack >= requests / 2`.
    pub success_slack: usize,
    /// Shrink the range while `timeouts >= requests / 2 + timeout_slack`.
    pub timeout_slack: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            window: 100,
            success_slack: 5,
            timeout_slack: 5,
        }
    }
}

#[derive(Debug)]
pub struct RangePolicy {
    requests: usize,
    successes: usize,
    timeouts: usize,
    range: usize,
    limit: usize,
    config: PolicyConfig,
}

impl RangePolicy {
    /// A policy whose range may grow up to `limit` (the elimination array's
    /// capacity), with the default thresholds.
    pub fn new(limit: usize) -> Self {
        Self::with_config(limit, &PolicyConfig::default())
    }

    pub fn with_config(limit: usize, config: &PolicyConfig) -> Self {
        Self {
            requests: 0,
            successes: 0,
            timeouts: 0,
            range: 0,
            limit,
            config: config.clone(),
        }
    }

    /// Registers one more elimination attempt and returns the range it
    /// should search.  Always in `[0, limit]`.
    pub fn range(&mut self) -> usize {
        self.requests += 1;
        let half = self.requests / 2;
        if self.successes + self.config.success_slack >= half {
            return self.range;
        }
        if self.timeouts >= half + self.config.timeout_slack {
            self.range = self.range.saturating_sub(1);
        } else {
            self.range = (self.range + 1).min(self.limit);
        }
        self.range
    }

    pub fn record_elimination_success(&mut self) {
        self.successes += 1;
        self.refresh();
    }

    pub fn record_elimination_timeout(&mut self) {
        self.timeouts += 1;
        self.refresh();
    }

    /// The range most recently handed out, without counting a request.
    pub fn current_range(&self) -> usize {
        self.range
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn refresh(&mut self) {
        if self.requests < self.config.window {
            return;
        }
        debug!(
            successes = self.successes,
            timeouts = self.timeouts,
            range = self.range,
            "range policy window reset"
        );
        self.requests = 0;
        self.successes = 0;
        self.timeouts = 0;
    }
}
