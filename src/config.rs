//! Construction-time tuning for `EliminationBackoffStack`.
use std::{error::Error, fmt::Display, time::Duration};

use crate::policy::PolicyConfig;

/// Default number of exchangers in the elimination array.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time a single exchange waits for a partner.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EliminationConfig {
    /// Number of exchangers in the elimination array.  Also the upper bound
    /// of every thread's `RangePolicy`.
    pub capacity: usize,
    /// How long one exchange waits for a partner before giving up.
    pub timeout: Duration,
    pub policy: PolicyConfig,
}

impl Default for EliminationConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
            policy: PolicyConfig::default(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCapacity,
    ZeroWindow,
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl EliminationConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// A zero timeout is allowed (every exchange fails immediately, which
    /// degrades the stack to a plain Treiber stack), but the array needs at
    /// least one exchanger and the policy needs a non-empty window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.policy.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }
}
