//! # Elimination-backoff stack
//!
//! Push and pop first try the Treiber path: a single CAS on the head.  Only
//! when that CAS loses a race does the operation back off into the
//! elimination array, where a push and a pop that collide on the same
//! exchanger cancel out:
//!
//! - push meets pop: the pop leaves with the pushed value, the push is done.
//!   The pair linearizes at the exchange, as if the value had been pushed
//!   and immediately popped.
//! - push meets push, or pop meets pop: the exchanger refuses to pair them,
//!   so each waits for a complementary partner until its timeout.
//! - nobody suitable shows up: the exchange times out and the operation
//!   retries, a push always with its own value.
//!
//! How many exchangers a thread spreads its visits over is decided by that
//! thread's own `RangePolicy`, which learns from the outcomes above.
//!
//! Pop fails with `PopError::EmptyStack` as soon as it observes an empty
//! list; it never waits in the elimination array for a push that might
//! arrive later.
use std::{cell::RefCell, error::Error, fmt::Display};

use thread_local::ThreadLocal;
use tracing::trace;

use crate::{
    clock::{Clock, SystemClock},
    config::{ConfigError, EliminationConfig},
    elimination::EliminationArray,
    exchanger::ExchangeError,
    policy::{PolicyConfig, RangePolicy},
    treiber::{Node, TreiberStack},
};

#[derive(Debug, PartialEq, Eq)]
pub enum PopError {
    EmptyStack,
}

impl Error for PopError {}

impl Display for PopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub struct EliminationBackoffStack<T, C = SystemClock>
where
    T: Send,
    C: Clock,
{
    stack: TreiberStack<T>,
    elimination: EliminationArray<T>,
    policies: ThreadLocal<RefCell<RangePolicy>>,
    policy_config: PolicyConfig,
    clock: C,
}

impl<T> Default for EliminationBackoffStack<T>
where
    T: Send,
{
    fn default() -> Self {
        Self::build(EliminationConfig::default(), SystemClock)
    }
}

impl<T> EliminationBackoffStack<T>
where
    T: Send,
{
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_config(config: EliminationConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<T, C> EliminationBackoffStack<T, C>
where
    T: Send,
    C: Clock,
{
    /// Like `with_config`, but exchange deadlines are measured with `clock`.
    pub fn with_clock(config: EliminationConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: EliminationConfig, clock: C) -> Self {
        Self {
            stack: TreiberStack::new(),
            elimination: EliminationArray::new(config.capacity, config.timeout),
            policies: ThreadLocal::new(),
            policy_config: config.policy,
            clock,
        }
    }

    pub fn push(&self, val: T) {
        let policy = self.policy();
        let mut node = Node::boxed(val);
        loop {
            node = match self.stack.try_push(node) {
                Ok(()) => return,
                Err(node) => node,
            };
            let range = policy.borrow_mut().range();
            match self.elimination.visit(
                Some(node.into_inner()),
                range,
                &mut rand::thread_rng(),
                &self.clock,
            ) {
                Ok(None) => {
                    trace!(range, "push eliminated");
                    policy.borrow_mut().record_elimination_success();
                    return;
                }
                Ok(Some(_)) => unreachable!("two pushes never pair in an exchanger"),
                Err(ExchangeError::Timeout(Some(val))) => {
                    policy.borrow_mut().record_elimination_timeout();
                    node = Node::boxed(val);
                }
                Err(ExchangeError::Timeout(None)) => {
                    unreachable!("a timed-out exchange hands back the offer it was given")
                }
            }
        }
    }

    pub fn pop(&self) -> Result<T, PopError> {
        let policy = self.policy();
        loop {
            match self.stack.try_pop() {
                Ok(Some(val)) => return Ok(val),
                Ok(None) => return Err(PopError::EmptyStack),
                Err(()) => {}
            }
            let range = policy.borrow_mut().range();
            match self
                .elimination
                .visit(None, range, &mut rand::thread_rng(), &self.clock)
            {
                Ok(Some(val)) => {
                    trace!(range, "pop eliminated");
                    policy.borrow_mut().record_elimination_success();
                    return Ok(val);
                }
                Ok(None) => unreachable!("two pops never pair in an exchanger"),
                Err(_) => policy.borrow_mut().record_elimination_timeout(),
            }
        }
    }

    /// The range this thread's policy would currently search, or `None` if
    /// this thread has not pushed or popped yet.
    pub fn current_range(&self) -> Option<usize> {
        self.policies.get().map(|p| p.borrow().current_range())
    }

    pub fn elimination_array(&self) -> &EliminationArray<T> {
        &self.elimination
    }

    fn policy(&self) -> &RefCell<RangePolicy> {
        self.policies.get_or(|| {
            RefCell::new(RangePolicy::with_config(
                self.elimination.capacity(),
                &self.policy_config,
            ))
        })
    }
}
