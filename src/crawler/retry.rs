//! Retry decisions for extraction calls
//!
//! The attempt loop threads an [`AttemptState`] through [`next_action`], so
//! the backoff and escalation policy can be tested without a backend.

use crate::config::HarvesterConfig;
use crate::extract::FailureClass;
use std::time::Duration;

/// Bounded retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per item, including the first (>= 1)
    pub max_attempts: u32,

    /// Fixed unit; the delay after attempt `n` is `n * backoff_unit`
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(2000))
    }
}

impl From<&HarvesterConfig> for RetryPolicy {
    fn from(config: &HarvesterConfig) -> Self {
        Self::new(
            config.max_detail_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }
}

/// Where an item's attempt loop stands after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptState {
    /// 1-based number of the attempt that just failed
    pub attempt: u32,

    pub last_failure: FailureClass,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Wait, then try the same item again
    Retry(Duration),

    /// Permanent failure: count the item as failed and move on
    GiveUp,

    /// Session failures used up every attempt: report to the health monitor
    Escalate,
}

/// Decides the next step of an attempt loop
pub fn next_action(policy: &RetryPolicy, state: &AttemptState) -> NextAction {
    match state.last_failure {
        FailureClass::Permanent => NextAction::GiveUp,
        FailureClass::Session if state.attempt >= policy.max_attempts => NextAction::Escalate,
        FailureClass::Session => NextAction::Retry(policy.backoff_unit * state.attempt),
    }
}
