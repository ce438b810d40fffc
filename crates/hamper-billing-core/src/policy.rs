//! Failure-escalation policy
//!
//! A failed billing attempt never cancels a subscription. Whether it may
//! pause one is a deployment decision, so the policy is injected rather
//! than hardcoded.

use serde::{Deserialize, Serialize};

/// What to do with a subscription whose billing keeps failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the subscription active; it is retried every sweep tick
    RetryForever,
    /// Pause the subscription after this many consecutive failed attempts
    /// since its last successful billing
    PauseAfter {
        /// Consecutive failures tolerated before pausing
        attempts: u32,
    },
}

impl FailurePolicy {
    /// Decide whether a subscription should be paused, given the number of
    /// consecutive failed attempts including the one just recorded
    pub fn should_pause(self, consecutive_failures: u32) -> bool {
        match self {
            Self::RetryForever => false,
            Self::PauseAfter { attempts } => consecutive_failures >= attempts,
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::RetryForever
    }
}
