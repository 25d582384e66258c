//! Fixed-interval retry policy for failed deliveries.
//!
//! Every failed attempt is followed by the same wait. The policy only
//! decides whether another attempt happens; an event that runs out of
//! attempts is dropped by the worker and still signaled as completed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many retries follow the first failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryLimit {
    /// Retry until delivery succeeds or the output shuts down.
    Unlimited,
    /// Retry at most this many times.
    Limited(u32),
}

impl RetryLimit {
    /// Converts the configuration convention where `-1` means unlimited.
    ///
    /// Any other negative value is treated as unlimited as well; configuration
    /// validation rejects those before they get here.
    pub fn from_max_retries(max_retries: i32) -> Self {
        u32::try_from(max_retries).map_or(Self::Unlimited, Self::Limited)
    }
}

/// Retry policy shared by all workers of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retry budget per event.
    pub limit: RetryLimit,

    /// Wait between consecutive attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_max_retries(
            crate::DEFAULT_MAX_RETRIES,
            Duration::from_millis(crate::DEFAULT_RETRY_INTERVAL_MS),
        )
    }
}

/// Result of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempt again after waiting.
    Retry {
        /// How long to wait before the next attempt
        delay: Duration,
    },
    /// Stop attempting.
    GiveUp {
        /// Reason why the event will not be retried
        reason: String,
    },
}

impl RetryPolicy {
    /// Creates a policy from the `max_retries` configuration value.
    pub fn from_max_retries(max_retries: i32, interval: Duration) -> Self {
        Self { limit: RetryLimit::from_max_retries(max_retries), interval }
    }

    /// Decides what follows a failed attempt.
    ///
    /// `failed_attempts` counts every failed attempt for the event so far,
    /// including the one just made. With `Limited(n)` an event gets `n + 1`
    /// attempts in total. `guaranteed` events ignore the limit.
    pub fn decide(&self, failed_attempts: u32, guaranteed: bool) -> RetryDecision {
        let retry = RetryDecision::Retry { delay: self.interval };

        if guaranteed {
            return retry;
        }

        match self.limit {
            RetryLimit::Unlimited => retry,
            RetryLimit::Limited(max_retries) if failed_attempts < max_retries.saturating_add(1) => {
                retry
            },
            RetryLimit::Limited(max_retries) => RetryDecision::GiveUp {
                reason: format!(
                    "maximum retries ({max_retries}) exhausted after {failed_attempts} attempts"
                ),
            },
        }
    }
}
