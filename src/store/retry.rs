//! Retry policy for idempotent journal API reads.
//!
//! Only history fetches go through here. Appends and enrollment submits are
//! never retried automatically.

use std::time::Duration;

/// Retry settings for a read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry
    pub backoff_base: Duration,
    /// Upper bound for any single delay
    pub backoff_max: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        backoff_base: Duration::ZERO,
        backoff_max: Duration::ZERO,
    };

    /// Delay to wait before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.backoff_base, self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(5),
        }
    }
}

/// Whether a reqwest error is worth retrying.
///
/// Connection failures, timeouts and gateway errors (502/503/504) usually
/// clear up on their own; anything else is reported straight away.
pub fn is_transient_network_error(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() {
        return true;
    }

    matches!(
        error.status().map(|s| s.as_u16()),
        Some(502) | Some(503) | Some(504)
    )
}

/// Whether an HTTP status returned by the API is worth retrying.
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 502..=504)
}

/// Exponential backoff: `min(base * 2^attempt, max)`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(max)
}
