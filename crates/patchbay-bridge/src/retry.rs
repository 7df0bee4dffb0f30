//! Retry bookkeeping for bridge dispatch (spec §4.4).
//!
//! This is a narrower mechanism than `astralis-core`'s general-purpose
//! `RetryConfig`: the delay formula is pinned to the spec's
//! `retryDelay · 2^(attempt−1)` (no jitter, no configurable base), and state
//! is keyed per logical request rather than held in the call stack, since a
//! bridge retries a specific batch across dispatch attempts that may be
//! seconds apart.

use std::time::Duration;

/// Retry policy for outbound dispatch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay; attempt `n` (1-indexed) waits `delay * 2^(n-1)`.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Delay before attempt `attempt` (1-indexed; attempt 1 has no delay).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let shift = attempt.saturating_sub(1).min(32);
        self.delay.saturating_mul(1u32.checked_shl(shift - 1).unwrap_or(u32::MAX))
    }

    /// Whether `attempt` (1-indexed, the attempt that just failed) may be
    /// retried.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Per-request retry state, keyed by whatever identity the caller considers
/// "the same logical request" (a batch correlation ID, a contact ID, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryState {
    /// Attempts made so far.
    pub attempts: u32,
}

impl RetryState {
    /// Record one more attempt.
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_each_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(400));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
