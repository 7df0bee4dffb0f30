//! The three-state circuit breaker guarding outbound dispatch (spec §4.4).

use std::time::Duration;

use tokio::time::Instant;

/// The circuit breaker's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected outright until `reset_timeout` elapses.
    Open,
    /// One trial request is allowed through to probe recovery.
    HalfOpen,
}

/// Trips open after `failure_threshold` consecutive failures, then allows a
/// single probe request through after `reset_timeout` (spec §4.4).
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    failure_threshold: u32,
    consecutive_failures: u32,
    reset_timeout: Duration,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a new, closed circuit breaker.
    #[must_use]
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_threshold,
            consecutive_failures: 0,
            reset_timeout,
            opened_at: None,
        }
    }

    /// Current state, first resolving `Open` to `HalfOpen` if the reset
    /// timeout has elapsed.
    pub fn state(&mut self) -> CircuitState {
        if self.state == CircuitState::Open {
            if let Some(opened_at) = self.opened_at {
                if opened_at.elapsed() >= self.reset_timeout {
                    self.state = CircuitState::HalfOpen;
                }
            }
        }
        self.state
    }

    /// Whether a request may be attempted right now.
    pub fn allow_request(&mut self) -> bool {
        !matches!(self.state(), CircuitState::Open)
    }

    /// Record a successful dispatch.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = CircuitState::Closed;
        self.opened_at = None;
    }

    /// Record a failed dispatch, tripping the breaker open if the
    /// consecutive-failure threshold is reached.
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.state == CircuitState::HalfOpen || self.consecutive_failures >= self.failure_threshold
        {
            self.state = CircuitState::Open;
            self.opened_at = Some(Instant::now());
        }
    }
}
