//! Tunables for one bridge driver instance (spec §4.4).

use std::time::Duration;

/// Configuration for a [`crate::BridgeDriver`].
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    /// Changes are batched together until this many have accumulated...
    pub batch_size: usize,
    /// ...or until this much time has passed since the first change in the
    /// batch arrived, whichever comes first.
    pub batch_delay: Duration,
    /// Maximum dispatch attempts per batch.
    pub retry_attempts: u32,
    /// Base retry delay; see [`crate::RetryPolicy`].
    pub retry_delay: Duration,
    /// Consecutive failures before the circuit breaker opens.
    pub circuit_failure_threshold: u32,
    /// How long the circuit breaker stays open before allowing a probe.
    pub circuit_reset_timeout: Duration,
    /// Maximum changes held in the outbound queue before the oldest is
    /// dropped.
    pub queue_capacity: usize,
    /// How often to poll the adapter for inbound external input, if it
    /// supports polling. `None` disables polling entirely.
    pub poll_interval: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            batch_delay: Duration::from_millis(200),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
            circuit_failure_threshold: 5,
            circuit_reset_timeout: Duration::from_secs(30),
            queue_capacity: 1024,
            poll_interval: None,
        }
    }
}
