//! Generic bridge driver framework: batching, retry, a circuit breaker, a
//! bounded drop-oldest outbound queue, and optional long-polling for
//! inbound external input (spec §4.4).

mod adapter;
mod bridge;
mod circuit;
mod config;
mod error;
mod queue;
mod retry;
mod stats;

pub use adapter::{BridgeAdapter, PollResult};
pub use bridge::BridgeDriver;
pub use circuit::{CircuitBreaker, CircuitState};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use queue::DropOldestQueue;
pub use retry::{RetryPolicy, RetryState};
pub use stats::BridgeStats;
