//! Bridge-specific error type.

use thiserror::Error;

/// Failures raised by the bridge mechanism itself, as opposed to the
/// adapter it wraps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The circuit breaker is open; dispatch was not attempted.
    #[error("circuit breaker open, dispatch rejected")]
    CircuitOpen,

    /// Every retry attempt failed.
    #[error("dispatch failed after {attempts} attempts: {cause}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// The last underlying failure.
        cause: String,
    },
}
