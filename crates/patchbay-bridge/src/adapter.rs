//! The seam between the generic bridge mechanism and a specific external
//! system (spec §4.4, §6).

use async_trait::async_trait;
use patchbay_core::{ContactChange, ExternalInput};
use patchbay_driver::DriverError;

/// Sends batches to, and optionally polls, one external system.
///
/// `patchbay-bridge` implements batching, retry, the circuit breaker, and
/// the bounded queue once; an adapter only has to know how to speak to one
/// concrete external system (HTTP, a message queue, ...).
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Send one batch of changes to the external system.
    async fn send_batch(&self, changes: &[ContactChange]) -> Result<(), DriverError>;

    /// Poll the external system for new external input, if this adapter
    /// supports inbound long-polling (spec §4.4). The default
    /// implementation reports no new input and never errors, for adapters
    /// that are outbound-only.
    async fn poll(&self, _last_sequence_id: Option<&str>) -> Result<PollResult, DriverError> {
        Ok(PollResult::default())
    }
}

/// The result of one poll cycle.
#[derive(Debug, Clone, Default)]
pub struct PollResult {
    /// External inputs received since the last poll.
    pub inputs: Vec<ExternalInput>,
    /// Opaque cursor to present on the next poll, if the adapter tracks one.
    pub next_sequence_id: Option<String>,
}
