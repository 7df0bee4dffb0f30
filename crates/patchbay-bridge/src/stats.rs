//! Point-in-time counters exposed by a bridge driver.

use serde::{Deserialize, Serialize};

/// Snapshot of a bridge driver's dispatch activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Batches dispatched successfully.
    pub batches_sent: u64,
    /// Individual changes dispatched successfully.
    pub changes_sent: u64,
    /// Dispatch attempts that failed and were retried.
    pub retries: u64,
    /// Changes dropped because the queue was full (spec §4.4).
    pub changes_dropped: u64,
    /// Times the circuit breaker rejected a dispatch outright.
    pub circuit_rejections: u64,
}
