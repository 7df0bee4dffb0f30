//! Shared descriptor and statistics types for drivers.

use serde::{Deserialize, Serialize};

/// Declares what a storage driver needs from the kernel around a change
/// (spec §4.5).
///
/// Every flag defaults to `false`; use the preset constructors for the two
/// shapes this system actually needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCapabilities {
    /// Content survives a kernel restart.
    pub persistent: bool,
    /// The driver batches writes rather than applying them one at a time.
    pub batches_writes: bool,
    /// The kernel must run [`crate::StorageCapability::precondition`] before
    /// applying a change.
    pub requires_precondition: bool,
}

impl StorageCapabilities {
    /// A durable store that batches writes and validates preconditions —
    /// the shape a database-backed driver typically has.
    #[must_use]
    pub fn persistent_batching() -> Self {
        Self {
            persistent: true,
            batches_writes: true,
            requires_precondition: true,
        }
    }

    /// An in-memory store with no batching or precondition checks.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            persistent: false,
            batches_writes: false,
            requires_precondition: false,
        }
    }
}

/// Point-in-time counters exposed by a driver for health checks and
/// observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStats {
    /// Changes successfully dispatched since the driver started listening.
    pub changes_dispatched: u64,
    /// Changes that failed dispatch and were retried at least once.
    pub changes_retried: u64,
    /// Changes dropped because a bounded queue was full (spec §4.4).
    pub changes_dropped: u64,
}
