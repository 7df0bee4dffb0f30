//! The driver trait hierarchy (spec §4.3, §4.5).
//!
//! The kernel only ever holds a driver as `Box<dyn Driver>`, optionally
//! downcast by capability. Capabilities are expressed as separate traits
//! (`BridgeCapability`, `StorageCapability`) rather than discovered via
//! reflection: a driver that wants to be treated as a bridge or a storage
//! backend implements the matching trait in addition to [`Driver`], and the
//! kernel asks for it via [`Driver::as_bridge`] / [`Driver::as_storage`].

use async_trait::async_trait;
use patchbay_core::ContactChange;

use crate::error::{CommandError, DriverError};
use crate::types::{DriverStats, StorageCapabilities};

/// The lifecycle and dispatch surface every driver implements (spec §4.3).
#[async_trait]
pub trait Driver: Send + Sync {
    /// Human-readable name, used in logs and kernel events.
    fn name(&self) -> &str;

    /// Move the driver from `Unregistered` to `Initialized`.
    async fn initialize(&self) -> Result<(), DriverError>;

    /// Move the driver into `Listening`. Only valid from `Initialized` or
    /// `ListenerStopped`.
    async fn start_listening(&self) -> Result<(), DriverError>;

    /// Move the driver out of `Listening` into `ListenerStopped` without
    /// tearing it down.
    async fn stop_listening(&self) -> Result<(), DriverError>;

    /// Handle one contact change. Called fire-and-forget by the kernel: the
    /// caller does not await the driver-side work this future represents
    /// completing before moving on to the next change.
    async fn handle_change(&self, change: ContactChange) -> Result<(), DriverError>;

    /// Tear the driver down permanently, moving it to `ShuttingDown` and
    /// then `Unregistered`.
    async fn shutdown(&self) -> Result<(), DriverError>;

    /// Current point-in-time counters.
    fn stats(&self) -> DriverStats {
        DriverStats::default()
    }

    /// Borrow this driver as a bridge, if it implements that capability.
    fn as_bridge(&self) -> Option<&dyn BridgeCapability> {
        None
    }

    /// Borrow this driver as a storage backend, if it implements that
    /// capability.
    fn as_storage(&self) -> Option<&dyn StorageCapability> {
        None
    }
}

/// Drivers that relay changes to an external system outside the kernel's
/// process (spec §4.4).
#[async_trait]
pub trait BridgeCapability: Driver {
    /// Dispatch a batch of changes in one round-trip to the external
    /// system. Implementations are responsible for their own
    /// batching/retry/circuit-breaker policy; the kernel only calls this
    /// once per change (via [`Driver::handle_change`]) or in bulk when
    /// flushing a batch window.
    async fn dispatch_batch(&self, changes: Vec<ContactChange>) -> Result<(), DriverError>;
}

/// Drivers that persist changes and therefore participate in the
/// precondition/postcondition protocol (spec §4.5).
#[async_trait]
pub trait StorageCapability: Driver {
    /// What this storage driver needs from the kernel around a change.
    fn storage_capabilities(&self) -> StorageCapabilities;

    /// Validate a change before it is applied. A failure with
    /// `can_continue: true` lets propagation proceed without this driver
    /// seeing the change; `can_continue: false` aborts the change entirely.
    async fn precondition(&self, change: &ContactChange) -> Result<(), CommandError>;

    /// Confirm a change was durably applied. Unlike
    /// [`Self::precondition`], a postcondition failure is always fatal to
    /// the driver (spec §4.5, §7).
    async fn postcondition(&self, change: &ContactChange) -> Result<(), DriverError>;
}
