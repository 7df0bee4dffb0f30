//! An in-memory storage driver: the reference implementation of
//! [`StorageCapability`] (spec §4.5), grounded on the same `DashMap`-backed
//! shared-state pattern used for overlays elsewhere in the stack.
//!
//! Content does not survive process restart, so by default this driver
//! reports [`StorageCapabilities::ephemeral`]. Callers that want to exercise
//! the precondition/postcondition protocol in tests can opt into
//! [`StorageCapabilities::persistent_batching`] via
//! [`InMemoryStorageDriver::with_capabilities`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use patchbay_core::{ContactChange, ContactId, Value};
use patchbay_driver::{
    CommandError, Driver, DriverError, DriverStats, StorageCapabilities, StorageCapability,
};
use tracing::debug;

/// Stores the latest value for each contact it has seen, keyed by
/// [`ContactId`].
pub struct InMemoryStorageDriver {
    name: String,
    capabilities: StorageCapabilities,
    store: DashMap<ContactId, Value>,
    changes_dispatched: AtomicU64,
}

impl InMemoryStorageDriver {
    /// Create a new driver reporting [`StorageCapabilities::ephemeral`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: StorageCapabilities::ephemeral(),
            store: DashMap::new(),
            changes_dispatched: AtomicU64::new(0),
        }
    }

    /// Override the reported capabilities, e.g. to exercise the
    /// precondition/postcondition protocol as if this were a durable store.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: StorageCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Current value stored for `contact_id`, if any.
    #[must_use]
    pub fn get(&self, contact_id: ContactId) -> Option<Value> {
        self.store.get(&contact_id).map(|entry| entry.clone())
    }

    /// Number of distinct contacts with a stored value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no contact has a stored value yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl Driver for InMemoryStorageDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn start_listening(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn stop_listening(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn handle_change(&self, change: ContactChange) -> Result<(), DriverError> {
        self.store.insert(change.contact_id, change.current);
        self.changes_dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(driver = %self.name, contact = ?change.contact_id, "stored change");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn stats(&self) -> DriverStats {
        DriverStats {
            changes_dispatched: self.changes_dispatched.load(Ordering::Relaxed),
            changes_retried: 0,
            changes_dropped: 0,
        }
    }

    fn as_storage(&self) -> Option<&dyn StorageCapability> {
        Some(self)
    }
}

#[async_trait]
impl StorageCapability for InMemoryStorageDriver {
    fn storage_capabilities(&self) -> StorageCapabilities {
        self.capabilities
    }

    async fn precondition(&self, _change: &ContactChange) -> Result<(), CommandError> {
        Ok(())
    }

    async fn postcondition(&self, change: &ContactChange) -> Result<(), DriverError> {
        if self.store.contains_key(&change.contact_id) {
            Ok(())
        } else {
            Err(DriverError::fatal(format!(
                "postcondition failed: {:?} was never written",
                change.contact_id
            )))
        }
    }
}
