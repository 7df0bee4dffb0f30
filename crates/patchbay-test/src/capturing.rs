//! A driver that records every change it receives, for assertions in tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use patchbay_core::ContactChange;
use patchbay_driver::{Driver, DriverError};

/// Captures every [`ContactChange`] passed to [`Driver::handle_change`].
///
/// Cloning shares the same capture buffer, so a test can hand one clone to
/// the kernel (as `Box<dyn Driver>`) and keep another to inspect afterward.
#[derive(Clone)]
pub struct CapturingDriver {
    name: String,
    changes: Arc<Mutex<Vec<ContactChange>>>,
}

impl CapturingDriver {
    /// Create a new, empty capturing driver.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every change captured so far, in arrival order.
    #[must_use]
    pub fn captured(&self) -> Vec<ContactChange> {
        self.changes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of changes captured so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no change has been captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Driver for CapturingDriver {
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
        self.changes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(change);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
