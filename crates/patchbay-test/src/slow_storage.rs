//! A storage driver whose `handle_change` sleeps before applying the
//! change, for exercising "slow storage does not block userspace"
//! (spec §8 scenario S2).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use patchbay_core::{ContactChange, ContactId, Value};
use patchbay_driver::{
    CommandError, Driver, DriverError, DriverStats, StorageCapabilities, StorageCapability,
};

/// Delays every `handle_change` by a fixed duration before recording it.
#[derive(Clone)]
pub struct SlowStorageDriver {
    name: String,
    delay: Duration,
    store: Arc<Mutex<HashMap<ContactId, Value>>>,
}

impl SlowStorageDriver {
    /// Create a driver that sleeps `delay` before applying each change.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current value stored for `contact_id`, if the delayed write has
    /// completed.
    #[must_use]
    pub fn get(&self, contact_id: ContactId) -> Option<Value> {
        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&contact_id)
            .cloned()
    }
}

#[async_trait]
impl Driver for SlowStorageDriver {
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
        tokio::time::sleep(self.delay).await;
        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(change.contact_id, change.current);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn stats(&self) -> DriverStats {
        DriverStats::default()
    }

    fn as_storage(&self) -> Option<&dyn StorageCapability> {
        Some(self)
    }
}

#[async_trait]
impl StorageCapability for SlowStorageDriver {
    fn storage_capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::ephemeral()
    }

    async fn precondition(&self, _change: &ContactChange) -> Result<(), CommandError> {
        Ok(())
    }

    async fn postcondition(&self, change: &ContactChange) -> Result<(), DriverError> {
        if self
            .store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&change.contact_id)
        {
            Ok(())
        } else {
            Err(DriverError::fatal("postcondition failed: write never landed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use patchbay_core::GroupId;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn handle_change_applies_after_the_delay() {
        let driver = SlowStorageDriver::new("slow", Duration::from_millis(100));
        let change = ContactChange::new(
            ContactId::new(),
            GroupId::new(),
            None,
            Value::Number(999.0),
            Utc::now(),
        );
        let contact_id = change.contact_id;

        let handle = tokio::spawn({
            let driver = driver.clone();
            async move { driver.handle_change(change).await }
        });

        tokio::time::advance(Duration::from_millis(150)).await;
        handle.await.unwrap().unwrap();

        assert_eq!(driver.get(contact_id), Some(Value::Number(999.0)));
    }
}
