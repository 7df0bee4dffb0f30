//! A driver whose `handle_change` always fails, for exercising the kernel's
//! fan-out-to-every-driver and fail-fast behavior (spec §8 invariant 6).

use async_trait::async_trait;
use patchbay_core::ContactChange;
use patchbay_driver::{Driver, DriverError};

/// Always returns the configured error from [`Driver::handle_change`].
pub struct FailingDriver {
    name: String,
    fatal: bool,
}

impl FailingDriver {
    /// A driver that fails every change with a non-fatal error.
    #[must_use]
    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fatal: false,
        }
    }

    /// A driver that fails every change with a fatal error.
    #[must_use]
    pub fn fatal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fatal: true,
        }
    }
}

#[async_trait]
impl Driver for FailingDriver {
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

    async fn handle_change(&self, _change: ContactChange) -> Result<(), DriverError> {
        let cause = format!("{} always fails", self.name);
        Err(if self.fatal {
            DriverError::fatal(cause)
        } else {
            DriverError::transient(cause)
        })
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
