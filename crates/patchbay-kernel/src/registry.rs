//! Per-driver bookkeeping: the boxed driver plus its lifecycle state.

use patchbay_core::DriverId;
use patchbay_driver::Driver;
use patchbay_events::DriverLifecycleState;
use tokio::sync::Mutex;

use crate::error::KernelError;

/// A driver the kernel owns, plus the lifecycle state it tracks on its
/// behalf (spec §4.3's driver state machine).
pub struct RegisteredDriver {
    /// The driver's assigned ID.
    pub id: DriverId,
    /// The boxed driver implementation.
    pub driver: Box<dyn Driver>,
    state: Mutex<DriverLifecycleState>,
}

impl RegisteredDriver {
    /// Wrap a driver, starting in the `Unregistered` state.
    #[must_use]
    pub fn new(id: DriverId, driver: Box<dyn Driver>) -> Self {
        Self {
            id,
            driver,
            state: Mutex::new(DriverLifecycleState::Unregistered),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> DriverLifecycleState {
        *self.state.lock().await
    }

    /// Validate and record a transition to `to`, returning the state it
    /// moved from.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidTransition`] if `to` is not reachable
    /// from the current state per spec §4.3.
    pub async fn transition(
        &self,
        to: DriverLifecycleState,
    ) -> Result<DriverLifecycleState, KernelError> {
        use DriverLifecycleState::{Initialized, Listening, ListenerStopped, ShuttingDown, Unregistered};

        let mut state = self.state.lock().await;
        let from = *state;

        let allowed = matches!(
            (from, to),
            (Unregistered, Initialized)
                | (Initialized, Listening)
                | (Listening, ListenerStopped)
                | (Listening, ShuttingDown)
                | (ListenerStopped, Listening)
                | (ListenerStopped, ShuttingDown)
                | (Initialized, ShuttingDown)
                | (ShuttingDown, Unregistered)
        );

        if !allowed {
            return Err(KernelError::InvalidTransition {
                driver_id: self.id,
                from: state_name(from),
                to: state_name(to),
            });
        }

        *state = to;
        Ok(from)
    }
}

fn state_name(state: DriverLifecycleState) -> &'static str {
    match state {
        DriverLifecycleState::Unregistered => "unregistered",
        DriverLifecycleState::Initialized => "initialized",
        DriverLifecycleState::Listening => "listening",
        DriverLifecycleState::ListenerStopped => "listener_stopped",
        DriverLifecycleState::ShuttingDown => "shutting_down",
    }
}
