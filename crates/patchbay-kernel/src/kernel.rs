//! The kernel: driver registry, change fan-out, and external-input routing
//! (spec §4.3).

use std::sync::Arc;

use dashmap::DashMap;
use patchbay_core::{ContactChange, DriverId, ExternalInput, ExternalReply};
use patchbay_driver::Driver;
use patchbay_events::{DriverLifecycleState, EventBus, EventMetadata, EventReceiver, KernelEvent};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::KernelError;
use crate::registry::RegisteredDriver;
use crate::userspace::UserspaceHandler;

/// Kernel-wide knobs (spec §4.3, §9).
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// When `true`, a fatal error from any driver disables that driver
    /// immediately rather than letting it keep receiving changes.
    pub fail_fast: bool,
    /// When `true`, every dispatch is logged at `debug` level instead of
    /// `trace`.
    pub debug: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            fail_fast: true,
            debug: false,
        }
    }
}

/// Fans contact changes out to registered drivers and routes external
/// input back into userspace.
///
/// Dispatch is fire-and-forget: [`Kernel::handle_change`] spawns the work
/// onto an internal [`JoinSet`] and returns immediately. Callers that need
/// to know dispatch has drained use [`Kernel::has_pending_work`] or
/// [`Kernel::wait_for_completion`].
pub struct Kernel {
    drivers: DashMap<DriverId, Arc<RegisteredDriver>>,
    config: KernelConfig,
    events: EventBus,
    pending: Mutex<JoinSet<()>>,
    userspace: RwLock<Option<Arc<dyn UserspaceHandler>>>,
}

impl Kernel {
    /// Create a new kernel with the given configuration.
    #[must_use]
    pub fn new(config: KernelConfig) -> Self {
        Self {
            drivers: DashMap::new(),
            config,
            events: EventBus::new(),
            pending: Mutex::new(JoinSet::new()),
            userspace: RwLock::new(None),
        }
    }

    /// Subscribe to the kernel's event stream (spec §9).
    #[must_use]
    pub fn subscribe_events(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Register the handler that receives [`ExternalInput`] forwarded by
    /// drivers.
    pub async fn set_userspace_handler(&self, handler: Arc<dyn UserspaceHandler>) {
        *self.userspace.write().await = Some(handler);
    }

    /// Register a driver, running it through `initialize` and into the
    /// `Initialized` state.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Driver`] if the driver's `initialize` fails.
    pub async fn register_driver(&self, driver: Box<dyn Driver>) -> Result<DriverId, KernelError> {
        let id = DriverId::new();
        let registered = Arc::new(RegisteredDriver::new(id, driver));

        registered.driver.initialize().await.map_err(|source| KernelError::Driver {
            driver_id: id,
            source,
            contact_id: None,
        })?;

        let from = registered
            .transition(DriverLifecycleState::Initialized)
            .await?;
        self.publish_transition(id, from, DriverLifecycleState::Initialized);

        self.drivers.insert(id, registered);
        debug!(driver_id = %id, "driver registered");
        Ok(id)
    }

    /// Move a driver into `Listening`.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::DriverNotFound`] or a transition/driver error.
    pub async fn start_listening(&self, id: DriverId) -> Result<(), KernelError> {
        let registered = self.lookup(id)?;
        registered
            .driver
            .start_listening()
            .await
            .map_err(|source| KernelError::Driver {
                driver_id: id,
                source,
                contact_id: None,
            })?;
        let from = registered.transition(DriverLifecycleState::Listening).await?;
        self.publish_transition(id, from, DriverLifecycleState::Listening);
        Ok(())
    }

    /// Move a driver out of `Listening` without tearing it down.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::DriverNotFound`] or a transition/driver error.
    pub async fn stop_listening(&self, id: DriverId) -> Result<(), KernelError> {
        let registered = self.lookup(id)?;
        registered
            .driver
            .stop_listening()
            .await
            .map_err(|source| KernelError::Driver {
                driver_id: id,
                source,
                contact_id: None,
            })?;
        let from = registered
            .transition(DriverLifecycleState::ListenerStopped)
            .await?;
        self.publish_transition(id, from, DriverLifecycleState::ListenerStopped);
        Ok(())
    }

    /// Unregister a driver, shutting it down and removing it from the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::DriverNotFound`] if no driver with `id` is
    /// registered.
    pub async fn unregister_driver(&self, id: DriverId) -> Result<(), KernelError> {
        let registered = self.lookup(id)?;
        let from = registered.transition(DriverLifecycleState::ShuttingDown).await?;
        self.publish_transition(id, from, DriverLifecycleState::ShuttingDown);

        if let Err(source) = registered.driver.shutdown().await {
            warn!(driver_id = %id, %source, "driver shutdown reported an error");
        }

        let from = registered
            .transition(DriverLifecycleState::Unregistered)
            .await?;
        self.publish_transition(id, from, DriverLifecycleState::Unregistered);

        self.drivers.remove(&id);
        debug!(driver_id = %id, "driver unregistered");
        Ok(())
    }

    /// Fan a contact change out to every registered driver, fire-and-forget.
    ///
    /// For storage drivers this runs precondition, dispatch, then
    /// postcondition (spec §4.5); postcondition failures are always fatal
    /// and disable the driver.
    pub async fn handle_change(&self, change: ContactChange) {
        let mut pending = self.pending.lock().await;

        for entry in &self.drivers {
            let registered = Arc::clone(entry.value());
            let events = self.events.clone();
            let change = change.clone();
            let fail_fast = self.config.fail_fast;

            pending.spawn(async move {
                if let Err(err) = dispatch_one(&registered, change).await {
                    let fatal = err.is_fatal();
                    events.publish(KernelEvent::ErrorEscalated {
                        metadata: EventMetadata::at(chrono::Utc::now()),
                        driver_id: registered.id,
                        contact_id: err.contact_id(),
                        cause: err.to_string(),
                        fatal,
                    });
                    if fatal && fail_fast {
                        if let Err(transition_err) =
                            registered.transition(DriverLifecycleState::ShuttingDown).await
                        {
                            error!(%transition_err, "failed to fast-fail driver after fatal error");
                        }
                    }
                }
            });
        }
    }

    /// Forward external input into userspace and return its reply.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::NoUserspaceHandler`] if
    /// [`Kernel::set_userspace_handler`] has not been called yet.
    pub async fn handle_external_input(
        &self,
        input: ExternalInput,
    ) -> Result<ExternalReply, KernelError> {
        let handler = self
            .userspace
            .read()
            .await
            .clone()
            .ok_or(KernelError::NoUserspaceHandler)?;
        Ok(handler.handle_external_input(input).await)
    }

    /// Whether any fire-and-forget dispatch is still in flight.
    pub async fn has_pending_work(&self) -> bool {
        !self.pending.lock().await.is_empty()
    }

    /// Drain every in-flight dispatch task.
    pub async fn wait_for_completion(&self) {
        let mut pending = self.pending.lock().await;
        while pending.join_next().await.is_some() {}
    }

    /// Summaries of every registered driver's current lifecycle state.
    pub async fn health_check(&self) -> Vec<(DriverId, DriverLifecycleState)> {
        let mut out = Vec::with_capacity(self.drivers.len());
        for entry in &self.drivers {
            out.push((entry.key().to_owned(), entry.value().state().await));
        }
        out
    }

    /// Shut every registered driver down and drain pending dispatch.
    pub async fn shutdown(&self) {
        let ids: Vec<DriverId> = self.drivers.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Err(err) = self.unregister_driver(id).await {
                warn!(driver_id = %id, %err, "error unregistering driver during kernel shutdown");
            }
        }
        self.wait_for_completion().await;
    }

    fn lookup(&self, id: DriverId) -> Result<Arc<RegisteredDriver>, KernelError> {
        self.drivers
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(KernelError::DriverNotFound(id))
    }

    fn publish_transition(
        &self,
        driver_id: DriverId,
        from: DriverLifecycleState,
        to: DriverLifecycleState,
    ) {
        self.events.publish(KernelEvent::DriverStateChanged {
            metadata: EventMetadata::at(chrono::Utc::now()),
            driver_id,
            from,
            to,
        });
    }
}

async fn dispatch_one(
    registered: &RegisteredDriver,
    change: ContactChange,
) -> Result<(), KernelError> {
    let driver_id = registered.id;

    if let Some(storage) = registered.driver.as_storage() {
        storage
            .precondition(&change)
            .await
            .map_err(|source| KernelError::Precondition { driver_id, source })?;
    }

    registered
        .driver
        .handle_change(change.clone())
        .await
        .map_err(|source| KernelError::Driver {
            driver_id,
            source,
            contact_id: Some(change.contact_id),
        })?;

    if let Some(storage) = registered.driver.as_storage() {
        storage
            .postcondition(&change)
            .await
            .map_err(|source| KernelError::Driver {
                driver_id,
                source,
                contact_id: Some(change.contact_id),
            })?;
    }

    Ok(())
}
