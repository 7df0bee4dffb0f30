//! The generic bridge driver: batching, retry, circuit breaker, bounded
//! queueing, and optional long-polling (spec §4.4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use patchbay_core::ContactChange;
use patchbay_driver::{BridgeCapability, Driver, DriverError, DriverStats};
use patchbay_events::{EventBus, EventMetadata, EventReceiver, KernelEvent};
use patchbay_kernel::UserspaceHandler;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::adapter::BridgeAdapter;
use crate::circuit::CircuitBreaker;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::queue::DropOldestQueue;
use crate::retry::{RetryPolicy, RetryState};
use crate::stats::BridgeStats;

struct Inner {
    name: String,
    adapter: Box<dyn BridgeAdapter>,
    config: BridgeConfig,
    listening: AtomicBool,
    flush_scheduled: AtomicBool,
    stats: Mutex<BridgeStats>,
    queue: Mutex<DropOldestQueue>,
    circuit: Mutex<CircuitBreaker>,
    events: EventBus,
    inbound: Option<Arc<dyn UserspaceHandler>>,
    last_sequence_id: Mutex<Option<String>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

/// A driver that relays contact changes to an external system through a
/// [`BridgeAdapter`], batching and retrying on the caller's behalf.
pub struct BridgeDriver {
    inner: Arc<Inner>,
}

impl BridgeDriver {
    /// Create a new bridge driver.
    ///
    /// `inbound` receives external input decoded from the adapter's poll
    /// responses; pass `None` for an outbound-only bridge.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        adapter: Box<dyn BridgeAdapter>,
        config: BridgeConfig,
        inbound: Option<Arc<dyn UserspaceHandler>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                circuit: Mutex::new(CircuitBreaker::new(
                    config.circuit_failure_threshold,
                    config.circuit_reset_timeout,
                )),
                queue: Mutex::new(DropOldestQueue::new(config.queue_capacity)),
                adapter,
                config,
                listening: AtomicBool::new(false),
                flush_scheduled: AtomicBool::new(false),
                stats: Mutex::new(BridgeStats::default()),
                events: EventBus::new(),
                inbound,
                last_sequence_id: Mutex::new(None),
                poll_task: Mutex::new(None),
            }),
        }
    }

    /// Current dispatch counters.
    pub async fn bridge_stats(&self) -> BridgeStats {
        *self.inner.stats.lock().await
    }

    /// Snapshot of changes currently held in the outbound queue, in FIFO
    /// order, without draining it.
    pub async fn queued_changes(&self) -> Vec<ContactChange> {
        self.inner.queue.lock().await.snapshot()
    }

    /// Subscribe to this bridge's own events (currently just
    /// [`KernelEvent::QueueOverflow`]; dispatch and lifecycle events are
    /// published by the kernel that owns this driver, not the bridge
    /// itself).
    #[must_use]
    pub fn subscribe_events(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let delay = inner.config.batch_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flush(&inner).await;
        });
    }
}

/// A batch that could not be dispatched, carried back alongside the error
/// so the caller can requeue it instead of dropping it on the floor.
struct DispatchFailure {
    error: BridgeError,
    batch: Vec<ContactChange>,
}

async fn flush(inner: &Arc<Inner>) {
    let batch = {
        let mut queue = inner.queue.lock().await;
        queue.drain()
    };
    inner.flush_scheduled.store(false, Ordering::SeqCst);

    if batch.is_empty() {
        return;
    }
    if let Err(failure) = dispatch_with_retry(inner, batch).await {
        warn!(
            bridge = %inner.name,
            batch_size = failure.batch.len(),
            err = %failure.error,
            "batch not dispatched, returning it to the queue",
        );
        requeue_failed_batch(inner, failure.batch).await;
    }
}

/// Push an undelivered batch back to the front of the queue (spec §4.4.1:
/// a failed flush prepends the batch to preserve ordering). Whatever the
/// queue has to drop to stay within capacity is reported as an overflow.
async fn requeue_failed_batch(inner: &Arc<Inner>, batch: Vec<ContactChange>) {
    let dropped = inner.queue.lock().await.prepend(batch);
    if dropped.is_empty() {
        return;
    }

    inner.stats.lock().await.changes_dropped += dropped.len() as u64;
    for change in dropped {
        warn!(bridge = %inner.name, contact_id = %change.contact_id, "outbound queue full, dropped oldest change");
        inner.events.publish(KernelEvent::QueueOverflow {
            metadata: EventMetadata::at(Utc::now()),
            driver_name: inner.name.clone(),
            contact_id: change.contact_id,
        });
    }
}

async fn dispatch_with_retry(
    inner: &Arc<Inner>,
    batch: Vec<ContactChange>,
) -> Result<(), DispatchFailure> {
    let policy = RetryPolicy::new(inner.config.retry_attempts, inner.config.retry_delay);
    let mut retry_state = RetryState::default();
    let mut last_cause = String::new();

    loop {
        retry_state.record_attempt();

        if !inner.circuit.lock().await.allow_request() {
            inner.stats.lock().await.circuit_rejections += 1;
            return Err(DispatchFailure {
                error: BridgeError::CircuitOpen,
                batch,
            });
        }

        let delay = policy.delay_for_attempt(retry_state.attempts);
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }

        match inner.adapter.send_batch(&batch).await {
            Ok(()) => {
                inner.circuit.lock().await.record_success();
                let mut stats = inner.stats.lock().await;
                stats.batches_sent += 1;
                stats.changes_sent += batch.len() as u64;
                debug!(bridge = %inner.name, batch_size = batch.len(), "batch dispatched");
                return Ok(());
            },
            Err(err) => {
                inner.circuit.lock().await.record_failure();
                last_cause = err.to_string();

                if !policy.should_retry(retry_state.attempts) {
                    return Err(DispatchFailure {
                        error: BridgeError::RetriesExhausted {
                            attempts: retry_state.attempts,
                            cause: last_cause,
                        },
                        batch,
                    });
                }
                inner.stats.lock().await.retries += 1;
            },
        }
    }
}

async fn poll_loop(inner: Arc<Inner>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        if !inner.listening.load(Ordering::SeqCst) {
            return;
        }

        let cursor = inner.last_sequence_id.lock().await.clone();
        match inner.adapter.poll(cursor.as_deref()).await {
            Ok(result) => {
                if let Some(next) = result.next_sequence_id {
                    *inner.last_sequence_id.lock().await = Some(next);
                }
                if let Some(handler) = &inner.inbound {
                    for input in result.inputs {
                        handler.handle_external_input(input).await;
                    }
                }
            },
            Err(err) => warn!(bridge = %inner.name, %err, "poll cycle failed"),
        }
    }
}

#[async_trait]
impl Driver for BridgeDriver {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn initialize(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn start_listening(&self) -> Result<(), DriverError> {
        self.inner.listening.store(true, Ordering::SeqCst);

        if let Some(interval) = self.inner.config.poll_interval {
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(poll_loop(inner, interval));
            *self.inner.poll_task.lock().await = Some(handle);
        }
        Ok(())
    }

    async fn stop_listening(&self) -> Result<(), DriverError> {
        self.inner.listening.store(false, Ordering::SeqCst);
        if let Some(handle) = self.inner.poll_task.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn handle_change(&self, change: ContactChange) -> Result<(), DriverError> {
        let dropped = self.inner.queue.lock().await.push(change);
        if let Some(dropped) = dropped {
            self.inner.stats.lock().await.changes_dropped += 1;
            warn!(bridge = %self.inner.name, contact_id = %dropped.contact_id, "outbound queue full, dropped oldest change");
            self.inner.events.publish(KernelEvent::QueueOverflow {
                metadata: EventMetadata::at(Utc::now()),
                driver_name: self.inner.name.clone(),
                contact_id: dropped.contact_id,
            });
        }

        let should_flush_now = self.inner.queue.lock().await.len() >= self.inner.config.batch_size;
        if should_flush_now {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { flush(&inner).await });
        } else {
            self.schedule_flush();
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        self.stop_listening().await?;
        flush(&self.inner).await;
        Ok(())
    }

    fn stats(&self) -> DriverStats {
        self.inner
            .stats
            .try_lock()
            .map(|s| DriverStats {
                changes_dispatched: s.changes_sent,
                changes_retried: s.retries,
                changes_dropped: s.changes_dropped,
            })
            .unwrap_or_default()
    }

    fn as_bridge(&self) -> Option<&dyn BridgeCapability> {
        Some(self)
    }
}

#[async_trait]
impl BridgeCapability for BridgeDriver {
    async fn dispatch_batch(&self, changes: Vec<ContactChange>) -> Result<(), DriverError> {
        for change in changes {
            self.inner.queue.lock().await.push(change);
        }
        let batch = self.inner.queue.lock().await.drain();
        match dispatch_with_retry(&self.inner, batch).await {
            Ok(()) => Ok(()),
            Err(failure) => {
                let message = failure.error.to_string();
                requeue_failed_batch(&self.inner, failure.batch).await;
                Err(DriverError::transient(message))
            },
        }
    }
}
