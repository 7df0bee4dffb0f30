//! Broadcast bus the kernel publishes [`KernelEvent`]s on.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::KernelEvent;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts [`KernelEvent`]s to every subscriber.
///
/// Publishing never blocks on slow subscribers: the underlying channel is
/// bounded and a lagging receiver simply misses the oldest events, which it
/// learns about as a [`broadcast::error::RecvError::Lagged`] on its next
/// `recv`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<KernelEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event, returning the number of subscribers it reached.
    pub fn publish(&self, event: KernelEvent) -> usize {
        let event = Arc::new(event);
        trace!(kind = event.kind(), "publishing kernel event");

        match self.sender.send(Arc::clone(&event)) {
            Ok(count) => {
                debug!(kind = event.kind(), receivers = count, "kernel event published");
                count
            },
            Err(_) => {
                trace!(kind = event.kind(), "no subscribers for kernel event");
                0
            },
        }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Current number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The channel capacity this bus was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription handle returned by [`EventBus::subscribe`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<KernelEvent>>,
}

impl EventReceiver {
    /// Receive the next event, skipping past any lag transparently.
    ///
    /// Returns `None` only once the bus itself has been dropped.
    pub async fn recv(&mut self) -> Option<Arc<KernelEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "kernel event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<KernelEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "kernel event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty
                    | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
