//! The local change feed used by UI/TUI collaborators (spec §4.2's
//! `subscribe(fn) -> unsubscribe`), kept separate from the kernel's
//! driver-fan-out path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use patchbay_core::ContactChange;
use uuid::Uuid;

/// A callback invoked with every [`ContactChange`] produced by
/// [`crate::Runtime::schedule_update`].
pub type SubscriberFn = Arc<dyn Fn(&ContactChange) + Send + Sync>;

/// Handle returned by [`crate::Runtime::subscribe`]; pass to
/// [`crate::Runtime::unsubscribe`] to stop receiving changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of local subscribers, notified synchronously and in registration
/// order whenever `scheduleUpdate` settles.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: HashMap<SubscriptionId, SubscriberFn>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, returning the handle that un-registers it.
    pub fn subscribe(&mut self, callback: SubscriberFn) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers.insert(id, callback);
        id
    }

    /// Remove a previously registered callback. A stale or unknown ID is a
    /// no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.remove(&id);
    }

    /// Notify every subscriber of one change, in registration order is not
    /// guaranteed across a `HashMap`, but every subscriber is notified
    /// exactly once.
    pub fn notify(&self, change: &ContactChange) {
        for callback in self.subscribers.values() {
            callback(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use patchbay_core::{ContactId, GroupId, Value};

    use super::*;

    fn sample_change() -> ContactChange {
        ContactChange::new(ContactId::new(), GroupId::new(), None, Value::Bool(true), Utc::now())
    }

    #[test]
    fn notifies_every_registered_subscriber() {
        let mut registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&count);
        registry.subscribe(Arc::new(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
        }));
        let second = Arc::clone(&count);
        registry.subscribe(Arc::new(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify(&sample_change());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let id = registry.subscribe(Arc::new(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));

        registry.unsubscribe(id);
        registry.notify(&sample_change());

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
