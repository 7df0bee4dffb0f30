//! Event payloads published on the kernel's [`crate::EventBus`].

use chrono::{DateTime, Utc};
use patchbay_core::{ContactId, DriverId};
use serde::{Deserialize, Serialize};

/// Driver lifecycle states the kernel publishes transitions between
/// (spec §4.3's driver state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverLifecycleState {
    /// Registered but `initialize` has not completed.
    Unregistered,
    /// `initialize` completed; not yet listening.
    Initialized,
    /// Actively receiving external input.
    Listening,
    /// Listening was paused or failed without triggering shutdown.
    ListenerStopped,
    /// `shutdown` is in progress.
    ShuttingDown,
}

/// Metadata common to every published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// When the event was produced.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Stamp metadata at the given time. The caller supplies the timestamp
    /// so event production stays deterministic under test.
    #[must_use]
    pub fn at(occurred_at: DateTime<Utc>) -> Self {
        Self { occurred_at }
    }
}

/// Events published by the kernel for external observers (spec §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum KernelEvent {
    /// A driver moved between lifecycle states.
    DriverStateChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// The driver that transitioned.
        driver_id: DriverId,
        /// State before the transition.
        from: DriverLifecycleState,
        /// State after the transition.
        to: DriverLifecycleState,
    },

    /// A change was dispatched to a driver.
    ChangeDispatched {
        /// Event metadata.
        metadata: EventMetadata,
        /// The driver the change was dispatched to.
        driver_id: DriverId,
        /// The contact whose change was dispatched.
        contact_id: ContactId,
    },

    /// A driver's bounded outbound queue was full and dropped the oldest
    /// entry to make room (spec §4.4 Batching).
    QueueOverflow {
        /// Event metadata.
        metadata: EventMetadata,
        /// Name of the driver whose queue overflowed. Bridges publish this
        /// themselves, outside the kernel's driver registry, so they
        /// identify themselves by name rather than by [`DriverId`].
        driver_name: String,
        /// The contact whose queued change was dropped.
        contact_id: ContactId,
    },

    /// An error escalated past a driver's own fault boundary, per the
    /// fatal/`failFast` policy in spec §4.3/§7.
    ErrorEscalated {
        /// Event metadata.
        metadata: EventMetadata,
        /// The driver the error originated from.
        driver_id: DriverId,
        /// The contact being processed when the error occurred, if any.
        contact_id: Option<ContactId>,
        /// Human-readable cause.
        cause: String,
        /// Whether the kernel treated this as fatal to the driver.
        fatal: bool,
    },
}

impl KernelEvent {
    /// Stable name for this event's kind, used in log fields and tests.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DriverStateChanged { .. } => "driver_state_changed",
            Self::ChangeDispatched { .. } => "change_dispatched",
            Self::QueueOverflow { .. } => "queue_overflow",
            Self::ErrorEscalated { .. } => "error_escalated",
        }
    }
}
