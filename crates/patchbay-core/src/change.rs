//! The change record handed from the propagation engine to the kernel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContactId, GroupId};
use crate::value::Value;

/// A single contact's content changing as the result of one propagation
/// pass (spec §4.1, §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactChange {
    /// The contact whose content changed.
    pub contact_id: ContactId,
    /// The group that owns the contact.
    pub group_id: GroupId,
    /// The contact's content before this propagation pass touched it.
    pub previous: Option<Value>,
    /// The contact's content after blending.
    pub current: Value,
    /// When the change was produced, for driver-side ordering/debugging.
    pub observed_at: DateTime<Utc>,
}

impl ContactChange {
    /// Record a change. `observed_at` is taken from the caller rather than
    /// sampled here, so propagation stays deterministic and testable.
    #[must_use]
    pub fn new(
        contact_id: ContactId,
        group_id: GroupId,
        previous: Option<Value>,
        current: Value,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            contact_id,
            group_id,
            previous,
            current,
            observed_at,
        }
    }

    /// Whether this change is a no-op (new content equals old content).
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.previous.as_ref() == Some(&self.current)
    }
}
