//! Errors raised while mutating or querying the network data model.

use thiserror::Error;

use crate::ids::{ContactId, GroupId, WireId};

/// Failures that can occur while blending a value into the network
/// (spec §4.1).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropagationError {
    /// The propagation origin, or a contact reached while fanning out, does
    /// not exist.
    #[error("contact {0} not found")]
    ContactNotFound(ContactId),

    /// A blend combiner could not produce a value for the pair it was
    /// given.
    #[error("blend failed for contact {contact}: {reason}")]
    BlendFailed {
        /// The contact whose blend failed.
        contact: ContactId,
        /// Human-readable cause.
        reason: String,
    },
}

/// Failures raised by the userspace runtime's structural operations
/// (spec §4.2).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// No group exists with the given ID.
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// No contact exists with the given ID.
    #[error("contact {0} not found")]
    ContactNotFound(ContactId),

    /// No wire exists with the given ID.
    #[error("wire {0} not found")]
    WireNotFound(WireId),

    /// A wire's endpoints live in different groups and neither is a
    /// boundary contact (spec §3).
    #[error("wire endpoints {from} and {to} cross a group boundary without a boundary contact")]
    CrossGroupViolation {
        /// The wire's source endpoint.
        from: ContactId,
        /// The wire's destination endpoint.
        to: ContactId,
    },

    /// A group ID collided with one already registered. Only possible if a
    /// caller supplies its own IDs instead of using the generated ones.
    #[error("group {0} already exists")]
    DuplicateGroupId(GroupId),

    /// Propagating a change failed.
    #[error(transparent)]
    Propagation(#[from] PropagationError),
}
