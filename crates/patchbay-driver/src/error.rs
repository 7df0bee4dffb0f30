//! Errors raised by drivers and by commands sent to them (spec §7).

use patchbay_core::ContactId;
use thiserror::Error;

/// An error raised from inside a driver's own lifecycle or dispatch methods.
///
/// `fatal` distinguishes errors the kernel should treat as disabling the
/// driver (moving it toward `ShuttingDown`) from transient ones the driver
/// is expected to recover from on its own (e.g. inside its own retry loop).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{cause}")]
pub struct DriverError {
    /// Whether the kernel should treat this as disabling the driver.
    pub fatal: bool,
    /// Human-readable cause.
    pub cause: String,
}

impl DriverError {
    /// A transient error the driver is expected to keep running through.
    pub fn transient(cause: impl Into<String>) -> Self {
        Self {
            fatal: false,
            cause: cause.into(),
        }
    }

    /// An error that should disable the driver.
    pub fn fatal(cause: impl Into<String>) -> Self {
        Self {
            fatal: true,
            cause: cause.into(),
        }
    }
}

/// An error raised while running a storage driver's precondition check
/// before a change is applied (spec §4.5).
///
/// Precondition failures may or may not block propagation depending on
/// `can_continue`; postcondition failures (see
/// [`crate::StorageCapability::postcondition`]) are always fatal and so are
/// reported as a plain [`DriverError`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{cause}")]
pub struct CommandError {
    /// Whether propagation may continue despite this failure.
    pub can_continue: bool,
    /// Human-readable cause.
    pub cause: String,
    /// The contact the failing command was processing, when known.
    pub contact_id: Option<ContactId>,
}

impl CommandError {
    /// A failure that still lets propagation continue.
    pub fn recoverable(cause: impl Into<String>, contact_id: Option<ContactId>) -> Self {
        Self {
            can_continue: true,
            cause: cause.into(),
            contact_id,
        }
    }

    /// A failure that must stop propagation for this change.
    pub fn blocking(cause: impl Into<String>, contact_id: Option<ContactId>) -> Self {
        Self {
            can_continue: false,
            cause: cause.into(),
            contact_id,
        }
    }
}
