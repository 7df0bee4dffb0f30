//! The kernel's error escalation envelope (spec §7).

use patchbay_core::{ContactId, DriverId};
use patchbay_driver::{CommandError, DriverError};
use thiserror::Error;

/// An error escalated past a driver's own fault boundary.
///
/// Wraps whatever the driver or its precondition/postcondition checks
/// raised, tagged with which driver and (when dispatch was in response to a
/// change) which contact was involved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// A driver's lifecycle or dispatch method failed.
    #[error("driver {driver_id} failed: {source}")]
    Driver {
        /// The driver that raised the error.
        driver_id: DriverId,
        /// The underlying error.
        #[source]
        source: DriverError,
        /// The contact being processed, if this happened during dispatch.
        contact_id: Option<ContactId>,
    },

    /// A storage driver's precondition check failed.
    #[error("precondition failed on driver {driver_id}: {source}")]
    Precondition {
        /// The driver whose precondition failed.
        driver_id: DriverId,
        /// The underlying error.
        #[source]
        source: CommandError,
    },

    /// No driver is registered with the given ID.
    #[error("driver {0} not found")]
    DriverNotFound(DriverId),

    /// The driver is not in a lifecycle state that allows the requested
    /// transition (spec §4.3's state machine).
    #[error("driver {driver_id} cannot transition from {from} to {to}")]
    InvalidTransition {
        /// The driver the transition was attempted on.
        driver_id: DriverId,
        /// The state it was in.
        from: &'static str,
        /// The state the kernel tried to move it to.
        to: &'static str,
    },

    /// No userspace handler has been registered to receive external input.
    #[error("no userspace handler registered")]
    NoUserspaceHandler,
}

impl KernelError {
    /// Whether this error should be treated as fatal to the driver it
    /// originated from.
    ///
    /// Postcondition failures are always fatal (spec §4.5, §7); other
    /// variants defer to the inner error's own `fatal`/`can_continue` flag.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Driver { source, .. } => source.fatal,
            Self::Precondition { source, .. } => !source.can_continue,
            Self::DriverNotFound(_) | Self::InvalidTransition { .. } | Self::NoUserspaceHandler => {
                false
            },
        }
    }

    /// The driver this error concerns, if any.
    #[must_use]
    pub fn driver_id(&self) -> Option<DriverId> {
        match self {
            Self::Driver { driver_id, .. }
            | Self::Precondition { driver_id, .. }
            | Self::InvalidTransition { driver_id, .. } => Some(*driver_id),
            Self::DriverNotFound(id) => Some(*id),
            Self::NoUserspaceHandler => None,
        }
    }

    /// The contact being processed when this error occurred, if known.
    #[must_use]
    pub fn contact_id(&self) -> Option<ContactId> {
        match self {
            Self::Driver { contact_id, .. } => *contact_id,
            Self::Precondition { source, .. } => source.contact_id,
            Self::DriverNotFound(_) | Self::InvalidTransition { .. } | Self::NoUserspaceHandler => {
                None
            },
        }
    }
}
