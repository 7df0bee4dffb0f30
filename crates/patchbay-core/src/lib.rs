//! Identifier model, network data model, and external-input envelopes for
//! the patchbay propagation runtime.
//!
//! This crate has no behavior of its own: it defines the shapes that
//! `patchbay-propagation`, `patchbay-kernel`, and `patchbay-runtime` operate
//! on, so drivers and bridges can depend on the data model without pulling
//! in the engine that mutates it.

mod change;
mod error;
mod external_input;
mod ids;
mod model;
mod value;

pub use change::ContactChange;
pub use error::{CoreError, PropagationError};
pub use external_input::{ExternalInput, ExternalReply};
pub use ids::{ContactId, DriverId, GroupId, WireId};
pub use model::{
    BoundaryDirection, BoundaryInfo, Contact, Group, GroupState, NetworkState,
    PrimitiveDescriptor, Wire, WireKind,
};
pub use value::{blend, BlendMode, Value};
