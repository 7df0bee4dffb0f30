//! Driver trait hierarchy, capability specialization, and error types for
//! patchbay drivers (spec §4.3–§4.5, §7).

mod error;
mod traits;
mod types;

pub use error::{CommandError, DriverError};
pub use traits::{BridgeCapability, Driver, StorageCapability};
pub use types::{DriverStats, StorageCapabilities};

pub use patchbay_core::DriverId;
