//! Fans contact changes out to registered drivers and routes external input
//! back into the userspace runtime (spec §4.3).

mod error;
mod kernel;
mod registry;
mod userspace;

pub use error::KernelError;
pub use kernel::{Kernel, KernelConfig};
pub use registry::RegisteredDriver;
pub use userspace::UserspaceHandler;

pub use patchbay_events::{DriverLifecycleState, EventReceiver, KernelEvent};
