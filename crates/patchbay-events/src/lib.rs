//! Event bus the kernel uses to publish driver lifecycle transitions and
//! escalated errors to external observers (spec §9).
//!
//! This replaces the ad-hoc event-emitter pattern the distilled spec left
//! unspecified with a typed, broadcast-based bus: any number of observers
//! can subscribe, and a slow observer only loses the oldest events rather
//! than blocking the kernel.

mod bus;
mod event;

pub use bus::{EventBus, EventReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use event::{DriverLifecycleState, EventMetadata, KernelEvent};
