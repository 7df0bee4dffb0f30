//! The userspace runtime: network authoring operations, the local change
//! feed, and `ExternalInput` dispatch (spec §4.2).
//!
//! This crate is the one place that owns [`patchbay_core::NetworkState`]
//! end to end — everything else (the propagation engine, the kernel, the
//! drivers) operates on pieces of it or reacts to what it produces.

mod error;
mod registry;
mod runtime;
mod subscription;

pub use error::RuntimeError;
pub use registry::{PrimitiveDescriptor, PrimitiveRegistry, SchedulerDescriptor, SchedulerRegistry};
pub use runtime::Runtime;
pub use subscription::{SubscriberFn, SubscriberRegistry, SubscriptionId};
