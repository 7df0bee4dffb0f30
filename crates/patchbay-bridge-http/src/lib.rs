//! The HTTP bridge: the worked example of [`patchbay_bridge`]'s generic
//! adapter seam, speaking a small REST-ish protocol (spec §6).

mod adapter;
mod config;
mod error;

pub use adapter::HttpBridgeAdapter;
pub use config::HttpBridgeConfig;
pub use error::HttpBridgeError;
