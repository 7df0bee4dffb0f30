//! The kernel's one entry point back into the userspace runtime.

use async_trait::async_trait;
use patchbay_core::{ExternalInput, ExternalReply};

/// Accepts [`ExternalInput`] forwarded by a driver and applies it to the
/// userspace network, returning the result.
///
/// Implemented by `patchbay-runtime`'s `Runtime`; kept as a trait here so
/// the kernel does not depend on the runtime crate (it would otherwise be a
/// cycle, since the runtime depends on the kernel to dispatch changes).
#[async_trait]
pub trait UserspaceHandler: Send + Sync {
    /// Apply one external input and return the runtime's reply.
    async fn handle_external_input(&self, input: ExternalInput) -> ExternalReply;
}
