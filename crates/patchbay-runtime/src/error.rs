//! Re-export of the userspace structural error type.
//!
//! `patchbay-core::CoreError` already carries exactly the shape spec §4.2
//! asks the runtime for (propagation failures plus the structural-operation
//! failures), so the runtime names it rather than duplicating the enum.

pub use patchbay_core::CoreError as RuntimeError;
