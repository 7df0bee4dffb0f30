//! Shared mock drivers and a mock bridge adapter for exercising the kernel,
//! bridge, and runtime crates' test suites against the scenarios in spec §8.

mod capturing;
mod failing;
mod mock_adapter;
mod slow_storage;

pub use capturing::CapturingDriver;
pub use failing::FailingDriver;
pub use mock_adapter::MockBridgeAdapter;
pub use slow_storage::SlowStorageDriver;
