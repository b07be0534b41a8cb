//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems.

pub mod driver;
pub mod inspector;
pub mod kubernetes;
pub mod liveness;
pub mod registry;
pub mod reporter;
pub mod router;

// Re-export main types for convenience
pub use driver::{CliHostDriver, ProfileConfigLoader, DEFAULT_SERVICE_CIDR};
pub use inspector::MachineInspector;
pub use kubernetes::KubeServiceApi;
pub use liveness::OsProcessLiveness;
pub use registry::{FileRegistry, MemoryRegistry};
pub use reporter::{ChannelReporter, JsonReporter, TextReporter};
pub use router::OsRouter;
