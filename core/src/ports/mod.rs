//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `adapters`.

mod inspector;
mod registry;
mod reporter;
mod router;
mod services;

pub use inspector::{ClusterConfigLoader, ClusterInspector, HostDriver};
pub use registry::{ProcessLiveness, TunnelRegistry};
pub use reporter::Reporter;
pub use router::Router;
pub use services::ServiceApi;
