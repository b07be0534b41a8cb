//! lbtunnel Core Library
//!
//! Routes host traffic into a local Kubernetes cluster and emulates cloud
//! LoadBalancers for it. Provides functionality to:
//! - Install and maintain a host route to the cluster's service network
//! - Coordinate route ownership with other instances through a shared registry
//! - Publish cluster IPs as LoadBalancer ingress on Service status
//! - Report a status snapshot on every reconcile tick
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Platform Support
//! - macOS: Uses `netstat` and `route`
//! - Linux: Uses `ip route`
//! - Windows: Uses `route print` and `route ADD/DELETE`

// Hexagonal architecture layers
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod application;

pub mod config;
pub mod error;

#[cfg(test)]
mod testing;

// Re-export domain types (primary API)
pub use domain::{HostState, Patch, PatchType, Route, RouteInspection, TunnelId, TunnelStatus};

// Re-export other commonly used types
pub use application::{LoadBalancerEmulator, PatchReport, Tunnel, TunnelManager};
pub use config::{Config, ConfigStore};
pub use error::{Error, Result};
