//! Domain layer - Pure data models.
//!
//! This module contains the types the tunnel reasons about.
//! These types have no I/O dependencies and can be tested in isolation.

mod patch;
mod route;
mod tunnel;

// Re-export all domain types
pub use patch::{Patch, PatchType, INGRESS_PATH};
pub use route::{Route, RouteInspection, RoutingTable, RoutingTableLine};
pub use tunnel::{HostState, TunnelId, TunnelStatus};
