//! Host routing table port (interface).

use crate::domain::{Route, RouteInspection};
use crate::error::Result;

/// Port for manipulating the host routing table.
///
/// One implementation exists per host OS; the tunnel only depends on this
/// contract.
pub trait Router: Send + Sync {
    /// Look up `route` in the host routing table.
    fn inspect(
        &self,
        route: &Route,
    ) -> impl std::future::Future<Output = Result<RouteInspection>> + Send;

    /// Install `route`. A no-op when it is already installed.
    fn ensure_route_is_added(
        &self,
        route: &Route,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove `route` if present. A no-op when it is absent.
    fn cleanup(&self, route: &Route) -> impl std::future::Future<Output = Result<()>> + Send;
}
