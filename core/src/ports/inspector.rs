//! Cluster inspection ports (interfaces).

use std::net::IpAddr;

use ipnet::IpNet;

use crate::domain::{HostState, Route};
use crate::error::Result;

/// Port for querying the machine that hosts the cluster.
///
/// Implementations wrap a VM/container driver; failures surface as
/// inspection errors and are never retried here.
pub trait HostDriver: Send + Sync {
    /// Get the run-state of a machine.
    fn state(&self, machine: &str) -> impl std::future::Future<Output = Result<HostState>> + Send;

    /// Get the host-reachable IP of a machine.
    fn ip(&self, machine: &str) -> impl std::future::Future<Output = Result<IpAddr>> + Send;
}

/// Port for reading cluster configuration of a profile.
pub trait ClusterConfigLoader: Send + Sync {
    /// Get the CIDR the tunnel should route (the service network).
    fn service_cidr(
        &self,
        profile: &str,
    ) -> impl std::future::Future<Output = Result<IpNet>> + Send;
}

/// Port for deriving host state and the tunnel route.
pub trait ClusterInspector: Send + Sync {
    /// Current run-state of the host.
    fn state(&self) -> impl std::future::Future<Output = Result<HostState>> + Send;

    /// Run-state plus the route to the cluster network.
    ///
    /// Fails when the host is not reachable or the configuration is absent.
    fn state_and_route(
        &self,
    ) -> impl std::future::Future<Output = Result<(HostState, Route)>> + Send;
}
