//! Tunnel registry ports (interfaces).

use crate::domain::{Route, TunnelId};
use crate::error::Result;

/// Port for checking whether a process is still alive.
pub trait ProcessLiveness: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Port for the registry of running tunnels shared by every process on the host.
///
/// Implementations must make each operation atomic with respect to other
/// processes using the same registry.
pub trait TunnelRegistry: Send + Sync {
    /// Returns the live tunnel owning `id.route` under a different PID, if any.
    ///
    /// Entries whose owner is dead are orphaned and never reported.
    fn is_already_defined_and_running(
        &self,
        id: &TunnelId,
    ) -> impl std::future::Future<Output = Result<Option<TunnelId>>> + Send;

    /// Store `id` as the owner of its route.
    ///
    /// Overwrites entries owned by the same PID or by a dead PID, and fails
    /// with `TunnelAlreadyExists` when a different live PID owns the route.
    fn register(&self, id: &TunnelId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete the entry for `route`. Succeeds when there is none.
    fn remove(&self, route: &Route) -> impl std::future::Future<Output = Result<()>> + Send;

    /// All stored entries.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<TunnelId>>> + Send;

    /// Delete every entry whose owner is dead and return them.
    fn remove_orphaned(&self) -> impl std::future::Future<Output = Result<Vec<TunnelId>>> + Send;
}
