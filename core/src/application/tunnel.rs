//! Tunnel controller.
//!
//! One `Tunnel` owns one route to a cluster network. Each tick re-derives the
//! host state, reconciles the host route and the shared registry, patches
//! LoadBalancer Services and publishes a status snapshot. Nothing besides the
//! last status is carried between ticks: ownership is always re-read from the
//! registry, because other processes may have changed it.

use tracing::{debug, info, warn};

use super::LoadBalancerEmulator;
use crate::domain::{HostState, Route, TunnelId, TunnelStatus};
use crate::error::{Error, Result};
use crate::ports::{ClusterInspector, Reporter, Router, ServiceApi, TunnelRegistry};

/// A running tunnel bound to one machine and route.
pub struct Tunnel<I, R, G, S> {
    inspector: I,
    router: R,
    registry: G,
    emulator: LoadBalancerEmulator<S>,
    reporter: Box<dyn Reporter>,
    status: TunnelStatus,
    /// This instance installed or reclaimed the host route.
    owns_route: bool,
    /// This instance patched Services while the host was running.
    patched: bool,
    cleaned_up: bool,
}

impl<I, R, G, S> Tunnel<I, R, G, S>
where
    I: ClusterInspector,
    R: Router,
    G: TunnelRegistry,
    S: ServiceApi,
{
    /// Creates a tunnel owned by the current process.
    ///
    /// Inspects the cluster once to compute the route and fails with
    /// `TunnelAlreadyExists` if a live tunnel already owns it.
    pub async fn new(
        machine_name: &str,
        inspector: I,
        router: R,
        registry: G,
        services: S,
        reporter: Box<dyn Reporter>,
    ) -> Result<Self> {
        Self::with_pid(
            std::process::id(),
            machine_name,
            inspector,
            router,
            registry,
            services,
            reporter,
        )
        .await
    }

    /// Creates a tunnel that registers under `pid`.
    pub async fn with_pid(
        pid: u32,
        machine_name: &str,
        inspector: I,
        router: R,
        registry: G,
        services: S,
        reporter: Box<dyn Reporter>,
    ) -> Result<Self> {
        let (state, route) = inspector.state_and_route().await?;
        let id = TunnelId::new(route, machine_name, pid);

        if let Some(owner) = registry
            .is_already_defined_and_running(&id)
            .await
            .map_err(|e| Error::Registry(format!("unable to check for conflicts: {}", e)))?
        {
            return Err(Error::TunnelAlreadyExists(owner));
        }

        debug!(tunnel = %id, "tunnel created");
        Ok(Self {
            inspector,
            router,
            registry,
            emulator: LoadBalancerEmulator::new(services),
            reporter,
            status: TunnelStatus::new(id, state),
            owns_route: false,
            patched: false,
            cleaned_up: false,
        })
    }

    pub fn id(&self) -> &TunnelId {
        &self.status.tunnel_id
    }

    pub fn route(&self) -> &Route {
        &self.status.tunnel_id.route
    }

    /// The most recent status.
    pub fn status(&self) -> &TunnelStatus {
        &self.status
    }

    /// Runs one reconcile tick and publishes its snapshot.
    ///
    /// Every failure is recorded on the status; the next tick retries.
    pub async fn update_tunnel_status(&mut self) -> TunnelStatus {
        debug!("updating tunnel status");
        self.status.reset();

        match self.inspector.state().await {
            Ok(state) => self.status.host_state = state,
            Err(e) => {
                warn!(error = %e, "failed to inspect host");
                self.status.host_state = HostState::Unknown;
                self.status.host_error = Some(e.to_string());
            }
        }

        if self.status.host_state == HostState::Running {
            if let Err(e) = self.reconcile_route().await {
                warn!(route = %self.route(), error = %e, "route not reconciled");
                self.status.route_error = Some(e.to_string());
            } else {
                self.patch_services().await;
            }
        }

        self.publish()
    }

    async fn reconcile_route(&mut self) -> Result<()> {
        let route = *self.route();
        let inspection = self
            .router
            .inspect(&route)
            .await
            .map_err(|e| Error::Route(format!("error checking for route state: {}", e)))?;

        // A foreign route wins even when ours also appears to be present
        if let Some(conflict) = inspection.conflict {
            return Err(Error::RouteConflict(conflict));
        }

        if !inspection.exists {
            self.router.ensure_route_is_added(&route).await?;
            self.owns_route = true;
            // The route stays even if registration loses a race; the next
            // tick sees it present and re-validates ownership
            return self.registry.register(&self.status.tunnel_id).await;
        }

        match self
            .registry
            .is_already_defined_and_running(&self.status.tunnel_id)
            .await?
        {
            Some(owner) => {
                self.owns_route = false;
                Err(Error::TunnelAlreadyExists(owner))
            }
            None => {
                self.registry.register(&self.status.tunnel_id).await?;
                if !self.owns_route {
                    info!(route = %route, "claimed existing route");
                }
                self.owns_route = true;
                Ok(())
            }
        }
    }

    async fn patch_services(&mut self) {
        match self.emulator.patch_services().await {
            Ok(report) => {
                self.status.load_balancer_emulator_error = report.error_text();
                self.patched |= !report.services.is_empty();
                self.status.patched_services = report.services;
            }
            Err(e) => self.status.load_balancer_emulator_error = Some(e.to_string()),
        }
    }

    /// Tears the tunnel down and publishes the final snapshot.
    ///
    /// The route and registry entry are left alone when another live tunnel
    /// owns them. Services are un-patched only if this tunnel patched them and
    /// the last tick saw the host running. Calling it again returns the same
    /// snapshot.
    pub async fn cleanup(&mut self) -> TunnelStatus {
        if self.cleaned_up {
            return self.status.clone();
        }
        self.cleaned_up = true;

        info!(route = %self.route(), host = %self.status.host_state, "cleaning up tunnel");
        self.status.reset();

        if let Err(e) = self.release_route().await {
            warn!(route = %self.route(), error = %e, "failed to clean up route");
            self.status.route_error = Some(format!("error cleaning up route: {}", e));
        }

        if self.patched && self.status.host_state == HostState::Running {
            match self.emulator.cleanup().await {
                Ok(report) => {
                    self.status.load_balancer_emulator_error = report.error_text();
                    self.status.patched_services = report.services;
                }
                Err(e) => self.status.load_balancer_emulator_error = Some(e.to_string()),
            }
        }

        let snapshot = self.status.clone();
        self.reporter.finish(snapshot.clone());
        snapshot
    }

    async fn release_route(&mut self) -> Result<()> {
        let route = *self.route();

        let owner = self
            .registry
            .is_already_defined_and_running(&self.status.tunnel_id)
            .await;
        if let Ok(Some(owner)) = &owner {
            info!(owner = %owner, "route owned by another tunnel, leaving it in place");
            self.owns_route = false;
            return Ok(());
        }

        // An unreadable registry must not strand a route this tunnel installed
        if self.owns_route {
            self.router.cleanup(&route).await?;
            self.owns_route = false;
        }

        match owner {
            Ok(_) => self.registry.remove(&route).await,
            Err(e) => Err(e),
        }
    }

    fn publish(&mut self) -> TunnelStatus {
        let snapshot = self.status.clone();
        self.reporter.report(snapshot.clone());
        snapshot
    }
}
