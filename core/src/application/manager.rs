//! Drives a tunnel until cancelled.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Tunnel;
use crate::domain::{TunnelId, TunnelStatus};
use crate::error::Result;
use crate::ports::{ClusterInspector, Router, ServiceApi, TunnelRegistry};

/// Default time between reconcile ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the reconcile loop of a tunnel.
#[derive(Debug, Clone, Copy)]
pub struct TunnelManager {
    interval: Duration,
}

impl TunnelManager {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Ticks `tunnel` until `cancel` fires, then cleans it up once.
    ///
    /// A tick that is already running when cancellation arrives is finished
    /// first. Returns the status produced by cleanup.
    pub async fn run<I, R, G, S>(
        &self,
        mut tunnel: Tunnel<I, R, G, S>,
        cancel: CancellationToken,
    ) -> TunnelStatus
    where
        I: ClusterInspector,
        R: Router,
        G: TunnelRegistry,
        S: ServiceApi,
    {
        info!(tunnel = %tunnel.id(), interval = ?self.interval, "starting tunnel");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tunnel.update_tunnel_status().await;
                }
            }
        }

        info!("tunnel stopped, cleaning up");
        tunnel.cleanup().await
    }

    /// Removes registry entries of dead tunnels, then their host routes.
    ///
    /// A route that cannot be removed is logged and skipped; the entry is gone
    /// either way. Returns the removed entries.
    pub async fn cleanup_orphaned<G, R>(registry: &G, router: &R) -> Result<Vec<TunnelId>>
    where
        G: TunnelRegistry,
        R: Router,
    {
        let orphaned = registry.remove_orphaned().await?;

        for tunnel in &orphaned {
            info!(tunnel = %tunnel, "removing orphaned tunnel");
            if let Err(e) = router.cleanup(&tunnel.route).await {
                warn!(route = %tunnel.route, error = %e, "failed to remove orphaned route");
            }
        }

        Ok(orphaned)
    }
}

impl Default for TunnelManager {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ChannelReporter, MemoryRegistry};
    use crate::domain::{HostState, Route};
    use crate::testing::{
        lb_service, route, FakeInspector, FakeRouter, FakeServiceApi, RouterCall, StaticLiveness,
    };

    const PID: u32 = 100;

    #[tokio::test]
    async fn test_run_ticks_until_cancelled() {
        let router = FakeRouter::new();
        let registry = MemoryRegistry::new(StaticLiveness::alive([PID]));
        let services = FakeServiceApi::with_services(vec![lb_service("svc-lb", "10.96.0.15")]);
        let (reporter, mut rx) = ChannelReporter::channel();

        let tunnel = Tunnel::with_pid(
            PID,
            "minikube",
            FakeInspector::running(route()),
            router.clone(),
            registry.clone(),
            services.clone(),
            Box::new(reporter),
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        let manager = TunnelManager::new(Duration::from_millis(10));
        let stopper = async {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            cancel.cancel();
            (first, second)
        };

        let (final_status, (first, second)) =
            tokio::join!(manager.run(tunnel, cancel.clone()), stopper);

        assert_eq!(first.host_state, HostState::Running);
        assert_eq!(second.patched_services, vec!["svc-lb"]);
        assert!(!final_status.has_errors());
        assert!(!router.installed());
        assert!(registry.list().await.unwrap().is_empty());
        assert!(services.ingress_ips("svc-lb").is_empty());
        assert_eq!(router.count(RouterCall::Cleanup), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_only_cleans_up() {
        let router = FakeRouter::new();
        let (reporter, mut rx) = ChannelReporter::channel();
        let tunnel = Tunnel::with_pid(
            PID,
            "minikube",
            FakeInspector::running(route()),
            router.clone(),
            MemoryRegistry::new(StaticLiveness::alive([PID])),
            FakeServiceApi::default(),
            Box::new(reporter),
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        TunnelManager::default().run(tunnel, cancel).await;

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
        assert_eq!(router.count(RouterCall::Add), 0);
    }

    #[tokio::test]
    async fn test_cleanup_orphaned() {
        let other = Route::new("192.168.49.2".parse().unwrap(), "10.100.0.0/16".parse().unwrap());
        let registry = MemoryRegistry::with_entries(
            StaticLiveness::alive([PID]),
            vec![
                TunnelId::new(route(), "minikube", PID),
                TunnelId::new(other, "other", 999),
            ],
        );
        let router = FakeRouter::new().with_route();

        let removed = TunnelManager::cleanup_orphaned(&registry, &router).await.unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].route, other);
        assert_eq!(router.count(RouterCall::Cleanup), 1);
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }
}
