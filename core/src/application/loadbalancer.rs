//! LoadBalancer emulation.
//!
//! Without a cloud provider nothing assigns external IPs to `LoadBalancer`
//! Services. The emulator publishes each Service's cluster IP as its ingress,
//! which becomes reachable from the host once the tunnel route is installed.

use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info, warn};

use crate::domain::Patch;
use crate::error::{Error, Result};
use crate::ports::ServiceApi;

const LOAD_BALANCER: &str = "LoadBalancer";

/// Outcome of one pass over the LoadBalancer Services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Services that are in the desired state after the pass.
    pub services: Vec<String>,
    /// One message per Service that could not be handled.
    pub failures: Vec<String>,
}

impl PatchReport {
    /// The failures joined into one message, if there were any.
    pub fn error_text(&self) -> Option<String> {
        if self.failures.is_empty() {
            None
        } else {
            Some(self.failures.join("; "))
        }
    }
}

/// Patches and un-patches the status of LoadBalancer Services.
pub struct LoadBalancerEmulator<S> {
    api: S,
}

impl<S: ServiceApi> LoadBalancerEmulator<S> {
    pub fn new(api: S) -> Self {
        Self { api }
    }

    /// Sets the ingress of every LoadBalancer Service to its cluster IP.
    ///
    /// Services already pointing at their cluster IP are left alone but still
    /// reported. Fails only when the Services cannot be listed.
    pub async fn patch_services(&self) -> Result<PatchReport> {
        let mut report = PatchReport::default();

        for svc in self.load_balancers().await? {
            let (name, namespace) = identity(&svc);
            let Some(cluster_ip) = cluster_ip(&svc) else {
                report
                    .failures
                    .push(format!("{}/{}: no cluster IP assigned", namespace, name));
                continue;
            };

            let ingress = ingress_ips(&svc);
            if ingress.len() == 1 && ingress[0] == cluster_ip {
                debug!(service = %name, ip = %cluster_ip, "service already patched");
                report.services.push(name);
                continue;
            }

            let patch = Patch::add_ingress(&name, &namespace, cluster_ip);
            match self.api.patch(&patch).await {
                Ok(()) => {
                    info!(service = %name, ip = %cluster_ip, "patched load balancer ingress");
                    report.services.push(name);
                }
                Err(e) => {
                    warn!(service = %name, namespace = %namespace, error = %e, "failed to patch service");
                    report
                        .failures
                        .push(format!("{}/{}: {}", namespace, name, e));
                }
            }
        }

        Ok(report)
    }

    /// Removes the ingress of every LoadBalancer Service that has one.
    pub async fn cleanup(&self) -> Result<PatchReport> {
        let mut report = PatchReport::default();

        for svc in self.load_balancers().await? {
            if !has_ingress(&svc) {
                continue;
            }

            let (name, namespace) = identity(&svc);
            let patch = Patch::remove_ingress(&name, &namespace);
            match self.api.patch(&patch).await {
                Ok(()) => {
                    info!(service = %name, "removed load balancer ingress");
                    report.services.push(name);
                }
                Err(e) => {
                    warn!(service = %name, namespace = %namespace, error = %e, "failed to clean up service");
                    report
                        .failures
                        .push(format!("{}/{}: {}", namespace, name, e));
                }
            }
        }

        Ok(report)
    }

    async fn load_balancers(&self) -> Result<Vec<Service>> {
        let services = self
            .api
            .list_services()
            .await
            .map_err(|e| Error::LoadBalancer(format!("unable to list services: {}", e)))?;

        Ok(services
            .into_iter()
            .filter(|svc| {
                svc.spec.as_ref().and_then(|spec| spec.type_.as_deref()) == Some(LOAD_BALANCER)
            })
            .collect())
    }
}

fn identity(svc: &Service) -> (String, String) {
    (
        svc.metadata.name.clone().unwrap_or_default(),
        svc.metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
    )
}

/// The cluster IP, unless unset or headless (`None`).
fn cluster_ip(svc: &Service) -> Option<&str> {
    svc.spec
        .as_ref()
        .and_then(|spec| spec.cluster_ip.as_deref())
        .filter(|ip| !ip.is_empty() && *ip != "None")
}

fn ingress_list(svc: &Service) -> &[k8s_openapi::api::core::v1::LoadBalancerIngress] {
    svc.status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_deref())
        .unwrap_or_default()
}

fn ingress_ips(svc: &Service) -> Vec<&str> {
    ingress_list(svc)
        .iter()
        .filter_map(|ingress| ingress.ip.as_deref())
        .collect()
}

// Hostname-only entries count as ingress too
fn has_ingress(svc: &Service) -> bool {
    !ingress_list(svc).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        cluster_ip_service, lb_service, lb_service_with_ingress, lb_service_without_ip,
        FakeServiceApi,
    };

    #[tokio::test]
    async fn test_patches_only_load_balancers() {
        let api = FakeServiceApi::with_services(vec![
            lb_service("svc-lb", "10.96.0.15"),
            cluster_ip_service("svc-internal", "10.96.0.16"),
        ]);
        let emulator = LoadBalancerEmulator::new(api.clone());

        let report = emulator.patch_services().await.unwrap();
        assert_eq!(report.services, vec!["svc-lb"]);
        assert!(report.error_text().is_none());
        assert_eq!(api.ingress_ips("svc-lb"), vec!["10.96.0.15"]);
        assert!(api.ingress_ips("svc-internal").is_empty());
        assert_eq!(
            api.patches()[0].request_path(),
            "/api/v1/namespaces/default/services/svc-lb/status"
        );
    }

    #[tokio::test]
    async fn test_patch_services_is_idempotent() {
        let api = FakeServiceApi::with_services(vec![lb_service("svc-lb", "10.96.0.15")]);
        let emulator = LoadBalancerEmulator::new(api.clone());

        let first = emulator.patch_services().await.unwrap();
        let second = emulator.patch_services().await.unwrap();

        assert_eq!(first.services, second.services);
        assert_eq!(api.patches().len(), 1);
        assert_eq!(api.ingress_ips("svc-lb"), vec!["10.96.0.15"]);
    }

    #[tokio::test]
    async fn test_stale_ingress_is_replaced() {
        let api = FakeServiceApi::with_services(vec![lb_service_with_ingress(
            "svc-lb",
            "10.96.0.15",
            &["10.96.0.99", "10.96.0.98"],
        )]);
        let emulator = LoadBalancerEmulator::new(api.clone());

        emulator.patch_services().await.unwrap();
        assert_eq!(api.ingress_ips("svc-lb"), vec!["10.96.0.15"]);
    }

    #[tokio::test]
    async fn test_cleanup_twice() {
        let api = FakeServiceApi::with_services(vec![
            lb_service("svc-lb", "10.96.0.15"),
            cluster_ip_service("svc-internal", "10.96.0.16"),
        ]);
        let emulator = LoadBalancerEmulator::new(api.clone());
        emulator.patch_services().await.unwrap();

        let cleaned = emulator.cleanup().await.unwrap();
        assert_eq!(cleaned.services, vec!["svc-lb"]);
        assert!(api.ingress_ips("svc-lb").is_empty());

        let again = emulator.cleanup().await.unwrap();
        assert!(again.services.is_empty());
        assert!(again.failures.is_empty());
        assert_eq!(api.patches().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_continues() {
        let api = FakeServiceApi::with_services(vec![
            lb_service("broken", "10.96.0.14"),
            lb_service("svc-lb", "10.96.0.15"),
            lb_service_without_ip("headless"),
        ]);
        api.reject("broken");
        let emulator = LoadBalancerEmulator::new(api.clone());

        let report = emulator.patch_services().await.unwrap();
        assert_eq!(report.services, vec!["svc-lb"]);
        assert_eq!(report.failures.len(), 2);
        let text = report.error_text().unwrap();
        assert!(text.contains("default/broken"));
        assert!(text.contains("default/headless: no cluster IP assigned"));
    }

    #[tokio::test]
    async fn test_list_failure_is_an_error() {
        let api = FakeServiceApi::default();
        api.fail_listing("connection refused");
        let emulator = LoadBalancerEmulator::new(api);

        let err = emulator.patch_services().await.unwrap_err();
        assert!(matches!(err, Error::LoadBalancer(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
