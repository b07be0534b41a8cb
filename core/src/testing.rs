//! In-memory fakes for the ports, shared by unit tests.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Service, ServiceSpec, ServiceStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use parking_lot::Mutex;

use crate::domain::{HostState, Patch, Route, RouteInspection, TunnelStatus};
use crate::error::{Error, Result};
use crate::ports::{
    ClusterConfigLoader, ClusterInspector, HostDriver, ProcessLiveness, Reporter, Router,
    ServiceApi,
};

pub fn route() -> Route {
    Route::new(
        "192.168.39.2".parse().unwrap(),
        "10.96.0.0/12".parse().unwrap(),
    )
}

/// Liveness answering from a fixed set of PIDs.
pub struct StaticLiveness {
    alive: HashSet<u32>,
}

impl StaticLiveness {
    pub fn alive(pids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            alive: pids.into_iter().collect(),
        }
    }
}

impl ProcessLiveness for StaticLiveness {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.contains(&pid)
    }
}

pub struct FakeDriver {
    state: Mutex<HostState>,
    ip: IpAddr,
}

impl FakeDriver {
    pub fn running(ip: &str) -> Self {
        Self {
            state: Mutex::new(HostState::Running),
            ip: ip.parse().unwrap(),
        }
    }

    pub fn set_state(&self, state: HostState) {
        *self.state.lock() = state;
    }
}

impl HostDriver for FakeDriver {
    async fn state(&self, _machine: &str) -> Result<HostState> {
        Ok(*self.state.lock())
    }

    async fn ip(&self, _machine: &str) -> Result<IpAddr> {
        Ok(self.ip)
    }
}

pub struct FakeConfig {
    cidr: Option<IpNet>,
}

impl FakeConfig {
    pub fn cidr(cidr: &str) -> Self {
        Self {
            cidr: Some(cidr.parse().unwrap()),
        }
    }

    pub fn missing() -> Self {
        Self { cidr: None }
    }
}

impl ClusterConfigLoader for FakeConfig {
    async fn service_cidr(&self, profile: &str) -> Result<IpNet> {
        self.cidr
            .ok_or_else(|| Error::Inspection(format!("no config for {}", profile)))
    }
}

/// Inspector whose host state can be changed between ticks. Clones share state.
#[derive(Clone)]
pub struct FakeInspector {
    route: Route,
    state: Arc<Mutex<std::result::Result<HostState, String>>>,
}

impl FakeInspector {
    pub fn running(route: Route) -> Self {
        Self {
            route,
            state: Arc::new(Mutex::new(Ok(HostState::Running))),
        }
    }

    pub fn set_state(&self, state: HostState) {
        *self.state.lock() = Ok(state);
    }

    pub fn fail(&self, message: &str) {
        *self.state.lock() = Err(message.to_string());
    }
}

impl ClusterInspector for FakeInspector {
    async fn state(&self) -> Result<HostState> {
        self.state.lock().clone().map_err(Error::Inspection)
    }

    async fn state_and_route(&self) -> Result<(HostState, Route)> {
        let state = self.state().await?;
        Ok((state, self.route))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterCall {
    Inspect,
    Add,
    Cleanup,
}

#[derive(Default)]
struct RouterState {
    installed: bool,
    conflict: Option<String>,
    add_error: Option<String>,
    calls: Vec<RouterCall>,
}

/// Routing table holding at most the one tunnel route. Clones share state.
#[derive(Clone, Default)]
pub struct FakeRouter {
    state: Arc<Mutex<RouterState>>,
}

impl FakeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the route as already present in the table.
    pub fn with_route(self) -> Self {
        self.state.lock().installed = true;
        self
    }

    /// Reports a foreign route to the same destination.
    pub fn with_conflict(self, line: &str) -> Self {
        self.state.lock().conflict = Some(line.to_string());
        self
    }

    pub fn failing_add(self, message: &str) -> Self {
        self.state.lock().add_error = Some(message.to_string());
        self
    }

    pub fn installed(&self) -> bool {
        self.state.lock().installed
    }

    pub fn calls(&self) -> Vec<RouterCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: RouterCall) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }
}

impl Router for FakeRouter {
    async fn inspect(&self, route: &Route) -> Result<RouteInspection> {
        let mut state = self.state.lock();
        state.calls.push(RouterCall::Inspect);
        Ok(RouteInspection {
            exists: state.installed,
            conflict: state.conflict.clone(),
            gateway: state.installed.then_some(route.gateway),
            overlaps: Vec::new(),
        })
    }

    async fn ensure_route_is_added(&self, _route: &Route) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(RouterCall::Add);
        if let Some(message) = &state.add_error {
            return Err(Error::Route(message.clone()));
        }
        state.installed = true;
        Ok(())
    }

    async fn cleanup(&self, _route: &Route) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(RouterCall::Cleanup);
        state.installed = false;
        Ok(())
    }
}

/// Service store applying JSON patches to its own copies. Clones share state.
#[derive(Clone, Default)]
pub struct FakeServiceApi {
    services: Arc<Mutex<Vec<Service>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
    patches: Arc<Mutex<Vec<Patch>>>,
    list_error: Arc<Mutex<Option<String>>>,
}

impl FakeServiceApi {
    pub fn with_services(services: Vec<Service>) -> Self {
        let api = Self::default();
        *api.services.lock() = services;
        api
    }

    /// Rejects every patch against `name`.
    pub fn reject(&self, name: &str) {
        self.rejected.lock().insert(name.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        *self.list_error.lock() = Some(message.to_string());
    }

    pub fn patches(&self) -> Vec<Patch> {
        self.patches.lock().clone()
    }

    pub fn service(&self, name: &str) -> Service {
        self.services
            .lock()
            .iter()
            .find(|svc| svc.metadata.name.as_deref() == Some(name))
            .cloned()
            .unwrap()
    }

    /// Ingress IPs of `name`, in order.
    pub fn ingress_ips(&self, name: &str) -> Vec<String> {
        self.service(name)
            .status
            .and_then(|status| status.load_balancer)
            .and_then(|lb| lb.ingress)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|ingress| ingress.ip)
            .collect()
    }
}

impl ServiceApi for FakeServiceApi {
    async fn list_services(&self) -> Result<Vec<Service>> {
        if let Some(message) = self.list_error.lock().clone() {
            return Err(Error::LoadBalancer(message));
        }
        Ok(self.services.lock().clone())
    }

    async fn patch(&self, patch: &Patch) -> Result<()> {
        self.patches.lock().push(patch.clone());
        if self.rejected.lock().contains(&patch.resource_name) {
            return Err(Error::LoadBalancer(format!(
                "patch of {} rejected",
                patch.resource_name
            )));
        }

        let mut services = self.services.lock();
        let svc = services
            .iter_mut()
            .find(|svc| {
                svc.metadata.name.as_deref() == Some(patch.resource_name.as_str())
                    && svc.metadata.namespace == patch.namespace
            })
            .ok_or_else(|| Error::LoadBalancer(format!("{} not found", patch.resource_name)))?;

        let mut doc = serde_json::to_value(&*svc)?;
        json_patch::patch(&mut doc, &patch.json_patch()?)
            .map_err(|e| Error::LoadBalancer(e.to_string()))?;
        *svc = serde_json::from_value(doc)?;
        Ok(())
    }
}

fn service(name: &str, type_: &str, cluster_ip: Option<&str>, ingress: &[&str]) -> Service {
    let ingress = (!ingress.is_empty()).then(|| {
        ingress
            .iter()
            .map(|ip| LoadBalancerIngress {
                ip: Some(ip.to_string()),
                ..Default::default()
            })
            .collect()
    });

    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(type_.to_string()),
            cluster_ip: cluster_ip.map(str::to_string),
            ..Default::default()
        }),
        // The API server always reports an (empty) loadBalancer status
        status: Some(ServiceStatus {
            load_balancer: Some(LoadBalancerStatus { ingress }),
            ..Default::default()
        }),
    }
}

pub fn lb_service(name: &str, cluster_ip: &str) -> Service {
    service(name, "LoadBalancer", Some(cluster_ip), &[])
}

pub fn lb_service_with_ingress(name: &str, cluster_ip: &str, ingress: &[&str]) -> Service {
    service(name, "LoadBalancer", Some(cluster_ip), ingress)
}

pub fn lb_service_without_ip(name: &str) -> Service {
    service(name, "LoadBalancer", None, &[])
}

pub fn cluster_ip_service(name: &str, cluster_ip: &str) -> Service {
    service(name, "ClusterIP", Some(cluster_ip), &[])
}

/// Reporter keeping every snapshot. Clones share the recording.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<TunnelStatus>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<TunnelStatus> {
        self.reports.lock().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, status: TunnelStatus) {
        self.reports.lock().push(status);
    }
}

/// Writer over a shared byte buffer, readable while a reporter owns it.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
