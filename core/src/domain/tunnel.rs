//! Tunnel identity and status snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Route;

/// Run-state of the cluster host as reported by its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HostState {
    #[default]
    Unknown,
    Running,
    Stopped,
    Error,
}

impl HostState {
    /// Maps a driver state string (e.g. `Running`, `Saved`) onto a host state.
    pub fn from_driver(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "running" => HostState::Running,
            "stopped" | "saved" | "paused" | "stopping" => HostState::Stopped,
            "error" => HostState::Error,
            _ => HostState::Unknown,
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostState::Unknown => "Unknown",
            HostState::Running => "Running",
            HostState::Stopped => "Stopped",
            HostState::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Identifies one running tunnel instance.
///
/// Equal routes with different PIDs are conflicting tunnels; equal routes with
/// the same PID are the same instance re-registering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelId {
    pub route: Route,
    pub machine_name: String,
    pub pid: u32,
}

impl TunnelId {
    pub fn new(route: Route, machine_name: impl Into<String>, pid: u32) -> Self {
        Self {
            route,
            machine_name: machine_name.into(),
            pid,
        }
    }
}

impl fmt::Display for TunnelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tunnel{{ Route: {}, machine: {}, pid: {} }}",
            self.route, self.machine_name, self.pid
        )
    }
}

/// Snapshot of a tunnel after one reconcile tick or cleanup.
///
/// Errors are kept as rendered text so snapshots can be cloned, compared and
/// serialized for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelStatus {
    pub tunnel_id: TunnelId,
    pub host_state: HostState,
    #[serde(default)]
    pub patched_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_emulator_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_error: Option<String>,
}

impl TunnelStatus {
    pub fn new(tunnel_id: TunnelId, host_state: HostState) -> Self {
        Self {
            tunnel_id,
            host_state,
            patched_services: Vec::new(),
            route_error: None,
            load_balancer_emulator_error: None,
            host_error: None,
        }
    }

    /// Clears the per-tick results, keeping identity and host state.
    pub fn reset(&mut self) {
        self.patched_services.clear();
        self.route_error = None;
        self.load_balancer_emulator_error = None;
        self.host_error = None;
    }

    pub fn has_errors(&self) -> bool {
        self.route_error.is_some()
            || self.load_balancer_emulator_error.is_some()
            || self.host_error.is_some()
    }
}
