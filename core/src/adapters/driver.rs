//! Host driver and cluster configuration adapters.
//!
//! The host is queried through the cluster tool's own CLI (`status`, `ip`),
//! and the service CIDR is read from the profile's `config.json`.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ipnet::IpNet;
use serde::Deserialize;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::HostState;
use crate::error::{Error, Result};
use crate::ports::{ClusterConfigLoader, HostDriver};

/// Default paths to search for the driver binary.
const DRIVER_PATHS: &[&str] = &[
    "/opt/homebrew/bin/minikube", // Apple Silicon
    "/usr/local/bin/minikube",    // Intel Mac / Homebrew
    "/usr/bin/minikube",          // System
];

/// Service CIDR used when a profile leaves it empty.
pub const DEFAULT_SERVICE_CIDR: &str = "10.96.0.0/12";

/// Timeout for driver queries.
const DRIVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Host driver backed by the cluster tool's command line.
pub struct CliHostDriver {
    binary: Option<PathBuf>,
}

impl CliHostDriver {
    /// Creates a driver, searching the default paths and `PATH`.
    pub fn new() -> Self {
        Self {
            binary: find_executable(DRIVER_PATHS).or_else(|| find_in_path("minikube")),
        }
    }

    /// Creates a driver with a custom binary path.
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary: Some(binary),
        }
    }

    /// Returns the binary path if found.
    pub fn binary(&self) -> Option<&PathBuf> {
        self.binary.as_ref()
    }

    /// Runs the driver binary, returning (success, stdout, stderr).
    async fn execute(&self, args: &[&str]) -> Result<(bool, String, String)> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| Error::Inspection("driver binary not found".to_string()))?;
        debug!(binary = %binary.display(), ?args, "querying host driver");

        let output = timeout(DRIVER_TIMEOUT, Command::new(binary).args(args).output())
            .await
            .map_err(|_| Error::Inspection(format!("{} timed out", binary.display())))?
            .map_err(|e| Error::Inspection(format!("failed to run {}: {}", binary.display(), e)))?;

        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

impl Default for CliHostDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDriver for CliHostDriver {
    async fn state(&self, machine: &str) -> Result<HostState> {
        // `status` exits non-zero for stopped hosts but still prints the state
        let (_, stdout, stderr) = self
            .execute(&["status", "-p", machine, "--format={{.Host}}"])
            .await?;

        match stdout.lines().next() {
            Some(state) if !state.trim().is_empty() => Ok(HostState::from_driver(state)),
            _ => Err(Error::Inspection(format!(
                "no state reported for {}: {}",
                machine, stderr
            ))),
        }
    }

    async fn ip(&self, machine: &str) -> Result<IpAddr> {
        let (success, stdout, stderr) = self.execute(&["ip", "-p", machine]).await?;
        if !success {
            return Err(Error::Inspection(format!(
                "unable to get IP of {}: {}",
                machine, stderr
            )));
        }

        stdout
            .parse()
            .map_err(|_| Error::Inspection(format!("invalid IP for {}: {:?}", machine, stdout)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProfileConfig {
    #[serde(default)]
    kubernetes_config: KubernetesConfig,
}

#[derive(Debug, Default, Deserialize)]
struct KubernetesConfig {
    #[serde(default, rename = "ServiceCIDR")]
    service_cidr: String,
}

/// Reads cluster configuration from `<profiles_dir>/<profile>/config.json`.
pub struct ProfileConfigLoader {
    profiles_dir: PathBuf,
}

impl ProfileConfigLoader {
    /// Creates a loader for the default profiles directory (~/.minikube/profiles).
    pub fn new() -> Result<Self> {
        let profiles_dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?
            .join(".minikube")
            .join("profiles");

        Ok(Self { profiles_dir })
    }

    /// Creates a loader with a custom profiles directory.
    pub fn with_dir(profiles_dir: PathBuf) -> Self {
        Self { profiles_dir }
    }

    fn config_path(&self, profile: &str) -> PathBuf {
        self.profiles_dir.join(profile).join("config.json")
    }
}

impl ClusterConfigLoader for ProfileConfigLoader {
    async fn service_cidr(&self, profile: &str) -> Result<IpNet> {
        let path = self.config_path(profile);
        let content = fs::read_to_string(&path).await.map_err(|e| {
            Error::Inspection(format!("unable to read {}: {}", path.display(), e))
        })?;

        let config: ProfileConfig = serde_json::from_str(&content).map_err(|e| {
            Error::Inspection(format!("unable to parse {}: {}", path.display(), e))
        })?;

        let cidr = config.kubernetes_config.service_cidr.trim();
        let cidr = if cidr.is_empty() { DEFAULT_SERVICE_CIDR } else { cidr };

        cidr.parse()
            .map_err(|_| Error::Inspection(format!("invalid service CIDR {:?}", cidr)))
    }
}

/// Finds an executable in the given paths.
fn find_executable(paths: &[&str]) -> Option<PathBuf> {
    paths.iter().map(PathBuf::from).find(|path| path.exists())
}

/// Finds an executable by name in `PATH`.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
