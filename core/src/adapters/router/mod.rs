//! Host router adapters.
//!
//! Platform-specific route table manipulation behind one `OsRouter`.

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod darwin;

#[cfg_attr(any(target_os = "macos", target_os = "windows"), allow(dead_code))]
mod linux;

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
mod windows;

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::{Route, RouteInspection, RoutingTable};
use crate::error::{Error, Result};
use crate::ports::Router;

/// Upper bound for a single routing command (sudo may prompt for a password).
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// The router for the current platform.
pub struct OsRouter {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinRoutes,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsRoutes,

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    inner: linux::LinuxRoutes,
}

impl OsRouter {
    /// Create a new router for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinRoutes::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsRoutes::new(),

            #[cfg(not(any(target_os = "macos", target_os = "windows")))]
            inner: linux::LinuxRoutes::new(),
        }
    }
}

impl Default for OsRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for OsRouter {
    async fn inspect(&self, route: &Route) -> Result<RouteInspection> {
        inspect_route(&self.inner, route).await
    }

    async fn ensure_route_is_added(&self, route: &Route) -> Result<()> {
        add_if_missing(&self.inner, route).await
    }

    async fn cleanup(&self, route: &Route) -> Result<()> {
        remove_if_present(&self.inner, route).await
    }
}

async fn inspect_route<C: RouteCommands>(commands: &C, route: &Route) -> Result<RouteInspection> {
    let table = commands.routing_table().await?;
    let inspection = table.check(route);

    for overlap in &inspection.overlaps {
        warn!(route = %route, overlap = %overlap, "route overlaps an existing host route");
    }

    Ok(inspection)
}

/// Adds the route unless it is already installed. A route to the same CIDR
/// through another gateway is never replaced.
async fn add_if_missing<C: RouteCommands>(commands: &C, route: &Route) -> Result<()> {
    let inspection = inspect_route(commands, route).await?;
    if inspection.exists {
        debug!(route = %route, "route already installed");
        return Ok(());
    }
    if let Some(conflict) = inspection.conflict {
        return Err(Error::RouteConflict(conflict));
    }

    commands.add_route(route).await?;
    info!(route = %route, "added host route");
    Ok(())
}

async fn remove_if_present<C: RouteCommands>(commands: &C, route: &Route) -> Result<()> {
    let inspection = inspect_route(commands, route).await?;
    if !inspection.exists {
        debug!(route = %route, "route not installed, nothing to clean up");
        return Ok(());
    }

    commands.delete_route(route).await?;
    info!(route = %route, "removed host route");
    Ok(())
}

/// Internal trait for platform-specific implementations.
trait RouteCommands: Send + Sync {
    fn routing_table(&self) -> impl std::future::Future<Output = Result<RoutingTable>> + Send;

    fn add_route(&self, route: &Route) -> impl std::future::Future<Output = Result<()>> + Send;

    fn delete_route(&self, route: &Route)
        -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A command that modifies the routing table, run through sudo unless
/// already privileged.
fn elevated(program: &str) -> Command {
    #[cfg(unix)]
    if !nix::unistd::geteuid().is_root() {
        let mut command = Command::new("sudo");
        command.arg(program);
        return command;
    }

    Command::new(program)
}

/// Runs a command and returns its stdout, failing on a non-zero exit.
async fn run(mut command: Command) -> Result<String> {
    let description = format!("{:?}", command.as_std());
    debug!(command = %description, "running routing command");

    let output = timeout(
        COMMAND_TIMEOUT,
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| Error::CommandFailed(format!("{} timed out", description)))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CommandFailed(format!(
            "{}: {}",
            description,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
