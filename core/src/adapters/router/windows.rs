//! Windows router implementation using route.exe.

use std::net::{IpAddr, Ipv4Addr};

use ipnet::{IpNet, Ipv4Net};
use regex::Regex;
use tokio::process::Command;

use crate::domain::{Route, RoutingTable, RoutingTableLine};
use crate::error::{Error, Result};

use super::{run, RouteCommands};

/// One row of the "Active Routes" table.
const ACTIVE_ROUTE_PATTERN: &str =
    r"^\s*(\d+\.\d+\.\d+\.\d+)\s+(\d+\.\d+\.\d+\.\d+)\s+(\S+)\s+(\S+)\s+(\d+)\s*$";

/// Windows-specific routes via `route print` / `route ADD`.
pub struct WindowsRoutes;

impl WindowsRoutes {
    pub fn new() -> Self {
        Self
    }
}

impl RouteCommands for WindowsRoutes {
    async fn routing_table(&self) -> Result<RoutingTable> {
        let mut command = Command::new("route");
        command.args(["print", "-4"]);
        let output = run(command).await?;
        parse_route_print(&output)
    }

    async fn add_route(&self, route: &Route) -> Result<()> {
        let IpNet::V4(net) = route.dest_cidr else {
            return Err(Error::UnsupportedPlatform(format!(
                "IPv6 route {} on Windows",
                route
            )));
        };

        let mut command = Command::new("route");
        command.args([
            "ADD",
            &net.network().to_string(),
            "MASK",
            &net.netmask().to_string(),
            &route.gateway.to_string(),
        ]);
        run(command).await.map(|_| ())
    }

    async fn delete_route(&self, route: &Route) -> Result<()> {
        let mut command = Command::new("route");
        command.args(["DELETE", &route.dest_cidr.network().to_string()]);
        run(command).await.map(|_| ())
    }
}

/// Parses the "Active Routes" section of `route print -4`.
pub(crate) fn parse_route_print(output: &str) -> Result<RoutingTable> {
    let pattern = Regex::new(ACTIVE_ROUTE_PATTERN)
        .map_err(|e| Error::ParseError(format!("invalid route pattern: {}", e)))?;

    let mut lines = Vec::new();
    let mut in_active = false;

    for line in output.lines() {
        if line.trim_start().starts_with("Active Routes:") {
            in_active = true;
            continue;
        }
        if !in_active {
            continue;
        }
        if line.starts_with("===") {
            break;
        }

        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let (Ok(dest), Ok(mask)) = (caps[1].parse::<Ipv4Addr>(), caps[2].parse::<Ipv4Addr>())
        else {
            continue;
        };
        let Ok(net) = Ipv4Net::with_netmask(dest, mask) else {
            continue;
        };

        lines.push(RoutingTableLine {
            dest: IpNet::V4(net.trunc()),
            // "On-link" routes have no gateway
            gateway: caps[3].parse::<IpAddr>().ok(),
            line: line.to_string(),
        });
    }

    Ok(RoutingTable::new(lines))
}
