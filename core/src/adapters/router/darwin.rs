//! macOS router implementation using netstat and route.

use std::net::{IpAddr, Ipv4Addr};

use ipnet::{IpNet, Ipv4Net};
use tokio::process::Command;

use crate::domain::{Route, RoutingTable, RoutingTableLine};
use crate::error::Result;

use super::{elevated, run, RouteCommands};

/// macOS-specific routes via `netstat -nr` and `route`.
pub struct DarwinRoutes;

impl DarwinRoutes {
    pub fn new() -> Self {
        Self
    }
}

impl RouteCommands for DarwinRoutes {
    async fn routing_table(&self) -> Result<RoutingTable> {
        let mut command = Command::new("netstat");
        command.args(["-nr", "-f", "inet"]);
        let output = run(command).await?;
        Ok(parse_netstat(&output))
    }

    async fn add_route(&self, route: &Route) -> Result<()> {
        let mut command = elevated("route");
        command.args([
            "-n",
            "add",
            &route.dest_cidr.to_string(),
            &route.gateway.to_string(),
        ]);
        run(command).await.map(|_| ())
    }

    async fn delete_route(&self, route: &Route) -> Result<()> {
        let mut command = elevated("route");
        command.args(["-n", "delete", &route.dest_cidr.to_string()]);
        run(command).await.map(|_| ())
    }
}

/// Parses the IPv4 section of `netstat -nr -f inet`.
pub(crate) fn parse_netstat(output: &str) -> RoutingTable {
    let mut lines = Vec::new();
    let mut in_table = false;

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() == Some(&"Destination") {
            in_table = true;
            continue;
        }
        if !in_table || fields.len() < 3 {
            continue;
        }

        let Some(dest) = parse_destination(fields[0]) else {
            continue;
        };

        lines.push(RoutingTableLine {
            dest,
            // link#N and MAC addresses are on-link routes
            gateway: fields[1].parse::<IpAddr>().ok(),
            line: line.to_string(),
        });
    }

    RoutingTable::new(lines)
}

/// Expands netstat's abbreviated destinations.
///
/// `default` is 0/0, `10.96/12` is 10.96.0.0/12, and a bare `192.168.1`
/// implies a /24 from its octet count.
fn parse_destination(token: &str) -> Option<IpNet> {
    if token == "default" {
        return Some(IpNet::V4(Ipv4Net::default()));
    }

    let token = token.split('%').next()?;
    let (addr, prefix) = match token.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix.parse::<u8>().ok()?)),
        None => (token, None),
    };

    let mut octets: Vec<u8> = Vec::with_capacity(4);
    for part in addr.split('.') {
        octets.push(part.parse().ok()?);
    }
    if octets.is_empty() || octets.len() > 4 {
        return None;
    }

    let prefix = prefix.unwrap_or((octets.len() * 8) as u8);
    octets.resize(4, 0);
    let addr = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
    Ipv4Net::new(addr, prefix).ok().map(|net| IpNet::V4(net.trunc()))
}
