//! Linux router implementation using iproute2.

use std::net::IpAddr;

use ipnet::IpNet;
use tokio::process::Command;

use crate::domain::{Route, RoutingTable, RoutingTableLine};
use crate::error::Result;

use super::{elevated, run, RouteCommands};

/// Route types `ip route` may print before the destination.
const ROUTE_TYPES: &[&str] = &[
    "unicast",
    "local",
    "broadcast",
    "multicast",
    "throw",
    "unreachable",
    "prohibit",
    "blackhole",
    "nat",
];

/// Linux-specific routes via `ip route`.
pub struct LinuxRoutes;

impl LinuxRoutes {
    pub fn new() -> Self {
        Self
    }
}

impl RouteCommands for LinuxRoutes {
    async fn routing_table(&self) -> Result<RoutingTable> {
        let mut command = Command::new("ip");
        command.args(["-4", "route", "show"]);
        let output = run(command).await?;
        Ok(parse_ip_route(&output))
    }

    async fn add_route(&self, route: &Route) -> Result<()> {
        let mut command = elevated("ip");
        command.args([
            "route",
            "add",
            &route.dest_cidr.to_string(),
            "via",
            &route.gateway.to_string(),
        ]);
        run(command).await.map(|_| ())
    }

    async fn delete_route(&self, route: &Route) -> Result<()> {
        let mut command = elevated("ip");
        command.args(["route", "del", &route.dest_cidr.to_string()]);
        run(command).await.map(|_| ())
    }
}

/// Parses `ip route show` output.
///
/// Lines look like `10.96.0.0/12 via 192.168.39.2 dev virbr1` or
/// `172.17.0.0/16 dev docker0 proto kernel scope link src 172.17.0.1`.
pub(crate) fn parse_ip_route(output: &str) -> RoutingTable {
    let mut lines = Vec::new();

    for line in output.lines() {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.peek().map_or(false, |t| ROUTE_TYPES.contains(t)) {
            tokens.next();
        }

        let Some(dest) = tokens.next().and_then(parse_destination) else {
            continue;
        };

        let mut gateway = None;
        while let Some(token) = tokens.next() {
            if token == "via" {
                gateway = tokens.next().and_then(|g| g.parse::<IpAddr>().ok());
                break;
            }
        }

        lines.push(RoutingTableLine {
            dest,
            gateway,
            line: line.to_string(),
        });
    }

    RoutingTable::new(lines)
}

fn parse_destination(token: &str) -> Option<IpNet> {
    if token == "default" {
        return "0.0.0.0/0".parse().ok();
    }
    if token.contains('/') {
        return token.parse::<IpNet>().ok().map(|net| net.trunc());
    }

    let addr: IpAddr = token.parse().ok()?;
    let prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, prefix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_ROUTE: &str = "\
default via 172.31.126.254 dev eno1 proto dhcp metric 100
10.96.0.0/12 via 192.168.39.2 dev virbr1
172.17.0.0/16 dev docker0 proto kernel scope link src 172.17.0.1 linkdown
unreachable 10.200.0.0/16 metric 1024
192.168.39.2 dev virbr1 scope link
";

    #[test]
    fn test_parse_ip_route() {
        let table = parse_ip_route(IP_ROUTE);
        let lines = table.lines();
        assert_eq!(lines.len(), 5);

        assert_eq!(lines[0].dest, "0.0.0.0/0".parse::<IpNet>().unwrap());
        assert_eq!(lines[1].gateway, Some("192.168.39.2".parse().unwrap()));
        assert_eq!(lines[2].gateway, None);
        assert_eq!(lines[3].dest, "10.200.0.0/16".parse::<IpNet>().unwrap());
        assert_eq!(lines[4].dest, "192.168.39.2/32".parse::<IpNet>().unwrap());
    }

    #[test]
    fn test_parsed_table_finds_installed_route() {
        let route = Route::new("192.168.39.2".parse().unwrap(), "10.96.0.0/12".parse().unwrap());
        let inspection = parse_ip_route(IP_ROUTE).check(&route);
        assert!(inspection.exists);
        assert!(inspection.conflict.is_none());
    }

    #[test]
    fn test_parse_skips_garbage() {
        assert!(parse_ip_route("Error: something\n\n").is_empty());
    }
}
