//! Route domain model and routing table checks.

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// A network range made reachable through the host gateway.
///
/// Two routes are equal when both the destination CIDR and the gateway match;
/// this is the key the registry uses to detect conflicting tunnels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Host-reachable IP of the cluster machine.
    pub gateway: IpAddr,
    /// Cluster network behind the gateway (usually the service CIDR).
    pub dest_cidr: IpNet,
}

impl Route {
    pub fn new(gateway: IpAddr, dest_cidr: IpNet) -> Self {
        Self {
            gateway,
            dest_cidr: dest_cidr.trunc(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.dest_cidr, self.gateway)
    }
}

/// Result of looking up a route in the host routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteInspection {
    /// The exact route (CIDR and gateway) is installed.
    pub exists: bool,
    /// A route to the same CIDR through a different gateway.
    pub conflict: Option<String>,
    /// Gateway of the installed route to this CIDR, if any.
    pub gateway: Option<IpAddr>,
    /// Routes whose range contains or is contained by the destination.
    pub overlaps: Vec<String>,
}

/// One parsed line of a host routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTableLine {
    pub dest: IpNet,
    /// `None` for directly connected (on-link) routes.
    pub gateway: Option<IpAddr>,
    /// The raw line, kept for error messages.
    pub line: String,
}

/// A host routing table, as parsed from the OS tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    lines: Vec<RoutingTableLine>,
}

impl RoutingTable {
    pub fn new(lines: Vec<RoutingTableLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[RoutingTableLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Compares `route` against every line of the table.
    pub fn check(&self, route: &Route) -> RouteInspection {
        let mut inspection = RouteInspection::default();

        for entry in &self.lines {
            if entry.dest == route.dest_cidr {
                inspection.gateway = entry.gateway;
                if entry.gateway == Some(route.gateway) {
                    inspection.exists = true;
                } else {
                    inspection.conflict = Some(entry.line.trim().to_string());
                }
            } else if entry.dest.prefix_len() > 0
                && (entry.dest.contains(&route.dest_cidr) || route.dest_cidr.contains(&entry.dest))
            {
                inspection.overlaps.push(entry.line.trim().to_string());
            }
        }

        inspection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(dest: &str, gateway: Option<&str>) -> RoutingTableLine {
        RoutingTableLine {
            dest: dest.parse().unwrap(),
            gateway: gateway.map(|g| g.parse().unwrap()),
            line: format!("{} via {:?}", dest, gateway),
        }
    }

    fn service_route() -> Route {
        Route::new("192.168.39.2".parse().unwrap(), "10.96.0.0/12".parse().unwrap())
    }

    #[test]
    fn test_route_display_and_truncation() {
        let route = Route::new("192.168.39.2".parse().unwrap(), "10.96.1.7/12".parse().unwrap());
        assert_eq!(route.to_string(), "10.96.0.0/12 -> 192.168.39.2");
        assert_eq!(route, service_route());
    }

    #[test]
    fn test_check_existing_route() {
        let table = RoutingTable::new(vec![
            line("0.0.0.0/0", Some("172.31.0.1")),
            line("10.96.0.0/12", Some("192.168.39.2")),
        ]);

        let inspection = table.check(&service_route());
        assert!(inspection.exists);
        assert!(inspection.conflict.is_none());
        assert_eq!(inspection.gateway, Some("192.168.39.2".parse().unwrap()));
        assert!(inspection.overlaps.is_empty());
    }

    #[test]
    fn test_check_conflicting_gateway() {
        let table = RoutingTable::new(vec![line("10.96.0.0/12", Some("10.0.0.1"))]);

        let inspection = table.check(&service_route());
        assert!(!inspection.exists);
        assert!(inspection.conflict.unwrap().contains("10.96.0.0/12"));
    }

    #[test]
    fn test_check_overlaps_skip_default_route() {
        let table = RoutingTable::new(vec![
            line("0.0.0.0/0", Some("172.31.0.1")),
            line("10.0.0.0/8", None),
            line("10.96.4.0/24", Some("10.0.0.9")),
        ]);

        let inspection = table.check(&service_route());
        assert!(!inspection.exists);
        assert!(inspection.conflict.is_none());
        assert_eq!(inspection.overlaps.len(), 2);
    }
}
