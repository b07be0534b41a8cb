//! Error types for the lbtunnel-core library.

use thiserror::Error;

use crate::domain::TunnelId;

/// Result type alias for tunnel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a tunnel.
#[derive(Error, Debug)]
pub enum Error {
    /// The host driver or cluster configuration could not be read.
    #[error("unable to determine cluster info: {0}")]
    Inspection(String),

    /// Another live tunnel already owns the route.
    #[error("there is already a running tunnel for this machine: {0}")]
    TunnelAlreadyExists(TunnelId),

    /// Failed to inspect, add or remove a host route.
    #[error("{0}")]
    Route(String),

    /// The host routing table holds a route this tool does not own.
    #[error("conflicting route: {0}")]
    RouteConflict(String),

    /// Failed to read or update the tunnel registry.
    #[error("registry error: {0}")]
    Registry(String),

    /// One or more LoadBalancer services could not be patched.
    #[error("{0}")]
    LoadBalancer(String),

    /// Kubernetes API error.
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),

    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Route;

    #[test]
    fn test_error_display() {
        let route = Route::new("192.168.39.2".parse().unwrap(), "10.96.0.0/12".parse().unwrap());
        let err = Error::TunnelAlreadyExists(TunnelId::new(route, "minikube", 4242));
        assert!(err.to_string().contains("already a running tunnel"));
        assert!(err.to_string().contains("4242"));

        let err = Error::RouteConflict("10.96.0.0/12 via 10.0.0.1".to_string());
        assert_eq!(err.to_string(), "conflicting route: 10.96.0.0/12 via 10.0.0.1");
    }
}
