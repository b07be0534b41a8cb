//! Kubernetes Service API port (interface).

use k8s_openapi::api::core::v1::Service;

use crate::domain::Patch;
use crate::error::Result;

/// Port for the subset of the Kubernetes API the LoadBalancer emulator needs.
pub trait ServiceApi: Send + Sync {
    /// List Services across all namespaces.
    fn list_services(&self) -> impl std::future::Future<Output = Result<Vec<Service>>> + Send;

    /// Send `patch` to the resource and subresource it names.
    fn patch(&self, patch: &Patch) -> impl std::future::Future<Output = Result<()>> + Send;
}
