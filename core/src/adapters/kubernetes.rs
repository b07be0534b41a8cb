//! Kubernetes Service API backed by kube-rs.

use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ListParams, PatchParams};
use kube::Client;
use tracing::debug;

use crate::domain::{Patch, PatchType};
use crate::error::{Error, Result};
use crate::ports::ServiceApi;

/// Service access through a configured kube client.
pub struct KubeServiceApi {
    client: Client,
}

impl KubeServiceApi {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the local kubeconfig or in-cluster environment.
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }
}

impl ServiceApi for KubeServiceApi {
    async fn list_services(&self) -> Result<Vec<Service>> {
        let api: Api<Service> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn patch(&self, patch: &Patch) -> Result<()> {
        if patch.resource_kind != "services" {
            return Err(Error::Config(format!(
                "unsupported resource kind {}",
                patch.resource_kind
            )));
        }

        let api: Api<Service> = match &patch.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        };

        debug!(
            path = %patch.request_path(),
            content_type = patch.content_type(),
            "sending patch"
        );

        let params = PatchParams::default();
        match patch.patch_type {
            PatchType::Json => {
                let body = kube::api::Patch::Json::<()>(patch.json_patch()?);
                api.patch_subresource(&patch.subresource, &patch.resource_name, &params, &body)
                    .await?;
            }
            PatchType::Merge => {
                let body = kube::api::Patch::Merge(&patch.body);
                api.patch_subresource(&patch.subresource, &patch.resource_name, &params, &body)
                    .await?;
            }
        }

        Ok(())
    }
}
