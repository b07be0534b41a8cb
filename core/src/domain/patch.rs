//! Patch requests against Kubernetes subresources.

use json_patch::{AddOperation, PatchOperation, RemoveOperation};
use serde_json::{json, Value};

use crate::error::{Error, Result};

/// JSON path of the LoadBalancer ingress list on a Service.
pub const INGRESS_PATH: &str = "/status/loadBalancer/ingress";

/// Patch flavour, which determines the request content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    /// RFC 6902 JSON patch.
    Json,
    /// RFC 7386 JSON merge patch.
    Merge,
}

impl PatchType {
    pub fn content_type(&self) -> &'static str {
        match self {
            PatchType::Json => "application/json-patch+json",
            PatchType::Merge => "application/merge-patch+json",
        }
    }
}

/// A single patch of one resource's subresource. Built per call, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub patch_type: PatchType,
    pub resource_name: String,
    pub namespace: Option<String>,
    pub subresource: String,
    /// Plural resource kind as used in API paths, e.g. `services`.
    pub resource_kind: String,
    pub body: Value,
}

impl Patch {
    /// Sets a Service's LoadBalancer ingress to a single entry with `ip`.
    pub fn add_ingress(name: &str, namespace: &str, ip: &str) -> Self {
        let op = PatchOperation::Add(AddOperation {
            path: INGRESS_PATH.to_string(),
            value: json!([{ "ip": ip }]),
        });
        Self::service_status(name, namespace, json_patch::Patch(vec![op]))
    }

    /// Removes a Service's LoadBalancer ingress list.
    pub fn remove_ingress(name: &str, namespace: &str) -> Self {
        let op = PatchOperation::Remove(RemoveOperation {
            path: INGRESS_PATH.to_string(),
        });
        Self::service_status(name, namespace, json_patch::Patch(vec![op]))
    }

    fn service_status(name: &str, namespace: &str, patch: json_patch::Patch) -> Self {
        Self {
            patch_type: PatchType::Json,
            resource_name: name.to_string(),
            namespace: Some(namespace.to_string()),
            subresource: "status".to_string(),
            resource_kind: "services".to_string(),
            // A list of operations always serializes
            body: serde_json::to_value(patch).unwrap_or(Value::Null),
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.patch_type.content_type()
    }

    /// Core API path the PATCH request targets.
    pub fn request_path(&self) -> String {
        match &self.namespace {
            Some(ns) => format!(
                "/api/v1/namespaces/{}/{}/{}/{}",
                ns, self.resource_kind, self.resource_name, self.subresource
            ),
            None => format!(
                "/api/v1/{}/{}/{}",
                self.resource_kind, self.resource_name, self.subresource
            ),
        }
    }

    /// Decodes the body as JSON patch operations.
    pub fn json_patch(&self) -> Result<json_patch::Patch> {
        if self.patch_type != PatchType::Json {
            return Err(Error::ParseError(format!(
                "patch for {} is not a JSON patch",
                self.resource_name
            )));
        }
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ingress_wire_form() {
        let patch = Patch::add_ingress("svc-lb", "default", "10.96.0.15");

        assert_eq!(patch.content_type(), "application/json-patch+json");
        assert_eq!(
            patch.request_path(),
            "/api/v1/namespaces/default/services/svc-lb/status"
        );
        assert_eq!(
            patch.body,
            json!([{ "op": "add", "path": "/status/loadBalancer/ingress", "value": [{ "ip": "10.96.0.15" }] }])
        );
    }

    #[test]
    fn test_remove_ingress_wire_form() {
        let patch = Patch::remove_ingress("svc-lb", "kube-system");

        assert_eq!(
            patch.body,
            json!([{ "op": "remove", "path": "/status/loadBalancer/ingress" }])
        );
        assert_eq!(patch.json_patch().unwrap().0.len(), 1);
    }

    #[test]
    fn test_merge_patch_is_not_json_patch() {
        let mut patch = Patch::remove_ingress("svc-lb", "default");
        patch.patch_type = PatchType::Merge;
        assert_eq!(patch.content_type(), "application/merge-patch+json");
        assert!(patch.json_patch().is_err());
    }
}
