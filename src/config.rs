//! Configuration for the cluster connection and the user workload.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection parameters for the cluster API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base endpoint for cluster API calls, e.g. `https://10.0.0.1:6443`.
    pub api_endpoint: String,
    /// Cluster API version segment.
    pub api_version: String,
    /// Namespace to create pods in.
    pub namespace: String,
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// Path to the CA bundle used to verify the API server's certificate.
    ///
    /// Ignored when [`Self::insecure_skip_verify`] is set.
    pub ca_bundle: Option<PathBuf>,
    /// Explicitly disable TLS verification.
    pub insecure_skip_verify: bool,
    /// Per-request timeout on every cluster API call.
    pub request_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            api_version: "v1".to_string(),
            namespace: "jupyter".to_string(),
            token: String::new(),
            ca_bundle: Some(PathBuf::from(
                "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt",
            )),
            insecure_skip_verify: false,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `KUBE_API_ENDPOINT`: base endpoint for cluster API calls
    /// - `KUBE_API_VERSION`: cluster API version segment
    /// - `KUBE_NAMESPACE`: namespace to create pods in
    /// - `KUBE_TOKEN`: bearer token for API authorization
    /// - `KUBE_CA_PATH`: CA bundle path, or `false` to disable verification
    /// - `KUBE_REQUEST_TIMEOUT_SECS`: per-request timeout in seconds
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("KUBE_API_ENDPOINT") {
            config.api_endpoint = val;
        }
        if let Ok(val) = std::env::var("KUBE_API_VERSION") {
            config.api_version = val;
        }
        if let Ok(val) = std::env::var("KUBE_NAMESPACE") {
            config.namespace = val;
        }
        if let Ok(val) = std::env::var("KUBE_TOKEN") {
            config.token = val;
        }
        if let Ok(val) = std::env::var("KUBE_CA_PATH") {
            if val.eq_ignore_ascii_case("false") {
                config.ca_bundle = None;
                config.insecure_skip_verify = true;
            } else {
                config.ca_bundle = Some(PathBuf::from(val));
            }
        }
        if let Ok(val) = std::env::var("KUBE_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    /// URL of the namespaced pod collection.
    #[must_use]
    pub fn pods_url(&self) -> String {
        format!(
            "{}/api/{}/namespaces/{}/pods",
            self.api_endpoint, self.api_version, self.namespace
        )
    }

    /// URL of a specific named pod resource.
    #[must_use]
    pub fn pod_url(&self, pod_name: &str) -> String {
        format!("{}/{}", self.pods_url(), pod_name)
    }
}

/// Immutable description of the user workload.
///
/// Supplied once at controller construction; never mutated by the core.
/// Resource quantities are opaque strings in the cluster's quantity format
/// (e.g. `200m`, `128Mi`) and are passed through verbatim: malformed
/// values are rejected by the cluster API, not locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Container image to run for the user.
    pub image: String,
    /// Minimum CPU the user is guaranteed.
    pub cpu_request: String,
    /// Maximum CPU the user can use.
    pub cpu_limit: String,
    /// Minimum memory the user is guaranteed.
    pub mem_request: String,
    /// Maximum memory the user can use.
    pub mem_limit: String,
    /// Template for pod names; `{user}` is replaced with the user identifier.
    pub pod_name_template: String,
    /// Environment variables injected into the workload container.
    pub env: BTreeMap<String, String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            image: "jupyter/singleuser".to_string(),
            cpu_request: "200m".to_string(),
            cpu_limit: "2000m".to_string(),
            mem_request: "128Mi".to_string(),
            mem_limit: "1Gi".to_string(),
            pod_name_template: "jupyter-{user}".to_string(),
            env: BTreeMap::new(),
        }
    }
}

impl ResourceConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `SINGLEUSER_IMAGE`: container image for user pods
    /// - `SINGLEUSER_CPU_REQUEST` / `SINGLEUSER_CPU_LIMIT`
    /// - `SINGLEUSER_MEM_REQUEST` / `SINGLEUSER_MEM_LIMIT`
    /// - `POD_NAME_TEMPLATE`: pod name template with a `{user}` placeholder
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SINGLEUSER_IMAGE") {
            config.image = val;
        }
        if let Ok(val) = std::env::var("SINGLEUSER_CPU_REQUEST") {
            config.cpu_request = val;
        }
        if let Ok(val) = std::env::var("SINGLEUSER_CPU_LIMIT") {
            config.cpu_limit = val;
        }
        if let Ok(val) = std::env::var("SINGLEUSER_MEM_REQUEST") {
            config.mem_request = val;
        }
        if let Ok(val) = std::env::var("SINGLEUSER_MEM_LIMIT") {
            config.mem_limit = val;
        }
        if let Ok(val) = std::env::var("POD_NAME_TEMPLATE") {
            config.pod_name_template = val;
        }

        config
    }
}
