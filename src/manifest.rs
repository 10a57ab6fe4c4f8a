//! Declarative pod manifest construction.
//!
//! [`build_manifest`] is a pure transformation from a [`ResourceConfig`]
//! and a resolved pod name to the manifest document the cluster API
//! expects. Resource quantity strings are echoed verbatim; the cluster is
//! the sole validator of quantity syntax and request/limit consistency.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ResourceConfig;
use crate::error::{Result, SpawnError};

/// Name of the single workload container inside every user pod.
pub const CONTAINER_NAME: &str = "notebook";

/// Well-known service port the workload listens on.
pub const NOTEBOOK_PORT: u16 = 8888;

/// A fully-formed pod manifest, ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodManifest {
    /// Cluster API version, always `v1` for pods.
    pub api_version: String,
    /// Resource kind, always `Pod`.
    pub kind: String,
    /// Pod metadata.
    pub metadata: ManifestMetadata,
    /// Pod spec.
    pub spec: ManifestSpec,
}

/// Metadata block of a pod manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Pod name, unique per user within the namespace.
    pub name: String,
    /// Labels; carries `name=<pod_name>` so label-selector reads match.
    pub labels: BTreeMap<String, String>,
}

/// Spec block of a pod manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSpec {
    /// The single workload container.
    pub containers: Vec<ManifestContainer>,
}

/// A container entry in a pod manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestContainer {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Resource requests and limits.
    pub resources: ManifestResources,
    /// Environment variables.
    pub env: Vec<ManifestEnvVar>,
}

/// Resource requests and limits for a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResources {
    /// Guaranteed resources.
    pub requests: ResourceQuantities,
    /// Maximum resources.
    pub limits: ResourceQuantities,
}

/// CPU and memory quantity strings, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantities {
    /// CPU quantity, e.g. `200m`.
    pub cpu: String,
    /// Memory quantity, e.g. `128Mi`.
    pub memory: String,
}

/// One environment variable entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Resolve the pod name for a user from the configured template.
///
/// Computed fresh on every use; callers must not cache the result
/// separately from the config it came from.
#[must_use]
pub fn pod_name_for_user(template: &str, user: &str) -> String {
    template.replace("{user}", user)
}

/// Build a pod manifest from a resource configuration and a resolved name.
///
/// # Errors
///
/// Returns `ManifestInvalid` if the pod name is empty. Everything else is
/// a total transformation; malformed quantities surface later as a cluster
/// rejection.
pub fn build_manifest(config: &ResourceConfig, pod_name: &str) -> Result<PodManifest> {
    if pod_name.is_empty() {
        return Err(SpawnError::ManifestInvalid(
            "pod name resolved to an empty string".to_string(),
        ));
    }

    let mut labels = BTreeMap::new();
    labels.insert("name".to_string(), pod_name.to_string());

    // BTreeMap iteration keeps the env list deterministic across builds.
    let env = config
        .env
        .iter()
        .map(|(name, value)| ManifestEnvVar {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();

    Ok(PodManifest {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        metadata: ManifestMetadata {
            name: pod_name.to_string(),
            labels,
        },
        spec: ManifestSpec {
            containers: vec![ManifestContainer {
                name: CONTAINER_NAME.to_string(),
                image: config.image.clone(),
                resources: ManifestResources {
                    requests: ResourceQuantities {
                        cpu: config.cpu_request.clone(),
                        memory: config.mem_request.clone(),
                    },
                    limits: ResourceQuantities {
                        cpu: config.cpu_limit.clone(),
                        memory: config.mem_limit.clone(),
                    },
                },
                env,
            }],
        },
    })
}
