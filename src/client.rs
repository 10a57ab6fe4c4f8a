//! REST client for the namespaced pod collection.
//!
//! The [`ClusterClient`] is an explicitly constructed, explicitly owned
//! dependency: the authenticated HTTP session is built once in
//! [`ClusterClient::new`] and shared across controllers by the caller
//! (reqwest clients are cheap to clone and safe for concurrent use).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::ClusterConfig;
use crate::error::{Result, SpawnError};
use crate::manifest::PodManifest;
use crate::types::PodStatusSnapshot;

/// The `ClusterApi` trait defines the pod-collection operations the
/// lifecycle controller needs.
///
/// Abstracted behind a trait so tests can substitute an in-memory cluster.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Submit a pod manifest to the collection endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ClusterRequestFailed` on any non-2xx response (including
    /// a 409 name conflict) and `ClusterUnreachable` on transport errors.
    async fn create_pod(&self, manifest: &PodManifest) -> Result<()>;

    /// Fetch the pods matching the label selector `name=<pod_name>`.
    ///
    /// An empty snapshot is a normal result during the window between
    /// creation and scheduler visibility, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the list request fails.
    async fn pods_by_label(&self, pod_name: &str) -> Result<PodStatusSnapshot>;

    /// Delete the named pod. Not-found is treated as success.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than 404.
    async fn delete_pod(&self, pod_name: &str) -> Result<()>;
}

/// HTTP client for a Kubernetes-style pod collection.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    http: reqwest::Client,
    config: ClusterConfig,
}

impl ClusterClient {
    /// Create a new client from connection parameters.
    ///
    /// The bearer token and TLS trust anchor are baked into the session
    /// here; individual calls carry no per-request credentials.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the token is not a valid header value or the
    /// CA bundle cannot be read, and `ClusterUnreachable` if the HTTP
    /// client itself cannot be built.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| SpawnError::Config(format!("invalid bearer token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout);

        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(ca_path) = &config.ca_bundle {
            let pem = std::fs::read(ca_path).map_err(|e| {
                SpawnError::Config(format!(
                    "cannot read CA bundle {}: {e}",
                    ca_path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| SpawnError::Config(format!("invalid CA bundle: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build()?;

        Ok(Self { http, config })
    }

    /// Create a client around a pre-built HTTP session.
    ///
    /// Useful for tests that point at a plain-HTTP mock server.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, config: ClusterConfig) -> Self {
        Self { http, config }
    }

    /// Get a reference to the connection configuration.
    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Turn a non-2xx response into a `ClusterRequestFailed` error.
    async fn request_failed(response: reqwest::Response) -> SpawnError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        SpawnError::ClusterRequestFailed { status, body }
    }
}

#[async_trait]
impl ClusterApi for ClusterClient {
    async fn create_pod(&self, manifest: &PodManifest) -> Result<()> {
        let url = self.config.pods_url();
        let pod_name = manifest.metadata.name.as_str();

        let response = self.http.post(&url).json(manifest).send().await?;

        if response.status().is_success() {
            debug!(pod_name, namespace = %self.config.namespace, "Submitted pod manifest");
            Ok(())
        } else {
            let err = Self::request_failed(response).await;
            warn!(pod_name, error = %err, "Pod creation rejected");
            Err(err)
        }
    }

    async fn pods_by_label(&self, pod_name: &str) -> Result<PodStatusSnapshot> {
        let url = self.config.pods_url();

        let response = self
            .http
            .get(&url)
            .query(&[("labelSelector", format!("name={pod_name}"))])
            .send()
            .await?;

        if response.status().is_success() {
            let snapshot: PodStatusSnapshot = response.json().await?;
            debug!(pod_name, matches = snapshot.items.len(), "Fetched pod snapshot");
            Ok(snapshot)
        } else {
            Err(Self::request_failed(response).await)
        }
    }

    async fn delete_pod(&self, pod_name: &str) -> Result<()> {
        let url = self.config.pod_url(pod_name);

        let response = self.http.delete(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!(pod_name, "Pod not found on delete, already gone");
                Ok(())
            }
            status if status.is_success() => {
                debug!(pod_name, "Deleted pod");
                Ok(())
            }
            _ => {
                let err = Self::request_failed(response).await;
                warn!(pod_name, error = %err, "Pod deletion failed");
                Err(err)
            }
        }
    }
}

/// An in-memory cluster for testing without an API server.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::{async_trait, ClusterApi, PodManifest, PodStatusSnapshot, Result};
    use crate::types::{PodCondition, PodMetadata, PodPhase, PodRecord, PodStatus};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A mock cluster that stores pods in memory.
    ///
    /// Created pods start in `Pending`; tests drive them through phases
    /// with the setters.
    #[derive(Default)]
    pub struct MockCluster {
        pods: Mutex<HashMap<String, PodRecord>>,
        manifests: Mutex<Vec<PodManifest>>,
    }

    impl MockCluster {
        /// Create a new empty mock cluster.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of pods currently in the cluster.
        #[must_use]
        pub fn pod_count(&self) -> usize {
            self.pods.lock().len()
        }

        /// All manifests submitted so far, in order.
        #[must_use]
        pub fn submitted_manifests(&self) -> Vec<PodManifest> {
            self.manifests.lock().clone()
        }

        /// Set the phase of a pod.
        pub fn set_phase(&self, pod_name: &str, phase: PodPhase) {
            if let Some(pod) = self.pods.lock().get_mut(pod_name) {
                pod.status.phase = phase;
            }
        }

        /// Mark a pod Running and Ready with the given IP.
        pub fn set_ready(&self, pod_name: &str, ip: &str) {
            if let Some(pod) = self.pods.lock().get_mut(pod_name) {
                pod.status.phase = PodPhase::Running;
                pod.status.pod_ip = Some(ip.to_string());
                pod.status.conditions = vec![PodCondition {
                    condition_type: "Ready".to_string(),
                    status: "True".to_string(),
                }];
            }
        }

        /// Set a status message on a pod.
        pub fn set_message(&self, pod_name: &str, message: &str) {
            if let Some(pod) = self.pods.lock().get_mut(pod_name) {
                pod.status.message = Some(message.to_string());
            }
        }

        /// Remove a pod out from under the controller.
        pub fn evict(&self, pod_name: &str) {
            self.pods.lock().remove(pod_name);
        }
    }

    #[async_trait]
    impl ClusterApi for MockCluster {
        async fn create_pod(&self, manifest: &PodManifest) -> Result<()> {
            let name = manifest.metadata.name.clone();
            self.manifests.lock().push(manifest.clone());

            let mut pods = self.pods.lock();
            if pods.contains_key(&name) {
                return Ok(());
            }
            pods.insert(
                name.clone(),
                PodRecord {
                    metadata: PodMetadata { name: Some(name) },
                    status: PodStatus {
                        phase: PodPhase::Pending,
                        ..Default::default()
                    },
                },
            );
            Ok(())
        }

        async fn pods_by_label(&self, pod_name: &str) -> Result<PodStatusSnapshot> {
            let items = self
                .pods
                .lock()
                .get(pod_name)
                .cloned()
                .into_iter()
                .collect();
            Ok(PodStatusSnapshot { items })
        }

        async fn delete_pod(&self, pod_name: &str) -> Result<()> {
            // Absent pod is fine, deletion is idempotent
            self.pods.lock().remove(pod_name);
            Ok(())
        }
    }
}
