//! Error types for pod lifecycle operations.

use std::time::Duration;

use thiserror::Error;

use crate::types::LifecycleState;

/// Errors that can occur while driving a pod's lifecycle.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The cluster API answered with a non-2xx status.
    #[error("cluster API returned {status}: {body}")]
    ClusterRequestFailed {
        /// HTTP status code returned by the cluster API.
        status: u16,
        /// Response body, kept verbatim for diagnosis.
        body: String,
    },

    /// The cluster API could not be reached at the transport level.
    #[error("cluster API unreachable: {0}")]
    ClusterUnreachable(#[from] reqwest::Error),

    /// The pod did not become ready within the startup budget.
    #[error("pod {pod_name} not ready after {waited:?}")]
    StartupTimeout {
        /// Name of the pod that never became ready.
        pod_name: String,
        /// Total time spent waiting.
        waited: Duration,
    },

    /// The pod does not exist in the cluster.
    #[error("pod not found: {0}")]
    PodNotFound(String),

    /// The pod entered the Failed phase while we were waiting for it.
    #[error("pod {pod_name} failed: {message}")]
    PodFailed {
        /// Name of the failed pod.
        pod_name: String,
        /// Failure message reported by the cluster, if any.
        message: String,
    },

    /// The manifest could not be built from the given configuration.
    #[error("invalid manifest: {0}")]
    ManifestInvalid(String),

    /// The client or controller was misconfigured.
    #[error("configuration error: {0}")]
    Config(String),

    /// A lifecycle operation was issued in a state that does not allow it.
    #[error("invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the controller was in.
        from: LifecycleState,
        /// State the operation tried to reach.
        to: LifecycleState,
    },
}

impl SpawnError {
    /// Check if this error is transient and worth retrying.
    ///
    /// Transport blips and missing pods are expected during the window
    /// between creation and scheduler visibility; HTTP-level rejections
    /// of a create are not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ClusterUnreachable(_) | Self::PodNotFound(_))
    }
}

/// A specialized Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, SpawnError>;
