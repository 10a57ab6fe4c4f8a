//! Readiness evaluation and steady-state liveness checks.
//!
//! The readiness predicate is defined exactly once, here, and exercised
//! identically by the startup wait loop and by [`LivenessMonitor`].

use std::sync::Arc;

use tracing::debug;

use crate::client::ClusterApi;
use crate::error::Result;
use crate::types::{Liveness, PodPhase, PodRecord, PodStatusSnapshot};

/// Outcome of evaluating a status snapshot against the readiness rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// The pod is Running, Ready, and addressable at this IP.
    Ready(String),
    /// The pod is absent or not yet ready; keep waiting.
    NotReady,
    /// The pod entered the Failed phase; waiting further is pointless.
    Failed(String),
}

/// Check whether a single pod record satisfies the readiness rule.
///
/// The condition list is searched for `type == "Ready"` with
/// `status == "True"`; condition order in the cluster response is not
/// meaningful and must not be relied on.
#[must_use]
pub fn is_pod_ready(record: &PodRecord) -> bool {
    record.status.phase == PodPhase::Running
        && record
            .status
            .conditions
            .iter()
            .any(|c| c.condition_type == "Ready" && c.status == "True")
}

/// Evaluate a status snapshot.
///
/// An empty snapshot is `NotReady`: during the window between creation
/// and scheduler visibility the pod legitimately does not show up yet.
/// A Failed phase is terminal and reported as such so callers do not
/// poll forever.
#[must_use]
pub fn evaluate(snapshot: &PodStatusSnapshot) -> Readiness {
    let Some(pod) = snapshot.items.first() else {
        return Readiness::NotReady;
    };

    if pod.status.phase == PodPhase::Failed {
        let message = pod
            .status
            .message
            .clone()
            .unwrap_or_else(|| "pod entered Failed phase".to_string());
        return Readiness::Failed(message);
    }

    if is_pod_ready(pod) {
        if let Some(ip) = &pod.status.pod_ip {
            return Readiness::Ready(ip.clone());
        }
        // Ready without an IP is not addressable yet
    }

    Readiness::NotReady
}

/// Periodic "is this pod still up" check for an external supervisor.
///
/// Stateless beyond the single round-trip each call performs.
pub struct LivenessMonitor {
    client: Arc<dyn ClusterApi>,
}

impl LivenessMonitor {
    /// Create a monitor over a shared cluster client.
    #[must_use]
    pub fn new(client: Arc<dyn ClusterApi>) -> Self {
        Self { client }
    }

    /// Fetch a fresh snapshot and apply the readiness rule.
    ///
    /// A pod that has disappeared entirely is `NotAlive`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `ClusterUnreachable` or `ClusterRequestFailed` when the
    /// snapshot itself cannot be fetched; the supervisor distinguishes
    /// that from "not ready" and owns the retry policy.
    pub async fn check(&self, pod_name: &str) -> Result<Liveness> {
        let snapshot = self.client.pods_by_label(pod_name).await?;

        let liveness = match evaluate(&snapshot) {
            Readiness::Ready(_) => Liveness::Alive,
            Readiness::NotReady | Readiness::Failed(_) => Liveness::NotAlive,
        };

        debug!(pod_name, alive = matches!(liveness, Liveness::Alive), "Liveness check");
        Ok(liveness)
    }
}
