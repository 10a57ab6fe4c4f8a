//! Domain types shared across the crate.

use serde::{Deserialize, Serialize};

/// Phase of a pod as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PodPhase {
    /// Pod has been accepted but containers are not yet running.
    Pending,
    /// Pod is running with at least one container.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// At least one container failed.
    Failed,
    /// Pod status cannot be determined.
    #[default]
    #[serde(other)]
    Unknown,
}

impl PodPhase {
    /// Check if the pod is in a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Check if the pod is running or pending.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

/// A single condition record from a pod's status block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodCondition {
    /// Condition type, e.g. `Ready` or `PodScheduled`.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Condition status: `True`, `False` or `Unknown`.
    pub status: String,
}

/// Status block of a single pod record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodStatus {
    /// Current phase of the pod lifecycle.
    #[serde(default)]
    pub phase: PodPhase,
    /// Reported conditions, in cluster order.
    #[serde(default)]
    pub conditions: Vec<PodCondition>,
    /// IP assigned to the pod, once scheduled.
    // The wire field is "podIP", which rename_all = "camelCase" would
    // render as "podIp".
    #[serde(default, rename = "podIP")]
    pub pod_ip: Option<String>,
    /// Human-readable message about the pod's status.
    #[serde(default)]
    pub message: Option<String>,
}

/// Metadata subset we care about when reading pods back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetadata {
    /// Pod name.
    #[serde(default)]
    pub name: Option<String>,
}

/// One pod record out of a label-filtered list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodRecord {
    /// Pod metadata.
    #[serde(default)]
    pub metadata: PodMetadata,
    /// Pod status block.
    #[serde(default)]
    pub status: PodStatus,
}

/// Transient read of cluster state: zero or more pods matching a label
/// selector. Never persisted; re-fetched on every poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodStatusSnapshot {
    /// Matching pod records.
    #[serde(default)]
    pub items: Vec<PodRecord>,
}

/// The controller's own lifecycle state.
///
/// Owned exclusively by [`PodController`](crate::PodController); the only
/// mutable, long-lived entity in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No pod requested yet.
    Idle,
    /// Creation submitted, waiting for readiness.
    Starting,
    /// Pod is ready and addressable.
    Running,
    /// Teardown in progress.
    Stopping,
    /// Pod has been torn down.
    Stopped,
    /// An unrecoverable error occurred.
    Failed,
}

impl LifecycleState {
    /// Check if a state transition is allowed.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Idle, Self::Starting)
                | (Self::Starting, Self::Running | Self::Stopping)
                | (Self::Running, Self::Stopping)
                // A failed start may still need its pod torn down
                | (Self::Failed, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
                // Any state except Stopped may fail.
                | (
                    Self::Idle | Self::Starting | Self::Running | Self::Stopping,
                    Self::Failed
                )
        )
    }

    /// Check if the controller has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

/// Network address of a ready pod.
///
/// Produced once per successful `start()`; only valid while the
/// controller is in [`LifecycleState::Running`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Pod IP address.
    pub ip: String,
    /// Well-known service port inside the pod.
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Result of a steady-state liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The pod is running and ready.
    Alive,
    /// The pod is gone or not ready; the supervisor decides what to do.
    NotAlive,
}
