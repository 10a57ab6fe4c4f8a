//! The pod lifecycle state machine.
//!
//! A [`PodController`] owns the lifecycle of exactly one user pod:
//! `start()` submits the manifest and waits (bounded) for readiness,
//! `poll()` answers "is it still up", `stop()` tears it down. Many
//! controllers run concurrently on one runtime, each over a shared
//! [`ClusterClient`](crate::ClusterClient); all waits suspend the task
//! instead of blocking a thread.
//!
//! Callers serialize `start()`, `poll()` and `stop()` against a single
//! controller; the `&mut self` receivers on the mutating operations make
//! the single-writer assumption explicit. Dropping a pending `start()`
//! future cancels the wait at an await point; the supervisor then calls
//! `stop()` (valid from `Starting`) to clean up whatever the creation
//! request left behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::client::ClusterApi;
use crate::config::ResourceConfig;
use crate::error::{Result, SpawnError};
use crate::liveness::{evaluate, LivenessMonitor, Readiness};
use crate::manifest::{build_manifest, pod_name_for_user, NOTEBOOK_PORT};
use crate::types::{Endpoint, LifecycleState, Liveness};

/// Fixed wait between readiness polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default maximum total wait for a pod to become ready.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(300);

/// State machine driving one user pod from creation to teardown.
pub struct PodController {
    client: Arc<dyn ClusterApi>,
    monitor: LivenessMonitor,
    resources: ResourceConfig,
    user: String,
    state: LifecycleState,
    endpoint: Option<Endpoint>,
    poll_interval: Duration,
    start_timeout: Duration,
}

impl PodController {
    /// Create a controller for one user over a shared cluster client.
    #[must_use]
    pub fn new(client: Arc<dyn ClusterApi>, resources: ResourceConfig, user: &str) -> Self {
        let monitor = LivenessMonitor::new(Arc::clone(&client));
        Self {
            client,
            monitor,
            resources,
            user: user.to_string(),
            state: LifecycleState::Idle,
            endpoint: None,
            poll_interval: POLL_INTERVAL,
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }

    /// Override the poll interval and startup budget.
    #[must_use]
    pub fn with_timeouts(mut self, poll_interval: Duration, start_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.start_timeout = start_timeout;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The pod's endpoint, valid only while the controller is Running.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Endpoint> {
        if self.state == LifecycleState::Running {
            self.endpoint.as_ref()
        } else {
            None
        }
    }

    /// Resolve this controller's pod name from the template.
    ///
    /// Always computed fresh from the config and user identifier.
    #[must_use]
    pub fn pod_name(&self) -> String {
        pod_name_for_user(&self.resources.pod_name_template, &self.user)
    }

    fn transition(&mut self, to: LifecycleState) -> Result<()> {
        if self.state.can_transition_to(to) {
            debug!(user = %self.user, from = ?self.state, to = ?to, "Lifecycle transition");
            self.state = to;
            Ok(())
        } else {
            Err(SpawnError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    /// Mark the controller Failed and hand the error back.
    fn fail(&mut self, err: SpawnError) -> SpawnError {
        self.state = LifecycleState::Failed;
        err
    }

    /// Create the pod and wait until it is ready and addressable.
    ///
    /// Creation failures are fatal to the attempt and not retried: a
    /// rejected manifest, quota breach or name conflict will not fix
    /// itself. Snapshot fetches during the wait are retried through
    /// transient failures until the startup budget runs out.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the controller is not Idle
    /// - `ClusterRequestFailed` / `ClusterUnreachable` if creation fails
    /// - `PodFailed` if the pod enters the Failed phase while waiting
    /// - `StartupTimeout` if readiness is not reached within the budget
    pub async fn start(&mut self) -> Result<Endpoint> {
        self.transition(LifecycleState::Starting)?;

        let pod_name = self.pod_name();
        info!(user = %self.user, pod_name, image = %self.resources.image, "Starting pod");

        let manifest = match build_manifest(&self.resources, &pod_name) {
            Ok(manifest) => manifest,
            Err(e) => return Err(self.fail(e)),
        };

        if let Err(e) = self.client.create_pod(&manifest).await {
            error!(pod_name, error = %e, "Pod creation failed");
            return Err(self.fail(e));
        }

        let deadline = Instant::now() + self.start_timeout;

        loop {
            match self.client.pods_by_label(&pod_name).await {
                Ok(snapshot) => match evaluate(&snapshot) {
                    Readiness::Ready(ip) => {
                        let endpoint = Endpoint {
                            ip,
                            port: NOTEBOOK_PORT,
                        };
                        self.transition(LifecycleState::Running)?;
                        self.endpoint = Some(endpoint.clone());
                        info!(pod_name, endpoint = %endpoint, "Pod is ready");
                        return Ok(endpoint);
                    }
                    Readiness::Failed(message) => {
                        error!(pod_name, message, "Pod failed during startup");
                        return Err(self.fail(SpawnError::PodFailed { pod_name, message }));
                    }
                    Readiness::NotReady => {
                        debug!(pod_name, "Pod not ready yet");
                    }
                },
                // Cluster API availability blips while waiting are
                // expected; keep polling until the deadline.
                Err(e) if is_transient_poll_error(&e) => {
                    warn!(pod_name, error = %e, "Snapshot fetch failed, will retry");
                }
                Err(e) => {
                    error!(pod_name, error = %e, "Snapshot fetch rejected");
                    return Err(self.fail(e));
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                warn!(pod_name, waited = ?self.start_timeout, "Startup budget exhausted");
                return Err(self.fail(SpawnError::StartupTimeout {
                    pod_name,
                    waited: self.start_timeout,
                }));
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Check whether the pod is still up.
    ///
    /// Delegates to [`LivenessMonitor`], which applies the same readiness
    /// rule as the startup wait. A vanished pod is `NotAlive`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the snapshot cannot be fetched at all;
    /// the supervisor maps that separately from "not ready".
    pub async fn poll(&self) -> Result<Liveness> {
        self.monitor.check(&self.pod_name()).await
    }

    /// Tear the pod down.
    ///
    /// Idempotent: an already-stopped controller stays Stopped, and a pod
    /// the cluster no longer knows about counts as deleted. The local
    /// state reaches Stopped even when the delete request fails; the
    /// error is still surfaced so the supervisor can apply its own retry
    /// policy for genuinely stuck deletions.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if called before `start()`
    /// - `ClusterRequestFailed` / `ClusterUnreachable` for delete
    ///   failures other than not-found
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == LifecycleState::Stopped {
            debug!(user = %self.user, "Already stopped");
            return Ok(());
        }

        self.transition(LifecycleState::Stopping)?;
        self.endpoint = None;

        let pod_name = self.pod_name();
        let result = self.client.delete_pod(&pod_name).await;

        // Teardown is best-effort locally; the supervisor owns retries.
        self.state = LifecycleState::Stopped;

        match result {
            Ok(()) => {
                info!(pod_name, "Pod stopped");
                Ok(())
            }
            Err(e) => {
                warn!(pod_name, error = %e, "Pod deletion failed, state is Stopped locally");
                Err(e)
            }
        }
    }
}

/// Whether a snapshot-fetch error during the wait loop is worth retrying.
///
/// Transport errors and server-side (5xx) responses count as availability
/// blips; a 4xx means our request itself is bad and will not improve.
fn is_transient_poll_error(err: &SpawnError) -> bool {
    match err {
        SpawnError::ClusterUnreachable(_) | SpawnError::PodNotFound(_) => true,
        SpawnError::ClusterRequestFailed { status, .. } => *status >= 500,
        _ => false,
    }
}
