//! Single-user pod lifecycle management for Kubernetes-style clusters.
//!
//! This crate bridges a session supervisor (which needs one addressable
//! compute endpoint per user) and a cluster control plane exposed over
//! REST. Each [`PodController`] drives exactly one user pod through
//! create → wait-for-ready → running → teardown; many controllers share
//! one runtime and one authenticated [`ClusterClient`].
//!
//! - [`manifest`] turns a [`ResourceConfig`] into a pod manifest
//! - [`client`] speaks the namespaced pod REST API (bearer token, TLS)
//! - [`controller`] owns the lifecycle state machine
//! - [`liveness`] defines the readiness rule, used by startup and
//!   steady-state checks alike
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use podspawn::{ClusterClient, ClusterConfig, PodController, ResourceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cluster = Arc::new(ClusterClient::new(ClusterConfig::from_env())?);
//!
//! let mut controller = PodController::new(cluster, ResourceConfig::from_env(), "alice");
//! let endpoint = controller.start().await?;
//! println!("notebook at {endpoint}");
//!
//! // later, from the supervisor's health loop
//! let liveness = controller.poll().await?;
//! # let _ = liveness;
//!
//! controller.stop().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod liveness;
pub mod manifest;
pub mod types;

pub use client::{ClusterApi, ClusterClient};
pub use config::{ClusterConfig, ResourceConfig};
pub use controller::{PodController, DEFAULT_START_TIMEOUT, POLL_INTERVAL};
pub use error::{Result, SpawnError};
pub use liveness::{LivenessMonitor, Readiness};
pub use manifest::{build_manifest, pod_name_for_user, PodManifest};
pub use types::{Endpoint, LifecycleState, Liveness, PodPhase, PodStatusSnapshot};

#[cfg(any(test, feature = "test-utils"))]
pub use client::mock::MockCluster;
