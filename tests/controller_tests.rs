//! End-to-end lifecycle scenarios against a mock cluster API server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use podspawn::{
    ClusterClient, ClusterConfig, LifecycleState, Liveness, PodController, ResourceConfig,
    SpawnError,
};

const PODS_PATH: &str = "/api/v1/namespaces/jupyter/pods";

fn cluster_client(server: &MockServer) -> Arc<ClusterClient> {
    let config = ClusterConfig {
        api_endpoint: server.uri(),
        token: "test-token".to_string(),
        ca_bundle: None,
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    Arc::new(ClusterClient::new(config).unwrap())
}

fn controller(client: Arc<ClusterClient>, user: &str) -> PodController {
    // Short poll interval so scenarios finish quickly
    PodController::new(client, ResourceConfig::default(), user)
        .with_timeouts(Duration::from_millis(20), Duration::from_secs(5))
}

fn running_pod_body(pod_name: &str, ip: &str) -> serde_json::Value {
    json!({
        "items": [{
            "metadata": { "name": pod_name },
            "status": {
                "phase": "Running",
                "conditions": [
                    { "type": "PodScheduled", "status": "True" },
                    { "type": "Ready", "status": "True" }
                ],
                "podIP": ip
            }
        }]
    })
}

#[tokio::test]
async fn scenario_a_start_returns_endpoint() {
    let server = MockServer::start().await;

    // Creation must carry the bearer token and echo the configured image
    Mock::given(method("POST"))
        .and(path(PODS_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "kind": "Pod",
            "metadata": { "name": "jupyter-alice", "labels": { "name": "jupyter-alice" } },
            "spec": { "containers": [{
                "image": "jupyter/singleuser",
                "resources": { "limits": { "cpu": "2000m", "memory": "1Gi" } }
            }]}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    // First snapshot: the scheduler hasn't made the pod visible yet
    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .and(query_param("labelSelector", "name=jupyter-alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // Second snapshot onward: running and ready
    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .and(query_param("labelSelector", "name=jupyter-alice"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(running_pod_body("jupyter-alice", "10.0.0.5")),
        )
        .mount(&server)
        .await;

    let mut controller = controller(cluster_client(&server), "alice");
    let endpoint = controller.start().await.unwrap();

    assert_eq!(endpoint.ip, "10.0.0.5");
    assert_eq!(endpoint.port, 8888);
    assert_eq!(controller.state(), LifecycleState::Running);
}

#[tokio::test]
async fn scenario_b_poll_on_empty_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .and(query_param("labelSelector", "name=jupyter-bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let controller = controller(cluster_client(&server), "bob");
    assert_eq!(controller.poll().await.unwrap(), Liveness::NotAlive);
}

#[tokio::test]
async fn scenario_c_stop_on_missing_pod() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(running_pod_body("jupyter-carol", "10.0.0.9")),
        )
        .mount(&server)
        .await;

    // The pod is already gone by the time we tear down
    Mock::given(method("DELETE"))
        .and(path(format!("{PODS_PATH}/jupyter-carol")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller(cluster_client(&server), "carol");
    controller.start().await.unwrap();

    controller.stop().await.unwrap();
    assert_eq!(controller.state(), LifecycleState::Stopped);
    assert_eq!(controller.endpoint(), None);
}

#[tokio::test]
async fn creation_rejection_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("pods \"jupyter-dave\" is forbidden: exceeded quota"))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller(cluster_client(&server), "dave");
    let err = controller.start().await.unwrap_err();

    match err {
        SpawnError::ClusterRequestFailed { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("exceeded quota"));
        }
        other => panic!("expected ClusterRequestFailed, got {other:?}"),
    }
    assert_eq!(controller.state(), LifecycleState::Failed);
}

#[tokio::test]
async fn polling_retries_through_api_blip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    // The API is briefly unavailable, then recovers with a ready pod
    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("apiserver restarting"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(running_pod_body("jupyter-erin", "10.0.0.7")),
        )
        .mount(&server)
        .await;

    let mut controller = controller(cluster_client(&server), "erin");
    let endpoint = controller.start().await.unwrap();
    assert_eq!(endpoint.ip, "10.0.0.7");
}

#[tokio::test]
async fn failed_pod_phase_terminates_start() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "metadata": { "name": "jupyter-frank" },
                "status": {
                    "phase": "Failed",
                    "conditions": [],
                    "message": "Pod was evicted"
                }
            }]
        })))
        .mount(&server)
        .await;

    let mut controller = controller(cluster_client(&server), "frank");
    let err = controller.start().await.unwrap_err();

    assert!(matches!(err, SpawnError::PodFailed { .. }));
    assert_eq!(controller.state(), LifecycleState::Failed);
}

#[tokio::test]
async fn stop_surfaces_delete_error_but_reaches_stopped() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PODS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PODS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(running_pod_body("jupyter-grace", "10.0.0.8")),
        )
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("{PODS_PATH}/jupyter-grace")))
        .respond_with(ResponseTemplate::new(500).set_body_string("etcd leader changed"))
        .mount(&server)
        .await;

    let mut controller = controller(cluster_client(&server), "grace");
    controller.start().await.unwrap();

    let err = controller.stop().await.unwrap_err();
    assert!(matches!(
        err,
        SpawnError::ClusterRequestFailed { status: 500, .. }
    ));
    // Local teardown is best-effort: state still reaches Stopped
    assert_eq!(controller.state(), LifecycleState::Stopped);

    // And a second stop stays quiet
    controller.stop().await.unwrap();
    assert_eq!(controller.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn poll_surfaces_transport_error_distinctly() {
    // A builder-created server is exclusive (not pooled), so dropping it
    // actually closes the listening socket
    let server = MockServer::builder().start().await;
    let client = cluster_client(&server);
    let controller = controller(client, "heidi");

    // Stop the server so the GET fails at the transport level
    drop(server);

    let err = controller.poll().await.unwrap_err();
    assert!(matches!(err, SpawnError::ClusterUnreachable(_)));
}
