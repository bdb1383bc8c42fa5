//! Route-level tests for the relay HTTP API.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use tandem_api::{API_KEY_HEADER, BrokerAdapter, HttpApi};
use tandem_core::prelude::*;
use tandem_model::{Job, PROP_SENDER_IDENTITY};
use tandem_transport::{MemoryQueue, MemoryRegistry};

const KEY: &str = "test-key";

struct TestApp {
    router: Router,
    devices: Arc<MemoryRegistry>,
    hub: Arc<FanoutHub>,
    jobs: Arc<MemoryQueue>,
}

fn app() -> TestApp {
    let devices = Arc::new(MemoryRegistry::new());
    let hub = Arc::new(FanoutHub::new("jobs"));
    let jobs = Arc::new(MemoryQueue::new("jobs"));
    let settings = BrokerSettings {
        api_key: ApiKey::new(KEY),
        device_hostname: "devices.test".into(),
        pubsub_hostname: "pubsub.test".into(),
        hub_name: "jobs".into(),
        token_ttl: Duration::from_secs(60),
    };
    let broker = Arc::new(IdentityBroker::new(devices.clone(), hub.clone(), settings));
    let adapter = Arc::new(BrokerAdapter::new(broker, jobs.clone()));

    TestApp {
        router: HttpApi::new(adapter).router(),
        devices,
        hub,
        jobs,
    }
}

fn request(method: Method, uri: &str, key: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(body).unwrap()
}

async fn get(router: Router, uri: &str, key: Option<&str>) -> Response<Body> {
    router
        .oneshot(request(Method::GET, uri, key, Body::empty()))
        .await
        .unwrap()
}

async fn post(router: Router, uri: &str, key: Option<&str>, body: &str) -> Response<Body> {
    router
        .oneshot(request(Method::POST, uri, key, Body::from(body.to_string())))
        .await
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Test: GET / greets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_says_hello() {
    let response = get(app().router, "/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Hello");
}

// ---------------------------------------------------------------------------
// Test: device negotiation issues a descriptor and is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn negotiate_device_is_idempotent() {
    let app = app();

    let first = get(app.router.clone(), "/negotiate/scheduler::job-1", Some(KEY)).await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    let url = first["url"].as_str().unwrap();
    assert!(url.starts_with("HostName=devices.test;DeviceId=scheduler::job-1;SharedAccessKey="));

    let second = body_json(get(app.router, "/negotiate/scheduler::job-1", Some(KEY)).await).await;
    assert_eq!(second["url"], first["url"]);
    assert_eq!(app.devices.len(), 1);
}

// ---------------------------------------------------------------------------
// Test: missing or wrong key is rejected before any side effect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_key_is_unauthorized() {
    let app = app();

    let missing = get(app.router.clone(), "/negotiate/solver::job-1", None).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = get(app.router, "/negotiate/solver::job-1", Some("nope")).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong).await["error"], "UNAUTHORIZED");
    assert!(app.devices.is_empty());
}

#[tokio::test]
async fn blank_identity_is_bad_request() {
    let response = get(app().router, "/negotiate/%20", Some(KEY)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registry_outage_is_service_unavailable() {
    let app = app();
    app.devices.set_available(false);

    let response = get(app.router, "/negotiate/solver::job-1", Some(KEY)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// Test: group negotiation grants membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn negotiate_group_returns_hub_url() {
    let app = app();

    let response = get(app.router, "/negotiate/scheduler::job-2/job-2", Some(KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let url = body_json(response).await["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("wss://pubsub.test/client/hubs/jobs?access_token="));
    assert!(app.hub.is_member("scheduler::job-2", "job-2"));
}

// ---------------------------------------------------------------------------
// Test: deregistration is accepted whether or not the identity exists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deregister_accepts_unknown_and_known_identities() {
    let app = app();

    let unknown = get(app.router.clone(), "/deregister/solver::nobody", Some(KEY)).await;
    assert_eq!(unknown.status(), StatusCode::ACCEPTED);

    get(app.router.clone(), "/negotiate/solver::job-3", Some(KEY)).await;
    assert!(app.devices.contains("solver::job-3"));

    let known = get(app.router, "/deregister/solver::job-3", Some(KEY)).await;
    assert_eq!(known.status(), StatusCode::ACCEPTED);
    assert!(!app.devices.contains("solver::job-3"));
}

// ---------------------------------------------------------------------------
// Test: job submission publishes onto the job topic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_job_publishes_and_echoes() {
    let app = app();
    let body = r#"{"name":"render","correlationId":"job-4","steps":["A","B"]}"#;

    let response = post(app.router, "/jobs", Some(KEY), body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let echoed = body_json(response).await;
    assert_eq!(echoed["correlationId"], "job-4");

    let msg = app.jobs.receive().await.unwrap().unwrap();
    let job = Job::from_slice(&msg.envelope.payload).unwrap();
    assert_eq!(job.steps, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(
        msg.envelope.properties.get(PROP_SENDER_IDENTITY),
        Some("scheduler::job-4")
    );
}

#[tokio::test]
async fn submit_invalid_job_is_bad_request() {
    let app = app();

    let response = post(app.router.clone(), "/jobs", Some(KEY), r#"{"name":"render"}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post(app.router, "/jobs", None, "not json").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.jobs.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Test: broadcast reaches every hub connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_live_connections() {
    let app = app();
    let mut a = app.hub.connect_user("a");
    let mut b = app.hub.connect_user("b");

    let response = post(app.router, "/broadcast", Some(KEY), "maintenance").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["delivered"], 2);

    for conn in [&mut a, &mut b] {
        match conn.try_recv() {
            Some(HubEvent::Broadcast { payload }) => assert_eq!(payload, b"maintenance"),
            other => panic!("expected broadcast, got {other:?}"),
        }
    }
}
