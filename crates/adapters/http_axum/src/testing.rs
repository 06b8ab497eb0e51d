//! Router harness over a simulated account.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use tower::ServiceExt;

use hvacq_adapter_virtual::{VirtualConfig, VirtualHome};
use hvacq_app::event_bus::InProcessEventBus;
use hvacq_app::settings::BridgeSettings;

use crate::state::{AppState, HttpBridge};

pub const DAILY_LIMIT: u32 = 50;

pub type TestBridge = HttpBridge<Arc<VirtualHome>, Arc<VirtualHome>>;

pub struct Harness {
    pub app: Router,
    pub bridge: Arc<TestBridge>,
    pub home: Arc<VirtualHome>,
    pub bus: Arc<InProcessEventBus>,
}

/// A router over an unstarted bridge: nothing polls unless a test asks.
pub fn harness() -> Harness {
    let home = Arc::new(VirtualHome::new(&VirtualConfig {
        daily_limit: DAILY_LIMIT,
        latency_ms: 0,
        ..VirtualConfig::default()
    }));
    let bus = Arc::new(InProcessEventBus::new(64));
    let bridge = Arc::new(
        TestBridge::new(
            home.home(),
            Arc::clone(&home),
            Arc::clone(&home),
            Arc::clone(&bus),
            BridgeSettings::default(),
        )
        .unwrap(),
    );
    let app = crate::router::build(AppState::new(Arc::clone(&bridge), Arc::clone(&bus)));
    Harness {
        app,
        bridge,
        home,
        bus,
    }
}

pub fn test_app() -> (Router, Arc<TestBridge>) {
    let Harness { app, bridge, .. } = harness();
    (app, bridge)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn json(bytes: &[u8]) -> serde_json::Value {
    if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap()
    }
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, request).await;
    (status, json(&bytes))
}

pub async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, request).await;
    (status, String::from_utf8(bytes).unwrap())
}

pub async fn put(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, json(&bytes))
}

pub async fn post(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, json(&bytes))
}
