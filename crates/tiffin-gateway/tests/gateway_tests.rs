// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use serde_json::Value;
use tempfile::TempDir;
use tiffin_bus::{ConnectionEvent, EventBus};
use tiffin_core::{ConnectionState, TransportEvent};
use tiffin_gateway::{AuthConfig, GatewayState, router};
use tiffin_test_utils::{InMemorySessionStore, MockConnector, drain_events};
use tiffin_whatsapp::{ConnectionController, ControllerDeps, ControllerSettings};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

struct Fixture {
    state: GatewayState,
    connector: MockConnector,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let connector = MockConnector::new();
    let bus = EventBus::new(1024);
    let settings = ControllerSettings {
        client_id: "admin".into(),
        session_dir: dir.path().to_path_buf(),
        max_attempts: 5,
        retry_delay: Duration::from_secs(10),
        pairing_ttl: Duration::from_secs(300),
        init_timeout: Duration::from_secs(120),
    };
    let deps = ControllerDeps {
        connector: Arc::new(connector.clone()),
        store: Arc::new(InMemorySessionStore::new()),
        bus: bus.clone(),
        inbound: None,
    };
    let (controller, _task) = ConnectionController::spawn(settings, deps, CancellationToken::new());
    Fixture {
        state: GatewayState {
            controller,
            bus,
            auth: AuthConfig {
                bearer_token: Some(TOKEN.into()),
            },
            start_time: std::time::Instant::now(),
        },
        connector,
        _dir: dir,
    }
}

async fn call(state: &GatewayState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn wait_for_state(state: &GatewayState, target: ConnectionState) {
    let mut rx = state.controller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.state == target))
        .await
        .expect("state not reached")
        .unwrap();
}

async fn next_json(socket: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> Value {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

#[tokio::test]
async fn health_and_status() {
    let f = fixture();
    let (status, body) = call(&f.state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&f.state, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disconnected");
    assert_eq!(body["halted"], false);
    assert_eq!(body["pairing_available"], false);
}

#[tokio::test]
async fn admin_load_session_requires_the_token() {
    let f = fixture();

    let (status, _) = call(&f.state, post("/api/admin/load-session", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&f.state, post("/api/admin/load-session", Some("nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(f.connector.connect_count().await, 0);

    let (status, body) = call(&f.state, post("/api/admin/load-session", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["started"], true);
    f.connector.wait_for_connects(1).await;

    // Still initializing: the guard turns the second request away.
    let (status, body) = call(&f.state, post("/api/admin/load-session", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["started"], false);
}

fn logs(events: &[ConnectionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ConnectionEvent::Log { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn start_triggers_are_announced_to_observers() {
    let f = fixture();
    let mut rx = f.state.bus.subscribe();

    let (status, _) = call(&f.state, post("/api/admin/load-session", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(logs(&drain_events(&mut rx)).is_empty());

    let (status, _) = call(&f.state, post("/api/admin/load-session", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let lines = logs(&drain_events(&mut rx));
    assert_eq!(lines[0], "Admin requested session re-initialization.");

    f.connector.wait_for_connects(1).await;
    let (status, _) = call(&f.state, post("/api/public/request-pairing", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let lines = logs(&drain_events(&mut rx));
    assert!(lines.contains(&"Public QR request received. Initializing new session...".to_string()));
}

#[tokio::test]
async fn admin_routes_fail_closed_without_a_token() {
    let mut f = fixture();
    f.state.auth = AuthConfig { bearer_token: None };
    let (status, _) = call(&f.state, post("/api/admin/load-session", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_pairing_is_refused_when_ready() {
    let f = fixture();

    let (status, _) = call(&f.state, post("/api/public/request-pairing", None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    f.connector.wait_for_connects(1).await;
    assert!(f.connector.emit(TransportEvent::Ready).await);
    wait_for_state(&f.state, ConnectionState::Ready).await;

    let (status, body) = call(&f.state, post("/api/public/request-pairing", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "WhatsApp is already connected");
    assert_eq!(f.connector.connect_count().await, 1);
}

#[tokio::test]
async fn websocket_sends_snapshot_then_live_events() {
    let f = fixture();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(f.state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let first = next_json(&mut socket).await;
    assert_eq!(first["type"], "status");
    assert_eq!(first["status"], "disconnected");
    let second = next_json(&mut socket).await;
    assert_eq!(second["type"], "session_info");

    f.state.bus.log("hello dashboard");
    let live = next_json(&mut socket).await;
    assert_eq!(live["type"], "log");
    assert_eq!(live["message"], "hello dashboard");
}
