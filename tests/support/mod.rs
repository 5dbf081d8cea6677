// Shared primitives for one-time server bootstrapping across integration
// tests: a stub auth service plus the arena server, both on ephemeral ports.

use arena_server::domain::tuning::GameTuning;
use arena_server::interface_adapters::clients::auth::AuthClient;
use arena_server::use_cases::{RoomRegistry, RoomSettings};
use arena_server::AppState;

use axum::{Json, http::StatusCode, response::IntoResponse, routing::post};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio_tungstenite::tungstenite::Message;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Deletion paths must be observable within a test, so the grace window is
// much shorter than the production default.
pub const FINISHED_GRACE: Duration = Duration::from_millis(400);

// Stub for the external auth service: accepts "guest-<id>" tokens and hands
// back the numeric identity, mirroring the real verify endpoint's shapes.
async fn verify_token_stub(Json(request): Json<Value>) -> impl IntoResponse {
    let token = request
        .get("token")
        .and_then(|t| t.as_str())
        .unwrap_or_default();

    match token
        .strip_prefix("guest-")
        .and_then(|id| id.parse::<u64>().ok())
    {
        Some(user_id) => (
            StatusCode::OK,
            Json(json!({ "user_id": user_id, "expires_at": 4_102_444_800u64 })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid token" })),
        )
            .into_response(),
    }
}

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);

        // An OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Stub auth service first; the arena server only needs its URL.
                let auth_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind auth stub port");
                let auth_addr = auth_listener.local_addr().expect("auth stub addr");
                tokio::spawn(async move {
                    let app =
                        axum::Router::new().route("/auth/verify-token", post(verify_token_stub));
                    let _ = axum::serve(auth_listener, app).await;
                });

                let auth_client = AuthClient::new(
                    format!("http://{auth_addr}"),
                    Duration::from_millis(1500),
                )
                .expect("auth client");

                let registry = Arc::new(RoomRegistry::new(RoomSettings {
                    command_channel_capacity: 256,
                    tick_interval: Duration::from_millis(50),
                    finished_grace: FINISHED_GRACE,
                    tuning: GameTuning::default(),
                }));

                let state = Arc::new(AppState {
                    registry,
                    auth_client: Arc::new(auth_client),
                });

                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));

                arena_server::run(listener, state).await.expect("server failed");
            });
        });

        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and for the socket to start accepting connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

pub type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub async fn connect(base_url: &str) -> WsClient {
    let host = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    let (socket, _response) = tokio_tungstenite::connect_async(format!("ws://{host}/ws"))
        .await
        .expect("ws connect");
    socket
}

pub async fn send(socket: &mut WsClient, value: Value) {
    socket
        .send(Message::Text(value.to_string()))
        .await
        .expect("ws send");
}

/// Reads messages until one with the given event tag arrives, returning its
/// data payload. Everything else (tick traffic mostly) is skipped.
pub async fn recv_event(socket: &mut WsClient, event: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = socket
                .next()
                .await
                .expect("socket should stay open")
                .expect("ws recv");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(&text).expect("valid server json");
                if value.get("event").and_then(|e| e.as_str()) == Some(event) {
                    return value.get("data").cloned().unwrap_or(Value::Null);
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for `{event}`"))
}

/// Like `recv_event`, but keeps reading until the payload satisfies the
/// predicate. Bounded so a wrong expectation fails instead of hanging.
pub async fn recv_event_matching(
    socket: &mut WsClient,
    event: &str,
    predicate: impl Fn(&Value) -> bool,
) -> Value {
    for _ in 0..200 {
        let data = recv_event(socket, event).await;
        if predicate(&data) {
            return data;
        }
    }
    panic!("no `{event}` message matched the predicate");
}

pub async fn authenticate(socket: &mut WsClient, id: u64) {
    send(
        socket,
        json!({ "event": "authenticate", "data": { "token": format!("guest-{id}") } }),
    )
    .await;
    let data = recv_event(socket, "authenticateResult").await;
    assert_eq!(data["ok"], json!(true));
    assert_eq!(data["playerId"], json!(id));
}

pub async fn join(socket: &mut WsClient, room_id: &str) -> Value {
    send(socket, json!({ "event": "join", "data": { "roomId": room_id } })).await;
    recv_event(socket, "joined").await
}

pub fn unique_room() -> String {
    format!("room-{}", uuid::Uuid::new_v4())
}
