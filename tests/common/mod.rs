//! Shared harness: an in-process mock Home Assistant and a gateway bound
//! to ephemeral ports.

#![allow(clippy::panic, dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use mmwave_gateway::app::build_app;
use mmwave_gateway::app_state::AppState;
use mmwave_gateway::config::{RelayConfig, UpstreamTarget};
use mmwave_gateway::upstream::HomeAssistantClient;

/// Credential the mock accepts.
pub const TOKEN: &str = "test-token";

/// Upper bound for any single wait in the tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Browser-side socket.
pub type Browser = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Instruction for the mock event bus.
#[derive(Debug)]
pub enum MockFrame {
    /// Send a text frame to the gateway.
    Text(String),
    /// Close the socket with this code.
    Close(u16),
}

/// One REST call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Request path, e.g. `/api/services/switch/turn_on`.
    pub path: String,
    /// JSON body, or `Null`.
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    reject_auth: bool,
    channels: Arc<Mutex<Option<(mpsc::UnboundedReceiver<MockFrame>, mpsc::UnboundedSender<String>)>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// Fake Home Assistant serving `/api/websocket` and a few REST routes.
#[derive(Debug)]
pub struct MockUpstream {
    /// Bound address.
    pub addr: SocketAddr,
    script: mpsc::UnboundedSender<MockFrame>,
    seen: mpsc::UnboundedReceiver<String>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockUpstream {
    /// Starts a mock that accepts [`TOKEN`].
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Starts a mock that answers every auth attempt with `auth_invalid`.
    pub async fn start_rejecting() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(reject_auth: bool) -> Self {
        let (script, script_rx) = mpsc::unbounded_channel();
        let (seen_tx, seen) = mpsc::unbounded_channel();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reject_auth,
            channels: Arc::new(Mutex::new(Some((script_rx, seen_tx)))),
            calls: Arc::clone(&calls),
        };

        let app = Router::new()
            .route("/api/websocket", get(mock_ws))
            .route("/api/", get(mock_root))
            .route("/api/template", post(mock_template))
            .route("/api/states/{entity_id}", get(mock_state))
            .route("/api/services/{domain}/{service}", post(mock_service))
            .with_state(state);

        let addr = serve(app).await;
        Self {
            addr,
            script,
            seen,
            calls,
        }
    }

    /// Queues a text frame for the gateway.
    pub fn send(&self, value: &Value) {
        self.send_raw(value.to_string());
    }

    /// Queues a raw text frame for the gateway.
    pub fn send_raw(&self, text: impl Into<String>) {
        if self.script.send(MockFrame::Text(text.into())).is_err() {
            panic!("mock session is gone");
        }
    }

    /// Closes the event-bus socket with `code`.
    pub fn close(&self, code: u16) {
        let _ = self.script.send(MockFrame::Close(code));
    }

    /// Next frame the gateway sent upstream.
    pub async fn next_from_gateway(&mut self) -> String {
        let Ok(Some(text)) = tokio::time::timeout(WAIT, self.seen.recv()).await else {
            panic!("no frame from gateway");
        };
        text
    }

    /// Next frame the gateway sent upstream, parsed.
    pub async fn next_json_from_gateway(&mut self) -> Value {
        let text = self.next_from_gateway().await;
        let Ok(value) = serde_json::from_str(&text) else {
            panic!("gateway sent non-json: {text}");
        };
        value
    }

    /// Whether the mock session has ended.
    pub fn script_closed(&self) -> bool {
        self.script.is_closed()
    }

    /// REST calls received so far.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

async fn mock_ws(ws: WebSocketUpgrade, State(state): State<MockState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| mock_session(socket, state))
}

async fn mock_session(mut socket: WebSocket, state: MockState) {
    let Some((mut script, seen)) = state.channels.lock().await.take() else {
        return;
    };

    let hello = json!({ "type": "auth_required", "ha_version": "2024.6.0" });
    if socket.send(Message::text(hello.to_string())).await.is_err() {
        return;
    }

    let Some(Ok(Message::Text(auth))) = socket.recv().await else {
        return;
    };
    let _ = seen.send(auth.as_str().to_owned());

    let token_ok = serde_json::from_str::<Value>(auth.as_str())
        .ok()
        .and_then(|v| v.get("access_token").and_then(Value::as_str).map(|t| t == TOKEN))
        .unwrap_or(false);
    if state.reject_auth || !token_ok {
        let reply = json!({ "type": "auth_invalid", "message": "Invalid access token or password" });
        let _ = socket.send(Message::text(reply.to_string())).await;
        return;
    }
    let reply = json!({ "type": "auth_ok", "ha_version": "2024.6.0" });
    if socket.send(Message::text(reply.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = script.recv() => match frame {
                Some(MockFrame::Text(text)) => {
                    if socket.send(Message::text(text)).await.is_err() {
                        return;
                    }
                }
                Some(MockFrame::Close(code)) => {
                    let frame = CloseFrame { code, reason: Utf8Bytes::from_static("mock closing") };
                    let _ = socket.send(Message::Close(Some(frame))).await;
                    // Record anything the gateway still writes after the close.
                    while let Some(Ok(msg)) = socket.recv().await {
                        if let Message::Text(text) = msg {
                            let _ = seen.send(text.as_str().to_owned());
                        }
                    }
                    return;
                }
                None => return,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = seen.send(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

async fn mock_root(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "message": "API running." })).into_response()
}

async fn mock_template(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.calls.lock().await.push(RecordedCall {
        path: "/api/template".to_string(),
        body: body.clone(),
    });
    let template = body.get("template").and_then(Value::as_str).unwrap_or_default();
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("rendered:{template}"),
    )
        .into_response()
}

async fn mock_state(headers: HeaderMap, Path(entity_id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if entity_id == "sensor.office_target_1_x" {
        Json(json!({ "entity_id": entity_id, "state": "120", "attributes": {} })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "Entity not found." }))).into_response()
    }
}

async fn mock_service(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((domain, service)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.calls.lock().await.push(RecordedCall {
        path: format!("/api/services/{domain}/{service}"),
        body,
    });
    Json(json!([])).into_response()
}

async fn serve(app: Router) -> SocketAddr {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Running gateway under test.
#[derive(Debug)]
pub struct Gateway {
    /// Bound address.
    pub addr: SocketAddr,
    /// State shared with the running server.
    pub state: AppState,
}

impl Gateway {
    /// Starts a gateway pointed at `upstream`.
    pub async fn start(upstream: SocketAddr) -> Self {
        let Ok(target) = UpstreamTarget::external(&format!("http://{upstream}"), TOKEN) else {
            panic!("valid upstream url");
        };
        let Ok(client) = HomeAssistantClient::new(target, Duration::from_secs(2)) else {
            panic!("client builds");
        };
        let relay = RelayConfig {
            channel_capacity: 16,
            connect_timeout: Duration::from_secs(2),
            auth_timeout: Duration::from_secs(2),
        };
        let state = AppState::new(client, relay);
        let addr = serve(build_app(state.clone())).await;
        Self { addr, state }
    }

    /// `http://<addr><path>`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Opens a browser-side WebSocket to `/ws`.
    pub async fn connect_browser(&self) -> Browser {
        let url = format!("ws://{}/ws", self.addr);
        let Ok((socket, _)) = tokio_tungstenite::connect_async(url).await else {
            panic!("browser could not connect");
        };
        socket
    }
}

/// Address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    drop(listener);
    addr
}

/// Next text frame delivered to the browser.
pub async fn recv_text(browser: &mut Browser) -> String {
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    loop {
        let Ok(frame) = tokio::time::timeout(WAIT, browser.next()).await else {
            panic!("browser timed out waiting for a frame");
        };
        match frame {
            Some(Ok(WsMessage::Text(text))) => return text.to_string(),
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Next text frame delivered to the browser, parsed.
pub async fn recv_json(browser: &mut Browser) -> Value {
    let text = recv_text(browser).await;
    let Ok(value) = serde_json::from_str(&text) else {
        panic!("browser got non-json: {text}");
    };
    value
}

/// Waits for the gateway to close the browser socket; returns the close
/// code if one was sent. Panics if a text frame arrives first.
pub async fn expect_closed(browser: &mut Browser) -> Option<u16> {
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    loop {
        let Ok(frame) = tokio::time::timeout(WAIT, browser.next()).await else {
            panic!("browser socket was not closed");
        };
        match frame {
            Some(Ok(WsMessage::Close(frame))) => return frame.map(|f| u16::from(f.code)),
            Some(Ok(WsMessage::Text(text))) => panic!("unexpected frame after close: {text}"),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}
