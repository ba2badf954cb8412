//! In-process mock chat server shared by the integration tests.
//!
//! Serves `POST /login` and `GET /ws?token=` on `127.0.0.1:0`. Tests push
//! raw frames to every connected client, kick clients off, refuse upgrades,
//! and inspect what the client sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};
use url::Url;

use wschat::config::ReconnectConfig;
use wschat::net::{NetConfig, NetEvent};
use wschat_proto::login::LoginRequest;

/// Shared state of the mock server.
pub struct MockState {
    passwords: HashMap<String, String>,
    tokens: Mutex<HashMap<String, String>>,
    next_token: AtomicUsize,
    /// Usernames sent in `online_list` to every new connection.
    pub initial_online: Mutex<Vec<String>>,
    /// Every token presented to `/ws`, accepted or not.
    pub ws_tokens: Mutex<Vec<String>>,
    /// Frames received from clients, parsed as JSON.
    pub received: Mutex<Vec<Value>>,
    /// Upgrades that were accepted.
    pub accepted: AtomicUsize,
    /// Refuse every upgrade with 401 while set.
    pub reject_ws: AtomicBool,
    frames: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
}

impl MockState {
    /// Issue a token for `user` without going through `/login`.
    pub fn issue_token(&self, user: &str) -> String {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("t{n}");
        self.tokens.lock().insert(token.clone(), user.to_string());
        token
    }

    fn user_for(&self, token: &str) -> Option<String> {
        self.tokens.lock().get(token).cloned()
    }
}

/// A running mock server.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Start a server that knows `alice`/`pw` and `bob`/`pw2`.
    pub async fn start() -> Self {
        let (frames, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);
        let state = Arc::new(MockState {
            passwords: HashMap::from([
                ("alice".to_string(), "pw".to_string()),
                ("bob".to_string(), "pw2".to_string()),
            ]),
            tokens: Mutex::new(HashMap::new()),
            next_token: AtomicUsize::new(0),
            initial_online: Mutex::new(Vec::new()),
            ws_tokens: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
            reject_ws: AtomicBool::new(false),
            frames,
            kick,
        });

        let app = Router::new()
            .route("/login", axum::routing::post(login_handler))
            .route("/ws", axum::routing::get(ws_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL for the client (`http://127.0.0.1:<port>/`).
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    /// Session config with short reconnect delays.
    pub fn net_config(&self, floor_ms: u64, ceiling_ms: u64) -> NetConfig {
        NetConfig {
            server_url: self.base_url(),
            connect_timeout: Duration::from_secs(2),
            channel_capacity: 64,
            reconnect: ReconnectConfig {
                floor: Duration::from_millis(floor_ms),
                ceiling: Duration::from_millis(ceiling_ms),
            },
        }
    }

    /// Send a raw text frame to every connected client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.state.frames.send(frame.into());
    }

    /// Send an inbound event built from `kind` and `data`.
    pub fn push_event(&self, kind: &str, data: Value) {
        self.push(json!({ "type": kind, "data": data }).to_string());
    }

    /// Close every open connection from the server side.
    pub fn kick_all(&self) {
        let _ = self.state.kick.send(());
    }

    /// Wait until the server has received `count` frames from clients.
    pub async fn wait_for_received(&self, count: usize) -> Vec<Value> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let received = self.state.received.lock();
                    if received.len() >= count {
                        return received.clone();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for client frames")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn login_handler(
    State(state): State<Arc<MockState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    if req.username == "flood" {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limited" })),
        )
            .into_response();
    }
    if state.passwords.get(&req.username) != Some(&req.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_credentials" })),
        )
            .into_response();
    }
    let token = state.issue_token(&req.username);
    Json(json!({ "token": token, "expires_in": 1800 })).into_response()
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<Arc<MockState>>,
) -> Response {
    let token = query.get("token").cloned().unwrap_or_default();
    state.ws_tokens.lock().push(token.clone());

    if state.reject_ws.load(Ordering::SeqCst) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let Some(user) = state.user_for(&token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // Subscribe before the upgrade so no pushed frame is missed.
    let frames = state.frames.subscribe();
    let kick = state.kick.subscribe();
    state.accepted.fetch_add(1, Ordering::SeqCst);
    ws.on_upgrade(move |socket| handle_socket(socket, user, state, frames, kick))
}

async fn handle_socket(
    mut socket: WebSocket,
    user: String,
    state: Arc<MockState>,
    mut frames: broadcast::Receiver<String>,
    mut kick: broadcast::Receiver<()>,
) {
    let mut online = state.initial_online.lock().clone();
    if !online.contains(&user) {
        online.push(user);
    }
    let snapshot = json!({ "type": "online_list", "data": { "users": online } }).to_string();
    if socket.send(Message::Text(snapshot.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                        state.received.lock().push(value);
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            frame = frames.recv() => {
                if let Ok(text) = frame
                    && socket.send(Message::Text(text.into())).await.is_err()
                {
                    break;
                }
            }
            _ = kick.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

/// Wait for the first event matching `pred`, discarding others.
pub async fn wait_for_event<F>(rx: &mut mpsc::Receiver<NetEvent>, mut pred: F) -> NetEvent
where
    F: FnMut(&NetEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Collect every event that arrives within `window`.
pub async fn collect_for(rx: &mut mpsc::Receiver<NetEvent>, window: Duration) -> Vec<NetEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        events.push(event);
    }
    events
}
