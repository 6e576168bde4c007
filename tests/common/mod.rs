//! In-process mock push server for integration tests.
//!
//! Accepts WebSocket connections on a random local port, records every
//! client message, optionally answers `{"type":"ping"}` with
//! `{"type":"pong"}`, and lets tests inject server frames or drop the
//! active connection to exercise the reconnect path.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;

enum ServerOp {
    Send(String),
    Close,
}

struct ServerState {
    /// Total connections accepted since startup.
    connections: AtomicUsize,
    /// Every JSON message received from clients, oldest first.
    received: Mutex<Vec<Value>>,
    /// Sender into the currently active connection, if any.
    active: Mutex<Option<mpsc::UnboundedSender<ServerOp>>>,
    /// Request URIs of accepted connections.
    request_uris: Mutex<Vec<String>>,
    /// Answer JSON pings with JSON pongs.
    auto_pong: AtomicBool,
}

pub struct MockPushServer {
    pub addr: SocketAddr,
    state: Arc<ServerState>,
}

impl MockPushServer {
    /// Bind a listener on a random port and start accepting connections.
    pub async fn start() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        let state = Arc::new(ServerState {
            connections: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            active: Mutex::new(None),
            request_uris: Mutex::new(Vec::new()),
            auto_pong: AtomicBool::new(true),
        });

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let conn_state = accept_state.clone();
                tokio::spawn(async move {
                    serve_connection(stream, conn_state).await;
                });
            }
        });

        Self { addr, state }
    }

    /// The ws:// URL clients should connect to.
    pub fn url(&self) -> String {
        format!("ws://{}/ws/jobs", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn set_auto_pong(&self, enabled: bool) {
        self.state.auto_pong.store(enabled, Ordering::SeqCst);
    }

    /// All client messages received so far.
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().unwrap().clone()
    }

    /// Channels of received messages with the given action.
    pub fn channels_with_action(&self, action: &str) -> Vec<String> {
        self.received()
            .iter()
            .filter(|msg| msg.get("action").and_then(Value::as_str) == Some(action))
            .filter_map(|msg| msg.get("channel").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Count of received messages with the given heartbeat type.
    pub fn count_with_type(&self, kind: &str) -> usize {
        self.received()
            .iter()
            .filter(|msg| msg.get("type").and_then(Value::as_str) == Some(kind))
            .count()
    }

    /// Request URIs of accepted connections (for keyword-in-URL assertions).
    pub fn request_uris(&self) -> Vec<String> {
        self.state.request_uris.lock().unwrap().clone()
    }

    /// Send a JSON frame to the currently connected client.
    pub fn send_json(&self, value: Value) {
        let guard = self.state.active.lock().unwrap();
        let tx = guard.as_ref().expect("no active connection");
        tx.send(ServerOp::Send(value.to_string())).expect("send to connection");
    }

    /// Drop the currently connected client, simulating a server-side close.
    pub fn close_current(&self) {
        if let Some(tx) = self.state.active.lock().unwrap().as_ref() {
            let _ = tx.send(ServerOp::Close);
        }
    }

    /// Wait until at least `count` connections have been accepted.
    pub async fn wait_for_connections(&self, count: usize, deadline: Duration) {
        wait_until(deadline, || self.connection_count() >= count, "connections").await;
    }

    /// Wait until a message with the given action names the given channel.
    pub async fn wait_for_channel_action(&self, action: &str, channel: &str, deadline: Duration) {
        let action = action.to_string();
        let channel = channel.to_string();
        wait_until(
            deadline,
            || self.channels_with_action(&action).iter().any(|c| c == &channel),
            "channel action",
        )
        .await;
    }

    /// Wait until at least `count` heartbeat messages of `kind` arrived.
    pub async fn wait_for_type_count(&self, kind: &str, count: usize, deadline: Duration) {
        let kind = kind.to_string();
        wait_until(deadline, || self.count_with_type(&kind) >= count, "heartbeats").await;
    }
}

async fn serve_connection(stream: tokio::net::TcpStream, state: Arc<ServerState>) {
    let mut uri = String::new();
    let callback = |request: &tokio_tungstenite::tungstenite::handshake::server::Request,
                    response: tokio_tungstenite::tungstenite::handshake::server::Response| {
        uri = request.uri().to_string();
        Ok(response)
    };

    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };

    state.connections.fetch_add(1, Ordering::SeqCst);
    state.request_uris.lock().unwrap().push(uri);

    let (op_tx, mut op_rx) = mpsc::unbounded_channel();
    *state.active.lock().unwrap() = Some(op_tx);

    loop {
        tokio::select! {
            op = op_rx.recv() => match op {
                Some(ServerOp::Send(text)) => {
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(ServerOp::Close) | None => {
                    let _ = ws.close(None).await;
                    break;
                }
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let is_ping = value.get("type").and_then(Value::as_str) == Some("ping");
                    state.received.lock().unwrap().push(value);

                    if is_ping && state.auto_pong.load(Ordering::SeqCst) {
                        let pong = serde_json::json!({"type": "pong"}).to_string();
                        if ws.send(Message::Text(pong.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Poll `predicate` until it holds or the deadline passes.
pub async fn wait_until(deadline: Duration, predicate: impl Fn() -> bool, what: &str) {
    let result = tokio::time::timeout(deadline, async {
        loop {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for {}", what);
}
