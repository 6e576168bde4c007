//! Shared push connection for real-time job updates.
//!
//! Provides a single WebSocket connection multiplexed across every
//! keyword topic. Handles:
//!
//! - One physical connection for all topics (no per-topic sockets)
//! - Message routing to the correct topic by `channel`
//! - Reference-counted topic subscriptions; the socket is torn down only
//!   when the last subscriber is gone
//! - Application-level heartbeat (`{"type":"ping"}` / `{"type":"pong"}`)
//!   with a liveness window that forces a reconnect on silence
//! - Automatic reconnection with a linear, capped backoff
//! - Re-subscription of all topics after reconnect (skipped in URL-override
//!   mode, where the URL itself encodes the topic)
//! - Connection lifecycle events (`on_connect`, `on_disconnect`, `on_error`)

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::connection::{
    parse_inbound, resolve_ws_url, send_client_message, Inbound, WsStream,
    COMMAND_CHANNEL_CAPACITY, EVENT_CHANNEL_CAPACITY,
};
use crate::error::{Result, SkillSyncError};
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::models::{ClientMessage, ConnectionState, JobsUpdatedEvent};
use crate::timeouts::SkillSyncTimeouts;

/// A duration far enough in the future (~100 years) to act as "never" for
/// deadline calculations without overflowing `Instant::now() + dur`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Opaque handle identifying one registered topic subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Per-topic subscriber registry. Each subscriber owns the receiving half of
/// its event channel; the sender halves live here.
type TopicRegistry = HashMap<String, Vec<(SubscriberId, mpsc::Sender<JobsUpdatedEvent>)>>;

// ── Commands ────────────────────────────────────────────────────────────────

/// Commands sent from the public API to the background connection task.
enum ConnCmd {
    /// Register a subscriber for a topic, connecting if necessary.
    Subscribe {
        topic: String,
        subscriber: SubscriberId,
        event_tx: mpsc::Sender<JobsUpdatedEvent>,
        result_tx: oneshot::Sender<Result<()>>,
    },
    /// Remove one subscriber. Unknown pairs are ignored, so redundant
    /// unsubscribes are safe.
    Unsubscribe {
        topic: String,
        subscriber: SubscriberId,
    },
    /// Switch to a keyword-scoped connection URL. Takes effect on the next
    /// (re)connect; an already-open socket is left untouched.
    ConnectOverride { url: String },
    /// Gracefully shut down the connection task.
    Shutdown,
}

// ── SharedConnection (public handle) ────────────────────────────────────────

/// The single shared push connection, multiplexing all topic subscribers.
///
/// Owned by the client and injected into subscriptions; tests can spawn
/// isolated instances against local mock servers. Subscribe/unsubscribe
/// calls send commands to a background task that owns the socket.
pub struct SharedConnection {
    /// Channel to the background connection task.
    cmd_tx: mpsc::Sender<ConnCmd>,
    /// Fire-and-forget unsubscribe channel used by subscription `Drop` impls.
    unsub_tx: mpsc::Sender<(String, SubscriberId)>,
    /// Broadcast of the connection state, written only by the task.
    state_rx: watch::Receiver<ConnectionState>,
    /// Source of unique subscriber ids.
    next_subscriber: AtomicU64,
    /// Background task handle.
    _task: JoinHandle<()>,
    /// Bridge task: forwards unsub_rx pairs as `ConnCmd::Unsubscribe`.
    _unsub_bridge: JoinHandle<()>,
}

impl SharedConnection {
    /// Spawn the background connection task.
    ///
    /// No transport is established until the first subscriber arrives; the
    /// task idles on its command channel, reporting `Disconnected`.
    pub(crate) fn spawn(
        base_url: String,
        timeouts: SkillSyncTimeouts,
        options: crate::models::ConnectionOptions,
        event_handlers: EventHandlers,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ConnCmd>(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let task = tokio::spawn(async move {
            connection_task(cmd_rx, base_url, timeouts, options, event_handlers, state_tx).await;
        });

        let (unsub_tx, mut unsub_rx) =
            mpsc::channel::<(String, SubscriberId)>(COMMAND_CHANNEL_CAPACITY);
        let cmd_tx_bridge = cmd_tx.clone();
        let unsub_bridge = tokio::spawn(async move {
            while let Some((topic, subscriber)) = unsub_rx.recv().await {
                let _ = cmd_tx_bridge
                    .send(ConnCmd::Unsubscribe { topic, subscriber })
                    .await;
            }
        });

        Self {
            cmd_tx,
            unsub_tx,
            state_rx,
            next_subscriber: AtomicU64::new(1),
            _task: task,
            _unsub_bridge: unsub_bridge,
        }
    }

    /// Register a subscriber for `topic` and return its event receiver.
    ///
    /// The first subscriber triggers the connection; a fresh topic on an
    /// already-open socket sends a subscribe control message. An empty topic
    /// is a no-op: the returned receiver yields nothing and the id never
    /// reaches the registry.
    pub async fn subscribe(
        &self,
        topic: impl Into<String>,
    ) -> Result<(SubscriberId, mpsc::Receiver<JobsUpdatedEvent>)> {
        let topic = topic.into().trim().to_string();
        let subscriber = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));

        if topic.is_empty() {
            let (_event_tx, event_rx) = mpsc::channel(1);
            return Ok((subscriber, event_rx));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (result_tx, result_rx) = oneshot::channel();

        self.cmd_tx
            .send(ConnCmd::Subscribe {
                topic,
                subscriber,
                event_tx,
                result_tx,
            })
            .await
            .map_err(|_| {
                SkillSyncError::WebSocket("Connection task is not running".to_string())
            })?;

        result_rx.await.map_err(|_| {
            SkillSyncError::WebSocket("Connection task died before confirming subscribe".to_string())
        })??;

        Ok((subscriber, event_rx))
    }

    /// Remove one subscriber.
    ///
    /// Safe to call redundantly: unknown topics or already-removed
    /// subscribers are silently ignored. The last subscriber of a topic
    /// sends an unsubscribe control message; the last subscriber overall
    /// tears the socket down.
    pub async fn unsubscribe(&self, topic: &str, subscriber: SubscriberId) {
        let _ = self
            .cmd_tx
            .send(ConnCmd::Unsubscribe {
                topic: topic.to_string(),
                subscriber,
            })
            .await;
    }

    /// Switch to a keyword-scoped connection URL (URL-override mode).
    ///
    /// While in override mode no subscribe/unsubscribe control messages are
    /// sent and automatic resubscription after reconnect is skipped.
    pub async fn connect_override(&self, url: impl Into<String>) -> Result<()> {
        self.cmd_tx
            .send(ConnCmd::ConnectOverride { url: url.into() })
            .await
            .map_err(|_| SkillSyncError::WebSocket("Connection task is not running".to_string()))
    }

    /// Subscribe to connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// The current connection state.
    pub fn current_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether the socket is currently open and heartbeat-alive.
    pub fn is_connected(&self) -> bool {
        self.current_state() == ConnectionState::Connected
    }

    /// Gracefully disconnect and shut down the background task.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ConnCmd::Shutdown).await;
    }

    /// Clone the fire-and-forget unsubscribe sender for subscription `Drop`
    /// impls, which cannot await.
    pub(crate) fn unsubscribe_tx(&self) -> mpsc::Sender<(String, SubscriberId)> {
        self.unsub_tx.clone()
    }
}

impl Drop for SharedConnection {
    fn drop(&mut self) {
        // Best-effort shutdown signal.
        let _ = self.cmd_tx.try_send(ConnCmd::Shutdown);
    }
}

// ── Registry helpers ────────────────────────────────────────────────────────

/// Add a subscriber; returns true when this creates the topic.
fn register_subscriber(
    topics: &mut TopicRegistry,
    topic: String,
    subscriber: SubscriberId,
    event_tx: mpsc::Sender<JobsUpdatedEvent>,
) -> bool {
    let fresh = !topics.contains_key(&topic);
    topics.entry(topic).or_default().push((subscriber, event_tx));
    fresh
}

/// Remove a subscriber; returns true when this removed the topic entirely.
/// Unknown pairs are a no-op.
fn remove_subscriber(topics: &mut TopicRegistry, topic: &str, subscriber: SubscriberId) -> bool {
    let Some(handlers) = topics.get_mut(topic) else {
        return false;
    };
    handlers.retain(|(id, _)| *id != subscriber);
    if handlers.is_empty() {
        topics.remove(topic);
        true
    } else {
        false
    }
}

/// Route an event to its channel's subscribers, or to everyone when the
/// message carries no channel.
fn dispatch_event(topics: &TopicRegistry, channel: Option<&str>, event: &JobsUpdatedEvent) {
    let forward = |subscriber: &SubscriberId, tx: &mpsc::Sender<JobsUpdatedEvent>| {
        match tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "[skillsync-link] Subscriber {:?} event queue full, dropping event",
                    subscriber
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("[skillsync-link] Subscriber {:?} receiver dropped", subscriber);
            }
        }
    };

    match channel {
        Some(ch) => match topics.get(ch) {
            Some(handlers) => {
                debug!("[skillsync-link] Event for channel {}", ch);
                for (subscriber, tx) in handlers {
                    forward(subscriber, tx);
                }
            }
            None => debug!("[skillsync-link] No subscribers for channel {}", ch),
        },
        None => {
            for handlers in topics.values() {
                for (subscriber, tx) in handlers {
                    forward(subscriber, tx);
                }
            }
        }
    }
}

fn set_state(state_tx: &watch::Sender<ConnectionState>, state: ConnectionState) {
    if *state_tx.borrow() != state {
        debug!("[skillsync-link] Connection state -> {}", state);
        let _ = state_tx.send_replace(state);
    }
}

// ── Background connection task ──────────────────────────────────────────────

/// Establish the WebSocket transport within the connect timeout.
async fn establish(url: &str, timeouts: &SkillSyncTimeouts) -> Result<WsStream> {
    debug!("[skillsync-link] Connecting to {}", url);

    let connect = tokio_tungstenite::connect_async(url);
    let result = if !SkillSyncTimeouts::is_no_timeout(timeouts.connect_timeout) {
        tokio::time::timeout(timeouts.connect_timeout, connect).await
    } else {
        Ok(connect.await)
    };

    match result {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(SkillSyncError::WebSocket(format!("Connection failed: {}", e))),
        Err(_) => Err(SkillSyncError::Timeout(format!(
            "Connection timeout ({:?})",
            timeouts.connect_timeout
        ))),
    }
}

/// Re-send subscribe control messages for every registered topic after a
/// reconnect. Not called in URL-override mode.
async fn resubscribe_all(ws: &mut WsStream, topics: &TopicRegistry) {
    info!(
        "[skillsync-link] Re-subscribing {} channel(s) after reconnect",
        topics.len()
    );
    for topic in topics.keys() {
        if let Err(e) = send_client_message(ws, &ClientMessage::subscribe(topic.clone())).await {
            warn!("[skillsync-link] Failed to re-subscribe {}: {}", topic, e);
        }
    }
}

/// The main background task owning the shared socket.
///
/// Lifecycle:
/// 1. Idle until the first subscriber registers
/// 2. Connect, then multiplex socket frames, commands and the heartbeat
/// 3. On loss: linear capped backoff while subscribers remain
/// 4. On reconnect: re-subscribe every topic (unless the URL encodes it)
/// 5. Tear down when the last subscriber leaves or on shutdown
async fn connection_task(
    mut cmd_rx: mpsc::Receiver<ConnCmd>,
    base_url: String,
    timeouts: SkillSyncTimeouts,
    options: crate::models::ConnectionOptions,
    event_handlers: EventHandlers,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut topics: TopicRegistry = HashMap::new();
    let mut ws: Option<WsStream> = None;
    let mut url_override: Option<String> = None;
    let mut shutdown_requested = false;
    // Consecutive failed connection attempts; reset on successful open.
    let mut attempts: u32 = 0;

    let has_heartbeat = !timeouts.heartbeat_interval.is_zero();
    let heartbeat = if has_heartbeat {
        timeouts.heartbeat_interval
    } else {
        FAR_FUTURE
    };
    let has_liveness = has_heartbeat && !timeouts.pong_timeout.is_zero();
    let mut ping_deadline = TokioInstant::now() + heartbeat;
    let mut last_pong = TokioInstant::now();

    loop {
        if shutdown_requested {
            if let Some(mut stream) = ws.take() {
                if url_override.is_none() {
                    for topic in topics.keys() {
                        let _ =
                            send_client_message(&mut stream, &ClientMessage::unsubscribe(topic.clone()))
                                .await;
                    }
                }
                let _ = stream.close(None).await;
                event_handlers.emit_disconnect(DisconnectReason::new("Client shutdown"));
            }
            set_state(&state_tx, ConnectionState::Disconnected);
            return;
        }

        if let Some(stream) = ws.as_mut() {
            // Connected: multiplex commands, socket frames and the heartbeat.
            let ping_sleep = tokio::time::sleep_until(ping_deadline);
            tokio::pin!(ping_sleep);

            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ConnCmd::Subscribe { topic, subscriber, event_tx, result_tx }) => {
                            let fresh = register_subscriber(&mut topics, topic.clone(), subscriber, event_tx);
                            if fresh && url_override.is_none() {
                                match send_client_message(stream, &ClientMessage::subscribe(topic.clone())).await {
                                    Ok(()) => debug!("[skillsync-link] Subscribed to channel {}", topic),
                                    Err(e) => {
                                        // The socket is likely dead; drop it and let the
                                        // reconnect path re-subscribe everything.
                                        warn!("[skillsync-link] Subscribe send failed: {}", e);
                                        event_handlers.emit_disconnect(DisconnectReason::new(format!(
                                            "Subscribe send failed: {}", e
                                        )));
                                        attempts += 1;
                                        ws = None;
                                    }
                                }
                            }
                            let _ = result_tx.send(Ok(()));
                        },
                        Some(ConnCmd::Unsubscribe { topic, subscriber }) => {
                            let topic_removed = remove_subscriber(&mut topics, &topic, subscriber);
                            if topic_removed && url_override.is_none() {
                                let _ = send_client_message(stream, &ClientMessage::unsubscribe(topic.clone())).await;
                                debug!("[skillsync-link] Unsubscribed from channel {}", topic);
                            }
                            if topics.is_empty() {
                                // Last subscriber gone: tear the socket down.
                                let _ = stream.close(None).await;
                                ws = None;
                                url_override = None;
                                attempts = 0;
                                event_handlers.emit_disconnect(DisconnectReason::new("No subscribers remain"));
                                set_state(&state_tx, ConnectionState::Disconnected);
                            }
                        },
                        Some(ConnCmd::ConnectOverride { url }) => {
                            // Takes effect on the next (re)connect; an open
                            // socket is left alone (idempotent connect).
                            url_override = Some(url);
                        },
                        Some(ConnCmd::Shutdown) | None => {
                            shutdown_requested = true;
                        },
                    }
                }

                _ = &mut ping_sleep, if has_heartbeat => {
                    if has_liveness && last_pong.elapsed() > timeouts.pong_timeout {
                        warn!(
                            "[skillsync-link] Heartbeat timeout ({:?} since last pong), reconnecting",
                            last_pong.elapsed()
                        );
                        event_handlers.emit_disconnect(DisconnectReason::new(
                            "Heartbeat timeout, server unresponsive",
                        ));
                        attempts += 1;
                        ws = None;
                        continue;
                    }
                    if let Err(e) = send_client_message(stream, &ClientMessage::ping()).await {
                        warn!("[skillsync-link] Heartbeat ping failed: {}", e);
                        event_handlers.emit_disconnect(DisconnectReason::new(format!(
                            "Heartbeat ping failed: {}", e
                        )));
                        attempts += 1;
                        ws = None;
                        continue;
                    }
                    ping_deadline = TokioInstant::now() + heartbeat;
                }

                frame = stream.next() => {
                    // Any frame proves the connection is alive.
                    last_pong = TokioInstant::now();

                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match parse_inbound(text.as_str()) {
                                Some(Inbound::Pong) => {
                                    debug!("[skillsync-link] Heartbeat: received pong");
                                }
                                Some(Inbound::Event { channel, event }) => {
                                    dispatch_event(&topics, channel.as_deref(), &event);
                                }
                                None => {} // unknown or malformed, dropped
                            }
                        },
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = stream.send(Message::Pong(payload)).await;
                        },
                        Some(Ok(Message::Pong(_))) => {},
                        Some(Ok(Message::Binary(_))) => {
                            debug!("[skillsync-link] Ignoring unexpected binary frame");
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let reason = match frame {
                                Some(f) => DisconnectReason::with_code(f.reason.to_string(), f.code.into()),
                                None => DisconnectReason::new("Server closed connection"),
                            };
                            event_handlers.emit_disconnect(reason);
                            attempts += 1;
                            ws = None;
                        },
                        Some(Ok(Message::Frame(_))) => {},
                        Some(Err(e)) => {
                            let msg = e.to_string();
                            event_handlers.emit_error(ConnectionError::new(&msg, true));
                            event_handlers.emit_disconnect(DisconnectReason::new(format!(
                                "WebSocket error: {}", msg
                            )));
                            attempts += 1;
                            ws = None;
                        },
                        None => {
                            event_handlers.emit_disconnect(DisconnectReason::new("WebSocket stream ended"));
                            attempts += 1;
                            ws = None;
                        },
                    }
                }
            }
        } else if topics.is_empty() {
            // Idle: no socket and nothing to connect for.
            attempts = 0;
            set_state(&state_tx, ConnectionState::Disconnected);
            match cmd_rx.recv().await {
                Some(ConnCmd::Subscribe { topic, subscriber, event_tx, result_tx }) => {
                    register_subscriber(&mut topics, topic, subscriber, event_tx);
                    let _ = result_tx.send(Ok(()));
                }
                Some(ConnCmd::Unsubscribe { topic, subscriber }) => {
                    remove_subscriber(&mut topics, &topic, subscriber);
                }
                Some(ConnCmd::ConnectOverride { url }) => {
                    url_override = Some(url);
                }
                Some(ConnCmd::Shutdown) | None => {
                    shutdown_requested = true;
                }
            }
        } else {
            // Subscribers exist but no socket: connect, or back off first.

            if !options.auto_reconnect && attempts > 0 {
                // Reconnect disabled: stay disconnected, keep serving commands.
                set_state(&state_tx, ConnectionState::Disconnected);
                match cmd_rx.recv().await {
                    Some(ConnCmd::Subscribe { topic, subscriber, event_tx, result_tx }) => {
                        register_subscriber(&mut topics, topic, subscriber, event_tx);
                        let _ = result_tx.send(Ok(()));
                    }
                    Some(ConnCmd::Unsubscribe { topic, subscriber }) => {
                        remove_subscriber(&mut topics, &topic, subscriber);
                    }
                    Some(ConnCmd::ConnectOverride { url }) => {
                        url_override = Some(url);
                    }
                    Some(ConnCmd::Shutdown) | None => {
                        shutdown_requested = true;
                    }
                }
                continue;
            }

            if let Some(max) = options.max_reconnect_attempts {
                if attempts > max {
                    warn!("[skillsync-link] Max reconnection attempts ({}) reached", max);
                    event_handlers.emit_error(ConnectionError::new(
                        format!("Max reconnection attempts ({}) reached", max),
                        false,
                    ));
                    // Dropping the senders closes every subscriber's stream.
                    topics.clear();
                    continue;
                }
            }

            if attempts > 0 {
                let delay = Duration::from_millis(options.reconnect_delay_ms(attempts));
                set_state(&state_tx, ConnectionState::Reconnecting { attempt: attempts });
                info!(
                    "[skillsync-link] Reconnecting in {}ms (attempt {})",
                    delay.as_millis(),
                    attempts
                );

                // Wait out the backoff while still serving commands.
                let sleep_fut = tokio::time::sleep(delay);
                tokio::pin!(sleep_fut);
                loop {
                    tokio::select! {
                        biased;
                        cmd = cmd_rx.recv() => {
                            match cmd {
                                Some(ConnCmd::Subscribe { topic, subscriber, event_tx, result_tx }) => {
                                    // Queued; the reconnect will subscribe it.
                                    register_subscriber(&mut topics, topic, subscriber, event_tx);
                                    let _ = result_tx.send(Ok(()));
                                }
                                Some(ConnCmd::Unsubscribe { topic, subscriber }) => {
                                    remove_subscriber(&mut topics, &topic, subscriber);
                                }
                                Some(ConnCmd::ConnectOverride { url }) => {
                                    url_override = Some(url);
                                }
                                Some(ConnCmd::Shutdown) | None => {
                                    shutdown_requested = true;
                                    break;
                                }
                            }
                        }
                        _ = &mut sleep_fut => break,
                    }
                }
                if shutdown_requested || topics.is_empty() {
                    continue;
                }
            } else {
                set_state(&state_tx, ConnectionState::Connecting);
            }

            let target = match url_override.clone() {
                Some(url) => Ok(url),
                None => resolve_ws_url(&base_url),
            };

            match target {
                Ok(url) => match establish(&url, &timeouts).await {
                    Ok(mut stream) => {
                        info!("[skillsync-link] Push connection established");
                        attempts = 0;
                        set_state(&state_tx, ConnectionState::Connected);
                        event_handlers.emit_connect();

                        if url_override.is_none() {
                            resubscribe_all(&mut stream, &topics).await;
                        }

                        last_pong = TokioInstant::now();
                        ping_deadline = TokioInstant::now() + heartbeat;
                        ws = Some(stream);
                    }
                    Err(e) => {
                        warn!(
                            "[skillsync-link] Connection attempt {} failed: {}",
                            attempts + 1,
                            e
                        );
                        event_handlers.emit_error(ConnectionError::new(e.to_string(), true));
                        attempts += 1;
                    }
                },
                Err(e) => {
                    warn!("[skillsync-link] Invalid push URL: {}", e);
                    event_handlers.emit_error(ConnectionError::new(e.to_string(), false));
                    attempts += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> mpsc::Sender<JobsUpdatedEvent> {
        mpsc::channel(1).0
    }

    #[test]
    fn test_register_and_remove_subscriber() {
        let mut topics = TopicRegistry::new();
        let a = SubscriberId(1);
        let b = SubscriberId(2);

        assert!(register_subscriber(&mut topics, "t".to_string(), a, sender()));
        assert!(!register_subscriber(&mut topics, "t".to_string(), b, sender()));

        assert!(!remove_subscriber(&mut topics, "t", a));
        assert!(remove_subscriber(&mut topics, "t", b));
        assert!(topics.is_empty());
    }

    #[test]
    fn test_remove_unknown_subscriber_is_noop() {
        let mut topics = TopicRegistry::new();
        assert!(!remove_subscriber(&mut topics, "missing", SubscriberId(7)));

        register_subscriber(&mut topics, "t".to_string(), SubscriberId(1), sender());
        // Wrong subscriber id, then double removal of the right one.
        assert!(!remove_subscriber(&mut topics, "t", SubscriberId(9)));
        assert!(remove_subscriber(&mut topics, "t", SubscriberId(1)));
        assert!(!remove_subscriber(&mut topics, "t", SubscriberId(1)));
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_channel() {
        let mut topics = TopicRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        topics.entry("jobs:updated:a".to_string()).or_default().push((SubscriberId(1), tx_a));
        topics.entry("jobs:updated:b".to_string()).or_default().push((SubscriberId(2), tx_b));

        let event = JobsUpdatedEvent {
            keyword: "a".to_string(),
            new_jobs: 1,
            has_new_data: None,
            max_job_created_at: None,
            source: None,
        };

        dispatch_event(&topics, Some("jobs:updated:a"), &event);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());

        // Channel-less messages broadcast to everyone.
        dispatch_event(&topics, None, &event);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }
}
