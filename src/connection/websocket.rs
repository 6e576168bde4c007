//! Low-level WebSocket helpers: URL resolution and wire message handling.

use futures_util::SinkExt;
use log::debug;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{Result, SkillSyncError};
use crate::models::{ClientMessage, JobsUpdatedEvent};
use crate::normalize::normalize_jobs_updated;

/// The WebSocket stream type used throughout the connection layer.
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Resolve the configured push URL into a ws/wss URL.
///
/// Accepts http(s) or ws(s) schemes; http maps to ws and https to wss. The
/// configured path and query are preserved.
pub(crate) fn resolve_ws_url(base_url: &str) -> Result<String> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        SkillSyncError::Configuration(format!("Invalid push URL '{}': {}", base_url, e))
    })?;

    if url.host_str().is_none() {
        return Err(SkillSyncError::Configuration(format!(
            "Push URL '{}' must include a host",
            base_url
        )));
    }

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SkillSyncError::Configuration(format!(
                "Unsupported push URL scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SkillSyncError::Configuration("Failed to set push URL scheme".to_string()))?;
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Build a keyword-scoped connection URL: the resolved push URL with
/// `?keyword=<value>` appended (URL-override mode).
pub(crate) fn keyword_url(base_url: &str, keyword: &str) -> Result<String> {
    let resolved = resolve_ws_url(base_url)?;
    let mut url = Url::parse(&resolved)
        .map_err(|e| SkillSyncError::Configuration(format!("Invalid push URL: {}", e)))?;
    url.query_pairs_mut().append_pair("keyword", keyword);
    Ok(url.to_string())
}

/// A decoded inbound message the connection task cares about.
#[derive(Debug, Clone)]
pub(crate) enum Inbound {
    /// Heartbeat answer; updates liveness, never forwarded.
    Pong,
    /// A jobs update, addressed to one channel or broadcast when `channel`
    /// is absent.
    Event {
        channel: Option<String>,
        event: JobsUpdatedEvent,
    },
}

/// Decode one inbound text frame.
///
/// Unparseable payloads and message types this client does not consume
/// normalize to `None` and are dropped without error.
pub(crate) fn parse_inbound(text: &str) -> Option<Inbound> {
    let payload: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!("[skillsync-link] Dropping unparseable push message: {}", e);
            return None;
        }
    };

    if payload.get("type").and_then(Value::as_str) == Some("pong") {
        return Some(Inbound::Pong);
    }

    let event = normalize_jobs_updated(&payload)?;
    let channel = payload
        .get("channel")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Some(Inbound::Event { channel, event })
}

/// Serialize and send one client message over the socket.
pub(crate) async fn send_client_message(ws: &mut WsStream, message: &ClientMessage) -> Result<()> {
    let payload = serde_json::to_string(message)?;
    ws.send(Message::Text(payload.into()))
        .await
        .map_err(|e| SkillSyncError::WebSocket(format!("Failed to send message: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ws_url_scheme_mapping() {
        assert_eq!(
            resolve_ws_url("http://push.example.com/ws/jobs").unwrap(),
            "ws://push.example.com/ws/jobs"
        );
        assert_eq!(
            resolve_ws_url("https://push.example.com/ws/jobs").unwrap(),
            "wss://push.example.com/ws/jobs"
        );
        assert_eq!(
            resolve_ws_url("ws://push.example.com/ws/jobs").unwrap(),
            "ws://push.example.com/ws/jobs"
        );
    }

    #[test]
    fn test_resolve_ws_url_rejects_bad_inputs() {
        assert!(resolve_ws_url("ftp://push.example.com").is_err());
        assert!(resolve_ws_url("not a url").is_err());
    }

    #[test]
    fn test_keyword_url_appends_query() {
        let url = keyword_url("ws://push.example.com/ws/jobs", "rust engineer").unwrap();
        assert!(url.starts_with("ws://push.example.com/ws/jobs?keyword="));
        assert!(url.contains("rust"));
    }

    #[test]
    fn test_parse_inbound_pong() {
        assert!(matches!(parse_inbound(r#"{"type":"pong"}"#), Some(Inbound::Pong)));
    }

    #[test]
    fn test_parse_inbound_event_with_channel() {
        let parsed = parse_inbound(
            r#"{"channel":"jobs:updated:rust","type":"jobs_updated","keyword":"rust","new_jobs":2}"#,
        );
        match parsed {
            Some(Inbound::Event { channel, event }) => {
                assert_eq!(channel.as_deref(), Some("jobs:updated:rust"));
                assert_eq!(event.new_jobs, 2);
            }
            other => panic!("unexpected parse result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_inbound_drops_garbage() {
        assert!(parse_inbound("{{{not json").is_none());
        assert!(parse_inbound(r#"{"type":"something_else"}"#).is_none());
    }
}
