use serde::{Deserialize, Serialize};

/// Channel control requests, tagged by `action` on the wire:
/// `{"action":"subscribe","channel":"jobs:updated:rust"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Register interest in a channel.
    Subscribe { channel: String },
    /// Drop interest in a channel.
    Unsubscribe { channel: String },
}

/// Heartbeat messages, tagged by `type` on the wire: `{"type":"ping"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeartbeatMessage {
    Ping,
    Pong,
}

/// Client-to-server messages.
///
/// The backend uses two tag keys (`action` for channel control, `type` for
/// heartbeats), so this is a untagged union of the two tagged families.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Control(ControlMessage),
    Heartbeat(HeartbeatMessage),
}

impl ClientMessage {
    /// Build a channel subscribe request.
    pub fn subscribe(channel: impl Into<String>) -> Self {
        ClientMessage::Control(ControlMessage::Subscribe {
            channel: channel.into(),
        })
    }

    /// Build a channel unsubscribe request.
    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        ClientMessage::Control(ControlMessage::Unsubscribe {
            channel: channel.into(),
        })
    }

    /// Build a heartbeat ping.
    pub fn ping() -> Self {
        ClientMessage::Heartbeat(HeartbeatMessage::Ping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_wire_shape() {
        let json = serde_json::to_value(ClientMessage::subscribe("jobs:updated:rust")).unwrap();
        assert_eq!(json["action"], "subscribe");
        assert_eq!(json["channel"], "jobs:updated:rust");
    }

    #[test]
    fn test_ping_wire_shape() {
        let json = serde_json::to_value(ClientMessage::ping()).unwrap();
        assert_eq!(json["type"], "ping");
        assert!(json.get("action").is_none());
    }
}
