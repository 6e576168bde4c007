//! Push connection management.
//!
//! This module contains:
//! - [`websocket`]: low-level helpers (URL resolution, wire message
//!   encoding/decoding)
//! - [`shared`]: the shared multiplexed connection with heartbeat and
//!   auto-reconnect

pub mod shared;
pub mod websocket;

pub use shared::{SharedConnection, SubscriberId};
pub(crate) use websocket::{
    keyword_url, parse_inbound, resolve_ws_url, send_client_message, Inbound, WsStream,
};

/// Capacity of each subscriber's event channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the command channel into the connection task.
pub(crate) const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Channel name prefix for keyword-scoped job update topics.
pub const JOBS_TOPIC_PREFIX: &str = "jobs:updated:";

/// Derive the push topic for a normalized (already trimmed) keyword.
pub fn jobs_topic(keyword: &str) -> String {
    format!("{}{}", JOBS_TOPIC_PREFIX, keyword)
}
