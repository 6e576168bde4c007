use std::fmt;

/// Lifecycle state of the shared push connection.
///
/// Owned exclusively by the connection task and broadcast over a watch
/// channel; consumers observe transitions, none mutate the state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport, and none being established.
    #[default]
    Disconnected,
    /// First connection attempt in flight.
    Connecting,
    /// Transport open and heartbeat-alive.
    Connected,
    /// Transport lost; a backoff-delayed attempt is pending or in flight.
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    /// True while the connection is usable or actively being recovered.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected
                | ConnectionState::Connecting
                | ConnectionState::Reconnecting { .. }
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting { attempt } => {
                write!(f, "reconnecting (attempt {})", attempt)
            }
        }
    }
}
