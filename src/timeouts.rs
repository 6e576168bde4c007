//! Timeout configuration for skillsync-link client operations.
//!
//! Centralizes the timing knobs for HTTP fetches, the WebSocket handshake
//! and the application-level heartbeat.

use std::time::Duration;

/// Timeout configuration for client operations.
///
/// All values have sensible defaults; the heartbeat defaults match the
/// backend's expectations (30s ping interval, 65s silence window before the
/// connection is treated as dead).
///
/// # Examples
///
/// ```rust
/// use skillsync_link::SkillSyncTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = SkillSyncTimeouts::default();
///
/// // Custom timeouts for high-latency environments
/// let timeouts = SkillSyncTimeouts::builder()
///     .connect_timeout(Duration::from_secs(30))
///     .fetch_timeout(Duration::from_secs(60))
///     .build();
///
/// // Aggressive timeouts for local development
/// let timeouts = SkillSyncTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct SkillSyncTimeouts {
    /// Timeout for establishing connections (TCP + TLS + WS handshake).
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Timeout for a complete REST request/response cycle.
    /// Default: 30 seconds
    pub fetch_timeout: Duration,

    /// Interval between heartbeat ping messages on the push connection.
    /// Set to 0 to disable the heartbeat.
    /// Default: 30 seconds
    pub heartbeat_interval: Duration,

    /// Maximum silence after the last pong before the connection is
    /// considered dead and torn down for reconnect.
    /// Set to 0 to disable the liveness check.
    /// Default: 65 seconds
    pub pong_timeout: Duration,
}

impl Default for SkillSyncTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(65),
        }
    }
}

impl SkillSyncTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> SkillSyncTimeoutsBuilder {
        SkillSyncTimeoutsBuilder::new()
    }

    /// Timeouts optimized for fast local development.
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(12),
        }
    }

    /// Check if a duration represents "no timeout" (zero or absurdly large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for creating custom [`SkillSyncTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct SkillSyncTimeoutsBuilder {
    timeouts: SkillSyncTimeouts,
}

impl SkillSyncTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: SkillSyncTimeouts::default(),
        }
    }

    /// Set the connection timeout (TCP + TLS + WS handshake).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect_timeout = timeout;
        self
    }

    /// Set the REST request/response timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.fetch_timeout = timeout;
        self
    }

    /// Set the heartbeat ping interval. Zero disables the heartbeat.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.timeouts.heartbeat_interval = interval;
        self
    }

    /// Set the pong liveness window. Zero disables the check.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.pong_timeout = timeout;
        self
    }

    /// Build the timeout configuration.
    pub fn build(self) -> SkillSyncTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = SkillSyncTimeouts::default();
        assert_eq!(timeouts.connect_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(timeouts.pong_timeout, Duration::from_secs(65));
    }

    #[test]
    fn test_builder() {
        let timeouts = SkillSyncTimeouts::builder()
            .connect_timeout(Duration::from_secs(60))
            .heartbeat_interval(Duration::from_secs(15))
            .build();

        assert_eq!(timeouts.connect_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.heartbeat_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(SkillSyncTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!SkillSyncTimeouts::is_no_timeout(Duration::from_secs(1)));
    }
}
