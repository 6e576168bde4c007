use serde::{Deserialize, Serialize};

/// Connection-level options for the push transport.
///
/// Separate from [`SkillSyncTimeouts`](crate::SkillSyncTimeouts), which
/// controls timing of individual operations; these options control the
/// reconnect policy and URL mode.
///
/// # Example
///
/// ```rust
/// use skillsync_link::ConnectionOptions;
///
/// let options = ConnectionOptions::new()
///     .with_auto_reconnect(true)
///     .with_max_reconnect_attempts(Some(10));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Reconnect automatically while subscribers remain.
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Per-attempt increment of the reconnect delay in milliseconds.
    /// The delay before attempt N is `min(N * reconnect_step_ms,
    /// max_reconnect_delay_ms)`. Default: 1000ms
    #[serde(default = "default_reconnect_step_ms")]
    pub reconnect_step_ms: u64,

    /// Upper bound on the reconnect delay. Default: 10000ms
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    /// Give up after this many consecutive failed attempts.
    /// Default: None (retry for as long as subscribers remain)
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    /// Embed the search keyword in the connection URL (`?keyword=...`)
    /// instead of driving topics through subscribe control messages. In
    /// this mode no control messages are sent and automatic resubscription
    /// after reconnect is skipped, since the URL itself encodes the topic.
    /// Default: false
    #[serde(default)]
    pub keyword_in_url: bool,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_step_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    10_000
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            reconnect_step_ms: default_reconnect_step_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            max_reconnect_attempts: None,
            keyword_in_url: false,
        }
    }
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_reconnect_step_ms(mut self, step_ms: u64) -> Self {
        self.reconnect_step_ms = step_ms;
        self
    }

    pub fn with_max_reconnect_delay_ms(mut self, max_ms: u64) -> Self {
        self.max_reconnect_delay_ms = max_ms;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_keyword_in_url(mut self, enabled: bool) -> Self {
        self.keyword_in_url = enabled;
        self
    }

    /// Reconnect delay before the given attempt (1-based).
    pub fn reconnect_delay_ms(&self, attempt: u32) -> u64 {
        std::cmp::min(
            (attempt as u64).saturating_mul(self.reconnect_step_ms),
            self.max_reconnect_delay_ms,
        )
    }
}
