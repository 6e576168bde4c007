//! Main SkillSync client with builder pattern.
//!
//! Provides the primary interface for querying the jobs backend and opening
//! live subscriptions over the shared push connection.

use log::{debug, warn};
use std::sync::Arc;

use crate::connection::{jobs_topic, keyword_url, resolve_ws_url, SharedConnection};
use crate::controller::JobsController;
use crate::error::{Result, SkillSyncError};
use crate::event_handlers::EventHandlers;
use crate::models::{ConnectionOptions, ConnectionState};
use crate::query::{HttpJobsBackend, JobsBackend};
use crate::subscription::{normalize_keyword, JobsSubscription};
use crate::timeouts::SkillSyncTimeouts;

/// Environment variable naming the REST base URL.
pub const API_URL_ENV: &str = "SKILLSYNC_API_URL";

/// Environment variable naming the push endpoint. Absent means the live
/// feature is disabled, which is not an error.
pub const WS_URL_ENV: &str = "SKILLSYNC_WS_URL";

/// Main SkillSync client.
///
/// Use [`SkillSyncClient::builder`] to construct instances. The client is
/// cheap to clone; clones share the HTTP pool and the push connection.
///
/// # Examples
///
/// ```rust,no_run
/// use skillsync_link::SkillSyncClient;
///
/// # async fn example() -> skillsync_link::Result<()> {
/// let client = SkillSyncClient::builder()
///     .api_base_url("https://api.skillsync.example")
///     .ws_url("wss://api.skillsync.example/ws/jobs")
///     .build()?;
///
/// let mut controller = client.controller();
/// controller.draft_mut().title = "rust engineer".to_string();
/// controller.apply().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SkillSyncClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    api_base_url: String,
    /// Raw configured push URL, kept for keyword-scoped override URLs.
    ws_url: Option<String>,
    /// The shared push connection; absent when the feature is disabled or
    /// the configured URL is invalid.
    push: Option<Arc<SharedConnection>>,
    /// True when a push URL was configured but failed validation. This is
    /// the "feature broken" case, distinct from "feature disabled".
    push_config_error: bool,
    backend: Arc<HttpJobsBackend>,
    timeouts: SkillSyncTimeouts,
    options: ConnectionOptions,
}

impl SkillSyncClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> SkillSyncClientBuilder {
        SkillSyncClientBuilder::new()
    }

    /// Build a client from `SKILLSYNC_API_URL` and `SKILLSYNC_WS_URL`.
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var(API_URL_ENV).map_err(|_| {
            SkillSyncError::Configuration(format!("{} is not set", API_URL_ENV))
        })?;

        let mut builder = Self::builder().api_base_url(api_base_url);
        if let Ok(ws_url) = std::env::var(WS_URL_ENV) {
            if !ws_url.trim().is_empty() {
                builder = builder.ws_url(ws_url);
            }
        }
        builder.build()
    }

    /// The REST base URL.
    pub fn api_base_url(&self) -> &str {
        &self.inner.api_base_url
    }

    /// Whether a valid push endpoint is configured.
    pub fn push_enabled(&self) -> bool {
        self.inner.push.is_some()
    }

    /// The REST backend, usable directly or through a controller.
    pub fn backend(&self) -> Arc<dyn JobsBackend> {
        self.inner.backend.clone()
    }

    /// The shared push connection, when the feature is enabled.
    pub fn connection(&self) -> Option<Arc<SharedConnection>> {
        self.inner.push.clone()
    }

    /// The current state of the shared push connection.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner
            .push
            .as_ref()
            .map(|push| push.current_state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// The configured timeouts.
    pub fn timeouts(&self) -> &SkillSyncTimeouts {
        &self.inner.timeouts
    }

    /// Create a controller driving browsing and live reconciliation.
    pub fn controller(&self) -> JobsController {
        JobsController::new(self.clone())
    }

    /// Open a live subscription for a search keyword.
    ///
    /// This never fails: below-threshold keywords and a disabled push
    /// feature yield an inactive feed with `has_error() == false`, while a
    /// broken configuration or a subscribe failure yields an inactive feed
    /// with `has_error() == true`. `connect_key` distinguishes re-applies
    /// of the same keyword.
    pub async fn subscribe_jobs(&self, keyword: &str, connect_key: u64) -> JobsSubscription {
        let Some(normalized) = normalize_keyword(keyword) else {
            return JobsSubscription::inert(false);
        };

        if self.inner.push_config_error {
            return JobsSubscription::inert(true);
        }
        let Some(push) = self.inner.push.as_ref() else {
            // Push endpoint unconfigured: silently disabled.
            return JobsSubscription::inert(false);
        };

        let topic = jobs_topic(&normalized);
        debug!(
            "[skillsync-link] Subscribing to {} (connect_key={})",
            topic, connect_key
        );

        if self.inner.options.keyword_in_url {
            let ws_url = self.inner.ws_url.as_deref().unwrap_or_default();
            match keyword_url(ws_url, &normalized) {
                Ok(url) => {
                    if push.connect_override(url).await.is_err() {
                        return JobsSubscription::inert(true);
                    }
                }
                Err(e) => {
                    warn!("[skillsync-link] Invalid keyword URL: {}", e);
                    return JobsSubscription::inert(true);
                }
            }
        }

        match push.subscribe(topic.clone()).await {
            Ok((subscriber, event_rx)) => {
                JobsSubscription::active(normalized, topic, subscriber, event_rx, push)
            }
            Err(e) => {
                warn!("[skillsync-link] Subscribe failed: {}", e);
                JobsSubscription::inert(true)
            }
        }
    }

    /// Gracefully shut down the push connection.
    pub async fn shutdown(&self) {
        if let Some(push) = self.inner.push.as_ref() {
            push.shutdown().await;
        }
    }
}

/// Builder for configuring [`SkillSyncClient`] instances.
pub struct SkillSyncClientBuilder {
    api_base_url: Option<String>,
    ws_url: Option<String>,
    timeouts: SkillSyncTimeouts,
    options: ConnectionOptions,
    event_handlers: EventHandlers,
}

impl SkillSyncClientBuilder {
    fn new() -> Self {
        Self {
            api_base_url: None,
            ws_url: None,
            timeouts: SkillSyncTimeouts::default(),
            options: ConnectionOptions::default(),
            event_handlers: EventHandlers::new(),
        }
    }

    /// Set the REST base URL (required).
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the push endpoint URL. Leaving it unset disables live updates.
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.ws_url = (!url.trim().is_empty()).then(|| url.trim().to_string());
        self
    }

    /// Set the timeout configuration for all operations.
    pub fn timeouts(mut self, timeouts: SkillSyncTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set connection-level options (reconnect policy, URL mode).
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Register connection lifecycle event handlers.
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Build the client.
    ///
    /// When a push URL is configured this spawns the background connection
    /// task, so it must run inside a Tokio runtime. The transport itself is
    /// only established once the first subscriber arrives.
    pub fn build(self) -> Result<SkillSyncClient> {
        let api_base_url = self
            .api_base_url
            .ok_or_else(|| SkillSyncError::Configuration("api_base_url is required".into()))?
            .trim()
            .trim_end_matches('/')
            .to_string();
        if api_base_url.is_empty() {
            return Err(SkillSyncError::Configuration("api_base_url is required".into()));
        }

        // Pooled HTTP client; keep-alive connections amortize handshakes
        // across paginated browsing.
        let http_client = reqwest::Client::builder()
            .timeout(self.timeouts.fetch_timeout)
            .connect_timeout(self.timeouts.connect_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| SkillSyncError::Configuration(e.to_string()))?;

        let backend = Arc::new(HttpJobsBackend::new(api_base_url.clone(), http_client));

        // Validate the push URL up front. A missing URL disables the
        // feature; an invalid one is remembered so subscriptions can
        // report it, without blocking REST browsing.
        let (push, push_config_error) = match self.ws_url.as_deref() {
            None => (None, false),
            Some(raw) => match resolve_ws_url(raw) {
                Ok(resolved) => {
                    let shared = SharedConnection::spawn(
                        resolved,
                        self.timeouts.clone(),
                        self.options.clone(),
                        self.event_handlers.clone(),
                    );
                    (Some(Arc::new(shared)), false)
                }
                Err(e) => {
                    warn!("[skillsync-link] Push disabled, invalid URL: {}", e);
                    (None, true)
                }
            },
        };

        Ok(SkillSyncClient {
            inner: Arc::new(ClientInner {
                api_base_url,
                ws_url: self.ws_url,
                push,
                push_config_error,
                backend,
                timeouts: self.timeouts,
                options: self.options,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_api_base_url() {
        assert!(SkillSyncClient::builder().build().is_err());
    }

    #[test]
    fn test_builder_minimal() {
        let client = SkillSyncClient::builder()
            .api_base_url("http://localhost:3000/")
            .build()
            .unwrap();
        assert_eq!(client.api_base_url(), "http://localhost:3000");
        assert!(!client.push_enabled());
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_invalid_ws_url_marks_config_error() {
        let client = SkillSyncClient::builder()
            .api_base_url("http://localhost:3000")
            .ws_url("ftp://not-a-ws-endpoint")
            .build()
            .unwrap();
        assert!(!client.push_enabled());

        let sub = client.subscribe_jobs("engineer", 0).await;
        assert!(sub.has_error());
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn test_unconfigured_push_is_not_an_error() {
        let client = SkillSyncClient::builder()
            .api_base_url("http://localhost:3000")
            .build()
            .unwrap();

        let sub = client.subscribe_jobs("engineer", 0).await;
        assert!(!sub.has_error());
        assert!(!sub.is_active());
    }
}
