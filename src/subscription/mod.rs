//! Per-keyword live update subscription.
//!
//! [`JobsSubscription`] translates a free-text search keyword into a bounded
//! live-update feed over the shared push connection. Keywords shorter than
//! two characters (after trimming) never activate a subscription, and an
//! unconfigured push endpoint leaves the feed silently disabled rather than
//! erroring: live updates are an enhancement, not a requirement for
//! browsing.

use log::debug;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant as TokioInstant};

use crate::connection::{SharedConnection, SubscriberId};
use crate::models::{ConnectionState, JobsUpdatedEvent};

/// Minimum trimmed keyword length that activates a live subscription.
pub const MIN_KEYWORD_LEN: usize = 2;

/// How long `is_refreshing()` stays true after an event arrives. This is a
/// debounce/animation signal for UIs, not an authoritative state.
pub const REFRESH_FLASH: Duration = Duration::from_millis(800);

/// A live job-update feed scoped to one search keyword.
///
/// Obtained from
/// [`SkillSyncClient::subscribe_jobs`](crate::SkillSyncClient::subscribe_jobs).
/// Dropping the handle unsubscribes; [`close`](JobsSubscription::close) does
/// the same eagerly and is idempotent.
pub struct JobsSubscription {
    /// The normalized keyword, present only when the subscription is active.
    keyword: Option<String>,
    /// The derived channel topic, present only when active.
    topic: Option<String>,
    subscriber: Option<SubscriberId>,
    event_rx: Option<mpsc::Receiver<JobsUpdatedEvent>>,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    /// Fire-and-forget unsubscribe path for `Drop`.
    unsub_tx: Option<mpsc::Sender<(String, SubscriberId)>>,
    has_error: bool,
    last_event: Option<JobsUpdatedEvent>,
    refresh_until: Option<TokioInstant>,
    closed: bool,
}

impl JobsSubscription {
    /// An inactive subscription: below-threshold keyword, or push disabled.
    pub(crate) fn inert(has_error: bool) -> Self {
        Self {
            keyword: None,
            topic: None,
            subscriber: None,
            event_rx: None,
            state_rx: None,
            unsub_tx: None,
            has_error,
            last_event: None,
            refresh_until: None,
            closed: false,
        }
    }

    /// An active subscription registered on the shared connection.
    pub(crate) fn active(
        keyword: String,
        topic: String,
        subscriber: SubscriberId,
        event_rx: mpsc::Receiver<JobsUpdatedEvent>,
        shared: &Arc<SharedConnection>,
    ) -> Self {
        Self {
            keyword: Some(keyword),
            topic: Some(topic),
            subscriber: Some(subscriber),
            event_rx: Some(event_rx),
            state_rx: Some(shared.state()),
            unsub_tx: Some(shared.unsubscribe_tx()),
            has_error: false,
            last_event: None,
            refresh_until: None,
            closed: false,
        }
    }

    /// The normalized keyword driving this feed, when active.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    /// The channel topic this feed listens on, when active.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Whether a topic subscription was actually established.
    pub fn is_active(&self) -> bool {
        self.subscriber.is_some() && !self.closed
    }

    /// The feed's view of the connection state.
    ///
    /// Gated on this keyword being active and error-free: an inactive or
    /// failed feed reports `Disconnected` regardless of the shared socket.
    pub fn status(&self) -> ConnectionState {
        if self.closed || self.has_error || self.topic.is_none() {
            return ConnectionState::Disconnected;
        }
        self.state_rx
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// True for a short window after each event; purely a UI pulse.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_until
            .map(|until| TokioInstant::now() < until)
            .unwrap_or(false)
    }

    /// True when the push endpoint configuration is invalid or subscription
    /// setup failed. An unconfigured endpoint is not an error.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// The most recent event observed on this feed.
    pub fn last_event(&self) -> Option<&JobsUpdatedEvent> {
        self.last_event.as_ref()
    }

    /// Await the next update event.
    ///
    /// Returns `None` for inactive feeds, after `close()`, or when the
    /// connection gave up permanently.
    pub async fn next_event(&mut self) -> Option<JobsUpdatedEvent> {
        if self.closed {
            return None;
        }
        let event = self.event_rx.as_mut()?.recv().await?;
        self.note_event(event.clone());
        Some(event)
    }

    /// Non-blocking poll for a pending event.
    pub fn try_event(&mut self) -> Option<JobsUpdatedEvent> {
        if self.closed {
            return None;
        }
        let event = self.event_rx.as_mut()?.try_recv().ok()?;
        self.note_event(event.clone());
        Some(event)
    }

    fn note_event(&mut self, event: JobsUpdatedEvent) {
        self.refresh_until = Some(TokioInstant::now() + REFRESH_FLASH);
        self.last_event = Some(event);
    }

    /// Unsubscribe from the shared connection.
    ///
    /// Safe to call multiple times; subsequent calls are no-ops.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let (Some(topic), Some(subscriber), Some(tx)) =
            (self.topic.clone(), self.subscriber, self.unsub_tx.take())
        {
            debug!("[skillsync-link] Closing subscription for {}", topic);
            let _ = tx.send((topic, subscriber)).await;
        }
        self.event_rx = None;
    }

    /// Returns true once `close()` has run (or `Drop` is underway).
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for JobsSubscription {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let (Some(topic), Some(subscriber), Some(tx)) =
            (self.topic.take(), self.subscriber, self.unsub_tx.take())
        {
            let _ = tx.try_send((topic, subscriber));
        }
    }
}

/// Normalize a raw keyword: trim, then apply the activation threshold.
/// Returns `None` when the keyword is too short to drive live updates.
pub fn normalize_keyword(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_KEYWORD_LEN {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keyword_threshold() {
        assert_eq!(normalize_keyword(""), None);
        assert_eq!(normalize_keyword("  a  "), None);
        assert_eq!(normalize_keyword("ab"), Some("ab".to_string()));
        assert_eq!(normalize_keyword("  engineer "), Some("engineer".to_string()));
    }

    #[test]
    fn test_inert_subscription_reports_disconnected() {
        let sub = JobsSubscription::inert(false);
        assert!(!sub.is_active());
        assert_eq!(sub.status(), ConnectionState::Disconnected);
        assert!(!sub.has_error());
        assert!(!sub.is_refreshing());
    }

    #[test]
    fn test_inert_subscription_with_config_error() {
        let sub = JobsSubscription::inert(true);
        assert!(sub.has_error());
        assert_eq!(sub.status(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_next_event_on_inert_returns_none() {
        let mut sub = JobsSubscription::inert(false);
        assert!(sub.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut sub = JobsSubscription::inert(false);
        sub.close().await;
        sub.close().await;
        assert!(sub.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_flash_expires() {
        let mut sub = JobsSubscription::inert(false);
        sub.note_event(JobsUpdatedEvent {
            keyword: "rust".to_string(),
            new_jobs: 1,
            has_new_data: None,
            max_job_created_at: None,
            source: None,
        });
        assert!(sub.is_refreshing());

        tokio::time::advance(REFRESH_FLASH + Duration::from_millis(10)).await;
        assert!(!sub.is_refreshing());
    }
}
