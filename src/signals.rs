//! Transient, auto-expiring UI signals.
//!
//! Everything here is derived presentation state: short-lived indicators a
//! UI can render, never read back as a source of truth and never allowed to
//! influence ordering or deduplication. Expiry is deadline-based; accessors
//! consult the deadline so no timer task is needed.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::time::{Duration, Instant as TokioInstant};

/// How long the "N new jobs" banner stays up.
pub const BANNER_DISMISS_AFTER: Duration = Duration::from_secs(4);

/// How long freshly merged rows keep their highlight.
pub const RECENT_HIGHLIGHT_AFTER: Duration = Duration::from_millis(4500);

/// Coarse progress indicator for the search flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    /// No live-eligible search in progress.
    #[default]
    Idle,
    /// Filters applied and live mode eligible; waiting for results.
    Searching,
    /// A live event landed for the current search.
    Updated,
}

/// Short-lived indicators derived from fetches and reconciliations.
#[derive(Debug, Default)]
pub struct TransientSignals {
    status: SearchStatus,
    banner: Option<(usize, TokioInstant)>,
    recent: Option<(HashSet<String>, TokioInstant)>,
    last_updated_at: Option<DateTime<Utc>>,
}

impl TransientSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn set_status(&mut self, status: SearchStatus) {
        self.status = status;
    }

    /// When the last live update landed, for "updated just now" copy.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }

    /// Record a landed live update.
    pub fn mark_updated(&mut self, now: DateTime<Utc>) {
        self.status = SearchStatus::Updated;
        self.last_updated_at = Some(now);
    }

    /// Raise the "N new jobs" banner. Zero counts are ignored.
    pub fn raise_banner(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.banner = Some((count, TokioInstant::now() + BANNER_DISMISS_AFTER));
    }

    /// The banner count, or zero once it has auto-dismissed.
    pub fn banner_count(&self) -> usize {
        match self.banner {
            Some((count, deadline)) if TokioInstant::now() < deadline => count,
            _ => 0,
        }
    }

    /// Highlight freshly merged rows. Ids accumulate while the previous
    /// highlight window is still open; the deadline restarts on each batch.
    pub fn highlight_recent(&mut self, ids: impl IntoIterator<Item = String>) {
        let deadline = TokioInstant::now() + RECENT_HIGHLIGHT_AFTER;
        let set = match self.recent.take() {
            Some((mut existing, old_deadline)) if TokioInstant::now() < old_deadline => {
                existing.extend(ids);
                existing
            }
            _ => ids.into_iter().collect(),
        };
        if !set.is_empty() {
            self.recent = Some((set, deadline));
        }
    }

    /// Whether a row should render with the recently-added emphasis.
    pub fn is_recent(&self, id: &str) -> bool {
        match &self.recent {
            Some((ids, deadline)) if TokioInstant::now() < *deadline => ids.contains(id),
            _ => false,
        }
    }

    /// Count of currently highlighted rows.
    pub fn recent_count(&self) -> usize {
        match &self.recent {
            Some((ids, deadline)) if TokioInstant::now() < *deadline => ids.len(),
            _ => 0,
        }
    }

    /// Drop every transient indicator (filter apply/reset).
    pub fn clear(&mut self) {
        self.status = SearchStatus::Idle;
        self.banner = None;
        self.recent = None;
        self.last_updated_at = None;
    }
}
