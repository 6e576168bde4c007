//! Filter and pagination controller.
//!
//! [`JobsController`] is the single source of truth for "what the user is
//! asking to see": it stages draft filter edits, commits them atomically on
//! apply, owns the offset window, and orchestrates when the result cache is
//! refetched versus incrementally reconciled from live events.

use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

use crate::client::SkillSyncClient;
use crate::error::Result;
use crate::models::{JobFilters, JobSourceOption, JobsPage, PageKey};
use crate::normalize::{clamp_limit, normalize_filters, DEFAULT_PAGE_LIMIT};
use crate::query::JobsBackend;
use crate::signals::{SearchStatus, TransientSignals};
use crate::store::JobStore;
use crate::subscription::{normalize_keyword, JobsSubscription};

/// Staged filter edits. Editing a draft has no network effect; only
/// [`JobsController::apply`] commits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDraft {
    pub title: String,
    pub company_name: String,
    pub location: String,
    /// Free-text skills, comma separated.
    pub skills: String,
    /// Selected source option key (see [`JobsController::sources`]).
    pub source_key: String,
}

/// Drives job browsing: draft staging, apply/reset/refresh, pagination and
/// live reconciliation.
pub struct JobsController {
    client: SkillSyncClient,
    backend: Arc<dyn JobsBackend>,
    draft: FilterDraft,
    filters: JobFilters,
    limit: u32,
    offset: u32,
    /// Bumped on every apply so identical-keyword re-applies still force a
    /// fresh subscription.
    connect_key: u64,
    has_applied: bool,
    store: JobStore,
    signals: TransientSignals,
    subscription: JobsSubscription,
    sources: Vec<JobSourceOption>,
}

impl JobsController {
    /// Create a controller over the client's HTTP backend.
    pub fn new(client: SkillSyncClient) -> Self {
        let backend = client.backend();
        Self::with_backend(client, backend)
    }

    /// Create a controller with a custom backend implementation.
    pub fn with_backend(client: SkillSyncClient, backend: Arc<dyn JobsBackend>) -> Self {
        Self {
            client,
            backend,
            draft: FilterDraft::default(),
            filters: JobFilters::default(),
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            connect_key: 0,
            has_applied: false,
            store: JobStore::new(),
            signals: TransientSignals::new(),
            subscription: JobsSubscription::inert(false),
            sources: Vec::new(),
        }
    }

    /// Override the page size (clamped to the backend's accepted range).
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = clamp_limit(limit);
        self
    }

    // ── Draft staging ───────────────────────────────────────────────────

    pub fn draft(&self) -> &FilterDraft {
        &self.draft
    }

    /// Mutable access to the draft. No network effect until `apply()`.
    pub fn draft_mut(&mut self) -> &mut FilterDraft {
        &mut self.draft
    }

    // ── Source catalog ──────────────────────────────────────────────────

    /// Load and cache the grouped source options.
    pub async fn load_sources(&mut self) -> Result<&[JobSourceOption]> {
        self.sources = self.backend.fetch_job_sources().await?;
        Ok(&self.sources)
    }

    pub fn sources(&self) -> &[JobSourceOption] {
        &self.sources
    }

    /// Resolve a selected option key to the comma-joined id filter.
    fn resolve_source_ids(&self, source_key: &str) -> String {
        let key = source_key.trim();
        if key.is_empty() {
            return String::new();
        }
        self.sources
            .iter()
            .find(|option| option.key == key)
            .map(|option| option.ids.join(","))
            .unwrap_or_default()
    }

    // ── Apply / reset / refresh ─────────────────────────────────────────

    /// Commit the draft atomically and fetch the first page.
    ///
    /// Resets the offset and the live cutoff, bumps the connect key, clears
    /// every transient signal and replaces the live subscription.
    pub async fn apply(&mut self) -> Result<()> {
        let source_ids = self.resolve_source_ids(&self.draft.source_key);
        self.filters = normalize_filters(
            &self.draft.title,
            &self.draft.company_name,
            &self.draft.location,
            &self.draft.skills,
            &source_ids,
        );
        self.offset = 0;
        self.has_applied = true;
        self.connect_key += 1;
        self.store.reset_cutoff();
        self.signals.clear();

        let keyword = self.filters.keyword().unwrap_or_default().to_string();
        if normalize_keyword(&keyword).is_some() {
            self.signals.set_status(SearchStatus::Searching);
        }

        self.resubscribe(&keyword).await;
        self.fetch_current().await
    }

    /// Clear the draft and the applied filters, returning to idle.
    pub async fn reset(&mut self) -> Result<()> {
        self.draft = FilterDraft::default();
        self.filters = JobFilters::default();
        self.offset = 0;
        self.has_applied = false;
        self.store.clear();
        self.signals.clear();

        self.subscription.close().await;
        self.subscription = JobsSubscription::inert(false);

        self.fetch_current().await
    }

    /// Re-issue the fetch for the current window without touching filters.
    pub async fn refresh(&mut self) -> Result<()> {
        if self.live_keyword().is_some() {
            self.signals.set_status(SearchStatus::Searching);
        }
        self.store.invalidate(&self.current_key());
        self.fetch_current().await
    }

    async fn resubscribe(&mut self, keyword: &str) {
        self.subscription.close().await;
        self.subscription = self.client.subscribe_jobs(keyword, self.connect_key).await;
    }

    // ── Pagination ──────────────────────────────────────────────────────

    pub fn can_previous(&self) -> bool {
        self.offset > 0
    }

    /// More pages exist when the known total says so, or, with the total
    /// unknown, when the current page is exactly full.
    pub fn can_next(&self) -> bool {
        let Some(page) = self.current_page() else {
            return false;
        };
        match page.total {
            Some(total) => u64::from(self.offset + self.limit) < total,
            None => page.len() == self.limit as usize,
        }
    }

    /// Advance one page. No-op when the heuristics say no more pages exist.
    pub async fn next_page(&mut self) -> Result<()> {
        if !self.can_next() {
            return Ok(());
        }
        self.offset += self.limit;
        self.fetch_current().await
    }

    /// Go back one page; the offset never goes negative.
    pub async fn previous_page(&mut self) -> Result<()> {
        if !self.can_previous() {
            return Ok(());
        }
        self.offset = self.offset.saturating_sub(self.limit);
        self.fetch_current().await
    }

    // ── Fetching ────────────────────────────────────────────────────────

    /// The cache partition key for the current filters and window.
    pub fn current_key(&self) -> PageKey {
        PageKey::new(self.filters.clone(), self.limit, self.offset)
    }

    /// The cached page for the current window, if loaded.
    pub fn current_page(&self) -> Option<&JobsPage> {
        self.store.page(&self.current_key())
    }

    /// Fetch the current window into the cache.
    ///
    /// Every completion re-checks its fetch generation before writing, so a
    /// response that resolves after the filters or offset moved on is
    /// discarded instead of overwriting newer state.
    pub async fn fetch_current(&mut self) -> Result<()> {
        let key = self.current_key();
        if self.store.is_fresh(&key) {
            return Ok(());
        }
        let generation = self.store.begin_fetch(&key);

        let page = self
            .backend
            .fetch_jobs(&key.filters, key.limit, key.offset, None)
            .await?;

        if !self.store.complete_fetch(&key, generation, page) {
            debug!("[skillsync-link] Fetch superseded, result discarded");
        }
        Ok(())
    }

    // ── Live reconciliation ─────────────────────────────────────────────

    /// Await the next live event and reconcile it. Returns false when the
    /// feed is inactive or has ended.
    pub async fn pump_event(&mut self) -> bool {
        let Some(event) = self.subscription.next_event().await else {
            return false;
        };
        self.reconcile(&event).await;
        true
    }

    /// Apply one live event to the cache.
    ///
    /// Failures are swallowed: a failed incremental update must never crash
    /// or corrupt the displayed page; the next event or a manual refresh
    /// recovers.
    pub async fn reconcile(&mut self, event: &crate::models::JobsUpdatedEvent) {
        // Only events matching the active subscription keyword exactly count.
        let Some(active) = self.subscription.keyword().map(str::to_string) else {
            return;
        };
        if event.keyword.trim() != active {
            debug!(
                "[skillsync-link] Ignoring event for keyword '{}' (active '{}')",
                event.keyword, active
            );
            return;
        }

        self.signals.mark_updated(Utc::now());

        let Some(cutoff) = self.store.cutoff() else {
            // No cutoff yet (first load still pending): a bounded incremental
            // fetch could silently miss backlog, so refetch instead.
            self.store.invalidate(&self.current_key());
            if let Err(e) = self.fetch_current().await {
                warn!("[skillsync-link] Refetch after live event failed: {}", e);
            }
            return;
        };

        let first_key = self.current_key().first_page();
        let incoming = match self
            .backend
            .fetch_jobs(&first_key.filters, first_key.limit, 0, Some(cutoff))
            .await
        {
            Ok(page) => page.items,
            Err(e) => {
                warn!("[skillsync-link] Incremental fetch failed: {}", e);
                return;
            }
        };
        if incoming.is_empty() {
            return;
        }

        let newest = incoming.iter().filter_map(|job| job.created_at).max();

        if self.offset == 0 {
            // The user is viewing the hot partition: merge into it.
            let outcome = self.store.merge_new(&first_key, incoming);
            if outcome.new_count() > 0 {
                self.signals.raise_banner(outcome.new_count());
                self.signals.highlight_recent(outcome.new_ids);
            }
        } else {
            // Paginated away from the first page: never mutate the visible
            // window, only surface the count.
            let known: std::collections::HashSet<&str> = self
                .store
                .page(&first_key)
                .map(|page| page.items.iter().map(|job| job.id.as_str()).collect())
                .unwrap_or_default();
            let fresh = incoming
                .iter()
                .filter(|job| !known.contains(job.id.as_str()))
                .count();
            self.signals.raise_banner(fresh);
        }

        // Dedup, merge, then advance: strictly in that order.
        if let Some(newest) = newest {
            self.store.advance_cutoff(newest);
        }
    }

    // ── Observers ───────────────────────────────────────────────────────

    pub fn filters(&self) -> &JobFilters {
        &self.filters
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn has_applied(&self) -> bool {
        self.has_applied
    }

    pub fn connect_key(&self) -> u64 {
        self.connect_key
    }

    /// The active live keyword, when the applied title clears the threshold.
    pub fn live_keyword(&self) -> Option<&str> {
        self.subscription.keyword()
    }

    /// Whether live updates are on for the current search: keyword active,
    /// subscription error-free, and the connection live or recovering.
    pub fn is_live(&self) -> bool {
        self.subscription.is_active()
            && !self.subscription.has_error()
            && self.subscription.status().is_live()
    }

    pub fn subscription(&self) -> &JobsSubscription {
        &self.subscription
    }

    pub fn signals(&self) -> &TransientSignals {
        &self.signals
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }
}
