//! Keyed result cache with incremental merge support.
//!
//! [`JobStore`] owns the cached pages, one per `(filters, limit, offset)`
//! partition, plus the live cutoff for the hot partition. Two mechanisms
//! keep it consistent under async completion races:
//!
//! - **Generation counters** per key: every fetch begins by bumping the
//!   key's generation; a completion only writes if its generation is still
//!   current, so a slow response for a superseded request can never
//!   overwrite newer data (stale-response discard).
//! - **Id-based deduplication** on merge: a record id never appears twice
//!   in a partition no matter how often the backend re-sends it, which also
//!   makes out-of-order and duplicate event delivery harmless.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::time::{Duration, Instant as TokioInstant};

use crate::models::{JobRecord, JobsPage, PageKey};

/// Upper bound on cached items per partition after incremental merges.
pub const MAX_CACHED_ITEMS: usize = 100;

/// How long a cached page is considered fresh.
pub const PAGE_STALE_AFTER: Duration = Duration::from_secs(30);

/// A fetch ticket returned by [`JobStore::begin_fetch`].
pub type FetchGeneration = u64;

struct CachedPage {
    page: JobsPage,
    fetched_at: TokioInstant,
}

/// Outcome of an incremental merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Ids that were genuinely new to the partition, in merged order.
    pub new_ids: Vec<String>,
}

impl MergeOutcome {
    pub fn new_count(&self) -> usize {
        self.new_ids.len()
    }
}

/// In-memory cache of job result pages.
#[derive(Default)]
pub struct JobStore {
    pages: HashMap<PageKey, CachedPage>,
    generations: HashMap<PageKey, FetchGeneration>,
    /// Newest `created_at` observed for the hot partition's first page.
    /// Lower bound for incremental fetches; only ever advances.
    cutoff: Option<DateTime<Utc>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Fetch lifecycle ─────────────────────────────────────────────────

    /// Start a fetch for `key`, superseding any in-flight fetch for it.
    pub fn begin_fetch(&mut self, key: &PageKey) -> FetchGeneration {
        let generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Complete a fetch. Writes the page only when `generation` is still
    /// current for `key`; returns whether the write happened.
    pub fn complete_fetch(
        &mut self,
        key: &PageKey,
        generation: FetchGeneration,
        page: JobsPage,
    ) -> bool {
        if self.generations.get(key).copied() != Some(generation) {
            log::debug!(
                "[skillsync-link] Discarding stale fetch result (generation {})",
                generation
            );
            return false;
        }

        if key.offset == 0 {
            self.observe_cutoff(&page);
        }
        self.pages.insert(
            key.clone(),
            CachedPage {
                page,
                fetched_at: TokioInstant::now(),
            },
        );
        true
    }

    /// The cached page for `key`, if any.
    pub fn page(&self, key: &PageKey) -> Option<&JobsPage> {
        self.pages.get(key).map(|cached| &cached.page)
    }

    /// Whether `key` holds a page fetched within the freshness window.
    pub fn is_fresh(&self, key: &PageKey) -> bool {
        self.pages
            .get(key)
            .map(|cached| cached.fetched_at.elapsed() < PAGE_STALE_AFTER)
            .unwrap_or(false)
    }

    /// Drop the cached page for `key`, forcing the next read to refetch.
    pub fn invalidate(&mut self, key: &PageKey) {
        self.pages.remove(key);
    }

    /// Drop every cached page and the cutoff.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.generations.clear();
        self.cutoff = None;
    }

    // ── Incremental merge ───────────────────────────────────────────────

    /// Merge incremental records into the partition at `key`.
    ///
    /// Records whose id already exists in the partition are discarded; the
    /// rest are prepended newest-first, the list is truncated to
    /// [`MAX_CACHED_ITEMS`], and a tracked total grows by the number of
    /// genuinely new records. No-op when `key` has no cached page.
    pub fn merge_new(&mut self, key: &PageKey, incoming: Vec<JobRecord>) -> MergeOutcome {
        let Some(cached) = self.pages.get_mut(key) else {
            return MergeOutcome::default();
        };

        let existing: HashSet<&str> =
            cached.page.items.iter().map(|job| job.id.as_str()).collect();
        let fresh: Vec<JobRecord> = incoming
            .into_iter()
            .filter(|job| !existing.contains(job.id.as_str()))
            .collect();
        drop(existing);

        if fresh.is_empty() {
            return MergeOutcome::default();
        }

        let new_ids: Vec<String> = fresh.iter().map(|job| job.id.clone()).collect();

        let mut items = Vec::with_capacity(fresh.len() + cached.page.items.len());
        items.extend(fresh);
        items.append(&mut cached.page.items);
        items.truncate(MAX_CACHED_ITEMS);
        cached.page.items = items;

        if let Some(total) = cached.page.total.as_mut() {
            *total += new_ids.len() as u64;
        }

        MergeOutcome { new_ids }
    }

    // ── Live cutoff ─────────────────────────────────────────────────────

    /// The incremental-fetch lower bound, when known.
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.cutoff
    }

    /// Forget the cutoff. Called whenever the filters or the active keyword
    /// subscription change; it is recomputed from the next first-page load.
    pub fn reset_cutoff(&mut self) {
        self.cutoff = None;
    }

    /// Advance the cutoff to `candidate` if it is newer. Never regresses.
    pub fn advance_cutoff(&mut self, candidate: DateTime<Utc>) {
        match self.cutoff {
            Some(current) if candidate <= current => {}
            _ => self.cutoff = Some(candidate),
        }
    }

    /// Observe a first-page load or merge batch: the newest `created_at`
    /// among the records advances the cutoff.
    pub fn observe_cutoff(&mut self, page: &JobsPage) {
        if let Some(newest) = page.items.iter().filter_map(|job| job.created_at).max() {
            self.advance_cutoff(newest);
        }
    }
}
