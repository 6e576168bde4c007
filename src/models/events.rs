/// Normalized "jobs updated" push event.
///
/// Produced by the normalization layer from raw push payloads; consumers
/// never see malformed or non-`jobs_updated` messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsUpdatedEvent {
    /// The search keyword this event is scoped to.
    pub keyword: String,
    /// Server-reported count of new postings (informational; the reconciler
    /// trusts only its own deduplicated count).
    pub new_jobs: u32,
    pub has_new_data: Option<bool>,
    /// Newest `created_at` the server saw, as an opaque ISO-8601 string.
    pub max_job_created_at: Option<String>,
    /// Which ingestion source produced the new postings.
    pub source: Option<String>,
}
