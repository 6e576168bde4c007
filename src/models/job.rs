use chrono::{DateTime, Utc};
use serde::Serialize;

/// One job posting as surfaced to the user.
///
/// Built exclusively by the normalization layer; raw backend rows missing an
/// id or title never become a `JobRecord`. Instances are immutable once
/// cached: a refetch replaces records wholesale, fields are never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    /// Opaque backend identifier, stable and unique per posting.
    pub id: String,
    pub title: String,
    pub company_name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered skill tags.
    pub skills: Vec<String>,
    /// Match score in the 0..=100 range, when the backend scored this posting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    /// Backend creation timestamp, used as the live-cutoff boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
