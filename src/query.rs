//! REST access to the jobs backend.
//!
//! [`JobsBackend`] is the narrow port the controller fetches through;
//! [`HttpJobsBackend`] is the production implementation over reqwest. Tests
//! substitute their own implementations to exercise the cache and controller
//! without a live server.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use serde_json::Value;
use std::time::Instant;

use crate::error::{Result, SkillSyncError};
use crate::models::{JobFilters, JobSourceOption, JobsPage};
use crate::normalize::{
    clamp_limit, clamp_offset, group_job_sources, normalize_job_sources_response,
    normalize_jobs_response,
};

/// Maximum automatic retries for transient HTTP failures.
const MAX_FETCH_RETRIES: u32 = 3;

/// Read access to the jobs backend.
#[async_trait]
pub trait JobsBackend: Send + Sync {
    /// Fetch one page of jobs for the given filters and window.
    ///
    /// `created_after` restricts the result to records newer than the given
    /// timestamp; the reconciler uses it for incremental fetches.
    async fn fetch_jobs(
        &self,
        filters: &JobFilters,
        limit: u32,
        offset: u32,
        created_after: Option<DateTime<Utc>>,
    ) -> Result<JobsPage>;

    /// Fetch the source catalog, grouped into displayable options.
    async fn fetch_job_sources(&self) -> Result<Vec<JobSourceOption>>;
}

/// Production [`JobsBackend`] speaking HTTP to the backend API.
#[derive(Clone)]
pub struct HttpJobsBackend {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpJobsBackend {
    pub(crate) fn new(base_url: String, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            http_client,
        }
    }

    /// Issue a GET and decode the JSON body, retrying transient transport
    /// failures with a linearly growing pause.
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        let mut retries = 0;
        let overall_start = Instant::now();

        loop {
            let attempt_start = Instant::now();
            debug!(
                "[skillsync-link] GET {} (attempt {}/{})",
                url,
                retries + 1,
                MAX_FETCH_RETRIES + 1
            );

            let request = self.http_client.get(url).query(query);
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        "[skillsync-link] Response: status={} duration_ms={}",
                        status,
                        attempt_start.elapsed().as_millis()
                    );

                    if status.is_success() {
                        let body: Value = response.json().await?;
                        debug!(
                            "[skillsync-link] GET {} done total_ms={}",
                            url,
                            overall_start.elapsed().as_millis()
                        );
                        return Ok(body);
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    warn!(
                        "[skillsync-link] Server error: status={} message=\"{}\"",
                        status, error_text
                    );
                    return Err(SkillSyncError::Server {
                        status_code: status.as_u16(),
                        message: error_text,
                    });
                }
                Err(e) if retries < MAX_FETCH_RETRIES && Self::is_retriable(&e) => {
                    warn!(
                        "[skillsync-link] Retriable error (attempt {}/{}): {}",
                        retries + 1,
                        MAX_FETCH_RETRIES + 1,
                        e
                    );
                    retries += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(100 * retries as u64))
                        .await;
                }
                Err(e) => {
                    warn!("[skillsync-link] Fatal HTTP error: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    fn is_retriable(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    fn jobs_query(
        filters: &JobFilters,
        limit: u32,
        offset: u32,
        created_after: Option<DateTime<Utc>>,
    ) -> Vec<(String, String)> {
        let mut query = vec![
            ("limit".to_string(), clamp_limit(limit).to_string()),
            ("offset".to_string(), clamp_offset(offset as i64).to_string()),
        ];

        let mut push = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                query.push((key.to_string(), v.clone()));
            }
        };
        push("title", &filters.title);
        push("company_name", &filters.company_name);
        push("location", &filters.location);
        push("skills", &filters.skills);
        push("source_id", &filters.source_id);

        if let Some(cutoff) = created_after {
            query.push((
                "created_after".to_string(),
                cutoff.to_rfc3339_opts(SecondsFormat::Micros, true),
            ));
        }

        query
    }
}

#[async_trait]
impl JobsBackend for HttpJobsBackend {
    async fn fetch_jobs(
        &self,
        filters: &JobFilters,
        limit: u32,
        offset: u32,
        created_after: Option<DateTime<Utc>>,
    ) -> Result<JobsPage> {
        let url = format!("{}/jobs", self.base_url);
        let query = Self::jobs_query(filters, limit, offset, created_after);
        let body = self.get_json(&url, &query).await?;
        Ok(normalize_jobs_response(&body))
    }

    async fn fetch_job_sources(&self) -> Result<Vec<JobSourceOption>> {
        let url = format!("{}/job-sources", self.base_url);
        let body = self.get_json(&url, &[]).await?;
        Ok(group_job_sources(normalize_job_sources_response(&body)))
    }
}
