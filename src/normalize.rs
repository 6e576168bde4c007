//! Normalization of heterogeneous backend payloads.
//!
//! The jobs backend is an aggregation layer over several ingestion sources
//! and its envelopes vary: lists arrive bare or wrapped under `data`,
//! `items` or `jobs`; ids and column names differ per source; counts may be
//! numbers or numeric strings. This module centralizes the coercion rules
//! so the rest of the crate only ever sees well-formed records.
//!
//! Rules that matter for correctness:
//!
//! - A row without an id or title is dropped here and never enters the cache.
//! - Push events that are not `jobs_updated` normalize to `None` and are
//!   never forwarded to subscribers.
//! - Limit is clamped to 1..=50, offset to >= 0.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{JobFilters, JobRecord, JobSourceOption, JobSourceRecord, JobsPage, JobsUpdatedEvent};

/// Default page size when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Hard bounds on the page size accepted by the backend.
pub const MIN_PAGE_LIMIT: u32 = 1;
pub const MAX_PAGE_LIMIT: u32 = 50;

// ── Scalar coercion ─────────────────────────────────────────────────────────

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn trimmed_text(value: Option<&Value>) -> String {
    text(value).trim().to_string()
}

/// Accept numbers or numeric strings; everything else is `None`.
fn number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| raw.get(k)).filter(|v| !v.is_null())
}

/// Parse an ISO-8601 timestamp, tolerating a missing offset.
pub fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ── Job records ─────────────────────────────────────────────────────────────

/// Skills arrive as an array of strings or as one comma-joined string.
fn normalize_skills(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Normalize one raw job row. Returns `None` when the row lacks an id or a
/// title, which keeps such rows out of the cache entirely.
pub fn normalize_job(raw: &Value) -> Option<JobRecord> {
    if !raw.is_object() {
        return None;
    }

    let id = trimmed_text(first_present(raw, &["job_id", "id", "_id"]));
    let title = trimmed_text(first_present(raw, &["title", "job_title"]));
    if id.is_empty() || title.is_empty() {
        return None;
    }

    let description = trimmed_text(raw.get("description"));
    let source_url = trimmed_text(first_present(raw, &["source_url", "sourceUrl", "url"]));
    let posted_date = trimmed_text(first_present(raw, &["posted_date", "postedDate"]));
    let created_at = trimmed_text(first_present(raw, &["created_at", "createdAt"]));

    Some(JobRecord {
        id,
        title,
        company_name: trimmed_text(first_present(raw, &["company_name", "company", "companyName"])),
        location: trimmed_text(raw.get("location")),
        description: (!description.is_empty()).then_some(description),
        skills: normalize_skills(first_present(
            raw,
            &["skills", "required_skills", "requiredSkills"],
        )),
        matching_score: number(first_present(raw, &["matching_score", "matchingScore", "score"])),
        source_url: (!source_url.is_empty()).then_some(source_url),
        posted_date: (!posted_date.is_empty()).then_some(posted_date),
        created_at: parse_created_at(&created_at),
    })
}

/// Unwrap the response envelope and locate the row list.
fn unwrap_list<'a>(payload: &'a Value) -> Option<&'a Vec<Value>> {
    let data = payload.get("data").filter(|v| !v.is_null()).unwrap_or(payload);

    if let Value::Array(items) = data {
        return Some(items);
    }

    for key in ["items", "jobs", "data"] {
        if let Some(Value::Array(items)) = data.get(key) {
            return Some(items);
        }
    }
    None
}

fn unwrap_total(payload: &Value) -> Option<u64> {
    let data = payload.get("data").filter(|v| !v.is_null()).unwrap_or(payload);
    let raw = first_present(data, &["total", "count", "total_count"])?;
    number(Some(raw)).filter(|n| *n >= 0.0).map(|n| n as u64)
}

/// Normalize a jobs-list response into a [`JobsPage`], dropping malformed rows.
pub fn normalize_jobs_response(payload: &Value) -> JobsPage {
    let items = unwrap_list(payload)
        .map(|rows| rows.iter().filter_map(normalize_job).collect())
        .unwrap_or_default();

    JobsPage::new(items, unwrap_total(payload))
}

// ── Push events ─────────────────────────────────────────────────────────────

/// Normalize a raw push payload into a [`JobsUpdatedEvent`].
///
/// Returns `None` for anything that is not a `jobs_updated` message; those
/// payloads are dropped before they reach subscribers.
pub fn normalize_jobs_updated(payload: &Value) -> Option<JobsUpdatedEvent> {
    if !payload.is_object() {
        return None;
    }
    if payload.get("type").and_then(Value::as_str) != Some("jobs_updated") {
        return None;
    }

    let new_jobs = number(payload.get("new_jobs"))
        .map(|n| n.trunc().max(0.0) as u32)
        .unwrap_or(0);

    let max_job_created_at = trimmed_text(payload.get("max_job_created_at"));
    let source = trimmed_text(payload.get("source"));

    Some(JobsUpdatedEvent {
        keyword: text(payload.get("keyword")),
        new_jobs,
        has_new_data: payload.get("has_new_data").and_then(Value::as_bool),
        max_job_created_at: (!max_job_created_at.is_empty()).then_some(max_job_created_at),
        source: (!source.is_empty()).then_some(source),
    })
}

// ── Pagination and filter inputs ────────────────────────────────────────────

/// Clamp a requested page size into the backend's accepted range.
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(MIN_PAGE_LIMIT, MAX_PAGE_LIMIT)
}

/// Clamp a requested offset; negative inputs collapse to zero.
pub fn clamp_offset(offset: i64) -> u32 {
    offset.max(0).min(u32::MAX as i64) as u32
}

/// Normalize a free-text skills draft into the backend's comma-joined form.
pub fn comma_separated_skills(raw: &str) -> String {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Normalize draft inputs into committed filters: trimmed, empties dropped.
pub fn normalize_filters(
    title: &str,
    company_name: &str,
    location: &str,
    skills: &str,
    source_id: &str,
) -> JobFilters {
    let non_empty = |s: &str| {
        let t = s.trim().to_string();
        (!t.is_empty()).then_some(t)
    };
    let joined_skills = comma_separated_skills(skills);

    JobFilters {
        title: non_empty(title),
        company_name: non_empty(company_name),
        location: non_empty(location),
        skills: (!joined_skills.is_empty()).then_some(joined_skills),
        source_id: non_empty(source_id),
    }
}

// ── Job sources ─────────────────────────────────────────────────────────────

/// Cheap format check for backend source ids (UUID shape, any version).
fn looks_like_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (i, b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if *b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

fn normalize_job_source(raw: &Value) -> Option<JobSourceRecord> {
    if !raw.is_object() {
        return None;
    }

    let id = trimmed_text(first_present(raw, &["id", "source_id", "sourceId"]));
    let name = trimmed_text(first_present(raw, &["name", "source_name", "sourceName"]));
    if !looks_like_uuid(&id) || name.is_empty() {
        return None;
    }

    let base_url = trimmed_text(first_present(raw, &["base_url", "baseUrl", "url"]));
    Some(JobSourceRecord {
        id,
        name,
        base_url: (!base_url.is_empty()).then_some(base_url),
    })
}

/// Normalize a job-sources response into validated records.
pub fn normalize_job_sources_response(payload: &Value) -> Vec<JobSourceRecord> {
    let data = payload.get("data").filter(|v| !v.is_null()).unwrap_or(payload);

    let rows = if let Value::Array(items) = data {
        Some(items)
    } else {
        ["data", "items", "sources"]
            .iter()
            .find_map(|k| data.get(k).and_then(Value::as_array))
    };

    rows.map(|items| items.iter().filter_map(normalize_job_source).collect())
        .unwrap_or_default()
}

/// Pick the display name for a grouped source: prefer a variant that already
/// carries an uppercase letter, otherwise title-case the first one.
fn pick_display_name(names: &[String]) -> String {
    let clean: Vec<&str> = names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()).collect();
    let Some(first) = clean.first() else {
        return String::new();
    };

    if let Some(with_upper) = clean.iter().find(|n| n.chars().any(|c| c.is_uppercase())) {
        return (*with_upper).to_string();
    }

    first
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group source rows by case-insensitive name into displayable options,
/// sorted by name. Duplicate rows per board collapse into one option that
/// carries every id.
pub fn group_job_sources(records: Vec<JobSourceRecord>) -> Vec<JobSourceOption> {
    struct Group {
        names: Vec<String>,
        ids: Vec<String>,
        base_url: Option<String>,
    }

    // Insertion-ordered grouping keeps the first-seen name as the fallback.
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Group> = std::collections::HashMap::new();

    for record in records {
        let key = record.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }

        match groups.get_mut(&key) {
            Some(group) => {
                group.names.push(record.name);
                if !group.ids.contains(&record.id) {
                    group.ids.push(record.id);
                }
                if group.base_url.is_none() {
                    group.base_url = record.base_url;
                }
            }
            None => {
                order.push(key.clone());
                groups.insert(
                    key,
                    Group {
                        names: vec![record.name],
                        ids: vec![record.id],
                        base_url: record.base_url,
                    },
                );
            }
        }
    }

    let mut options: Vec<JobSourceOption> = order
        .into_iter()
        .filter_map(|key| {
            let group = groups.remove(&key)?;
            let name = pick_display_name(&group.names);
            Some(JobSourceOption {
                name: if name.is_empty() { key.clone() } else { name },
                key,
                ids: group.ids,
                base_url: group.base_url,
            })
        })
        .collect();

    options.sort_by(|a, b| a.name.cmp(&b.name));
    options
}
