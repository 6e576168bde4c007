use serde::Serialize;
use std::fmt;

/// One raw job-source row from the backend catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSourceRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// A displayable source option.
///
/// The backend may carry several source rows per board (one per ingestion
/// run); rows sharing a case-insensitive name are grouped into one option
/// carrying all of their ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSourceOption {
    /// Lower-cased grouping key.
    pub key: String,
    /// Display name picked from the grouped rows.
    pub name: String,
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Known job boards, classified from a posting's source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    LinkedIn,
    Glassdoor,
    Glints,
    Indeed,
    JobStreet,
    Kalibrr,
    GoogleJobs,
    Unknown,
}

/// Domain rules for the known boards.
const SOURCE_RULES: &[(SourceKind, &[&str])] = &[
    (SourceKind::LinkedIn, &["linkedin.com"]),
    (SourceKind::Glassdoor, &["glassdoor.com"]),
    (SourceKind::Glints, &["glints.com"]),
    (SourceKind::Indeed, &["indeed.com", "id.indeed.com"]),
    (SourceKind::JobStreet, &["jobstreet.co.id", "jobstreet.com"]),
    (SourceKind::Kalibrr, &["kalibrr.com"]),
    (SourceKind::GoogleJobs, &["google.com"]),
];

impl SourceKind {
    /// Display label for the board.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::LinkedIn => "LinkedIn",
            SourceKind::Glassdoor => "Glassdoor",
            SourceKind::Glints => "Glints",
            SourceKind::Indeed => "Indeed",
            SourceKind::JobStreet => "JobStreet",
            SourceKind::Kalibrr => "Kalibrr",
            SourceKind::GoogleJobs => "Google Jobs",
            SourceKind::Unknown => "Unknown",
        }
    }

    /// Classify a posting's source URL into a known board.
    ///
    /// Falls back to [`SourceKind::Unknown`] for absent, unparseable or
    /// unrecognized hosts; [`source_label_from_url`] can still guess a brand
    /// name for those.
    pub fn from_url(source_url: Option<&str>) -> Self {
        let Some(hostname) = hostname_of(source_url) else {
            return SourceKind::Unknown;
        };

        for (kind, domains) in SOURCE_RULES {
            if domains.iter().any(|d| matches_domain(&hostname, d)) {
                return *kind;
            }
        }
        SourceKind::Unknown
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Best-effort display label for a source URL: the known board name, or a
/// brand guessed from the hostname.
pub fn source_label_from_url(source_url: Option<&str>) -> String {
    let kind = SourceKind::from_url(source_url);
    if kind != SourceKind::Unknown {
        return kind.label().to_string();
    }
    match hostname_of(source_url) {
        Some(hostname) => {
            let guessed = guess_brand_from_hostname(&hostname);
            if guessed.is_empty() {
                "Unknown".to_string()
            } else {
                guessed
            }
        }
        None => "Unknown".to_string(),
    }
}

fn hostname_of(source_url: Option<&str>) -> Option<String> {
    let raw = source_url.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return None;
    }

    let host = match url::Url::parse(raw) {
        Ok(u) => u.host_str().map(|h| h.to_string()),
        // Tolerate scheme-less URLs: take everything up to the first slash.
        Err(_) => raw
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('/')
            .next()
            .map(|h| h.to_string()),
    };

    host.map(|h| normalize_hostname(&h)).filter(|h| !h.is_empty())
}

fn normalize_hostname(hostname: &str) -> String {
    let h = hostname.trim().to_lowercase();
    h.strip_prefix("www.").unwrap_or(&h).to_string()
}

fn matches_domain(hostname: &str, domain: &str) -> bool {
    let d = normalize_hostname(domain);
    hostname == d || hostname.ends_with(&format!(".{}", d))
}

fn is_id_second_level_tld(part: &str) -> bool {
    matches!(part, "co" | "ac" | "go" | "or" | "sch")
}

fn title_case(value: &str) -> String {
    value
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Guess a brand name from an unrecognized hostname, accounting for
/// Indonesian second-level TLDs (`jobstreet.co.id` style hosts).
fn guess_brand_from_hostname(hostname: &str) -> String {
    let parts: Vec<&str> = hostname.split('.').filter(|p| !p.is_empty()).collect();
    if parts.len() <= 1 {
        return title_case(parts.first().unwrap_or(&""));
    }

    let last = parts[parts.len() - 1];
    let second_last = parts[parts.len() - 2];

    if last == "id" && is_id_second_level_tld(second_last) && parts.len() >= 3 {
        return title_case(parts[parts.len() - 3]);
    }

    title_case(second_last)
}
