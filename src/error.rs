//! Error types for the skillsync-link client.

use thiserror::Error;

/// Errors returned by skillsync-link operations.
#[derive(Error, Debug)]
pub enum SkillSyncError {
    /// Invalid client configuration (missing or malformed URLs, bad options).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// WebSocket transport or protocol failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An operation did not complete within its configured timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// HTTP transport failure (connection, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Server error {status_code}: {message}")]
    Server { status_code: u16, message: String },

    /// JSON encode/decode failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invariant violation inside the client itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using [`SkillSyncError`].
pub type Result<T> = std::result::Result<T, SkillSyncError>;
