//! # skillsync-link: SkillSync jobs client library
//!
//! A client SDK for the SkillSync job-matching backend. Provides REST
//! queries over the jobs catalog plus a live "jobs updated" feed over one
//! shared, auto-reconnecting WebSocket connection.
//!
//! ## Features
//!
//! - **Job queries**: filterable, paginated job listings with tolerant
//!   payload normalization and automatic retry of transient HTTP failures
//! - **Live updates**: keyword-scoped push subscriptions multiplexed over a
//!   single heartbeat-monitored connection with capped-backoff reconnect
//! - **Incremental reconciliation**: new records merge into the displayed
//!   page by id, without disturbing pagination or applied filters
//! - **Transient signals**: auto-expiring "N new jobs" banner, row
//!   highlights and search status for UI consumers
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use skillsync_link::SkillSyncClient;
//!
//! #[tokio::main]
//! async fn main() -> skillsync_link::Result<()> {
//!     let client = SkillSyncClient::builder()
//!         .api_base_url("https://api.skillsync.example")
//!         .ws_url("wss://api.skillsync.example/ws/jobs")
//!         .build()?;
//!
//!     let mut controller = client.controller();
//!     controller.draft_mut().title = "backend engineer".to_string();
//!     controller.apply().await?;
//!
//!     for job in &controller.current_page().unwrap().items {
//!         println!("{} at {}", job.title, job.company_name);
//!     }
//!
//!     // Reconcile live events as they arrive.
//!     while controller.pump_event().await {
//!         println!("{} new jobs", controller.signals().banner_count());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Endpoints can also come from the environment: `SKILLSYNC_API_URL` for
//! REST and `SKILLSYNC_WS_URL` for the push channel. Leaving the push URL
//! unset disables live updates without error; browsing still works.

pub mod client;
pub mod connection;
pub mod controller;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod normalize;
pub mod query;
pub mod signals;
pub mod store;
pub mod subscription;
pub mod timeouts;

// Re-export main types for convenience
pub use client::{SkillSyncClient, SkillSyncClientBuilder};
pub use connection::{jobs_topic, SharedConnection, SubscriberId};
pub use controller::{FilterDraft, JobsController};
pub use error::{Result, SkillSyncError};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use models::{
    ConnectionOptions, ConnectionState, JobFilters, JobRecord, JobSourceOption, JobsPage,
    JobsUpdatedEvent, PageKey, SourceKind,
};
pub use query::{HttpJobsBackend, JobsBackend};
pub use signals::{SearchStatus, TransientSignals};
pub use store::{JobStore, MergeOutcome};
pub use subscription::JobsSubscription;
pub use timeouts::SkillSyncTimeouts;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
