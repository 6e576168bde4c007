//! Data model types shared across the client.

mod connection_options;
mod connection_state;
mod events;
mod filters;
mod job;
mod messages;
mod page;
mod source;

pub use connection_options::ConnectionOptions;
pub use connection_state::ConnectionState;
pub use events::JobsUpdatedEvent;
pub use filters::{JobFilters, PageKey};
pub use job::JobRecord;
pub use messages::ClientMessage;
pub use page::JobsPage;
pub use source::{source_label_from_url, JobSourceOption, JobSourceRecord, SourceKind};
