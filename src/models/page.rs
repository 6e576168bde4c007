use serde::Serialize;

use super::job::JobRecord;

/// One page of normalized job results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobsPage {
    pub items: Vec<JobRecord>,
    /// Total matching rows across all pages, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl JobsPage {
    pub fn new(items: Vec<JobRecord>, total: Option<u64>) -> Self {
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
