// Search backend interface for the search gateway
// The ranked full-text index is reached only through this trait

use serde::{Deserialize, Serialize};

use super::query::SearchRequest;
use crate::error::Result;

/// Opaque document record: field name -> value
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Total hit count plus the requested page of hits, in rank order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<Document>,
}

/// One bucket of a terms aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermBucket {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Capabilities the core needs from the search backend.
///
/// Calls are synchronous and may block on I/O; timeouts and cancellation are
/// the implementation's concern.
pub trait SearchBackend: Send + Sync {
    /// Run a query and return the total hit count and the requested page
    fn search(&self, request: &SearchRequest) -> Result<SearchHits>;

    /// Completion suggestions for `prefix` from a completion field, duplicates skipped
    fn completion_suggest(
        &self,
        index: &str,
        field: &str,
        prefix: &str,
        size: usize,
    ) -> Result<Vec<String>>;

    /// Top `size` values of `field` ordered by document count descending
    fn terms_aggregation(&self, index: &str, field: &str, size: usize) -> Result<Vec<TermBucket>>;

    /// First `size` documents of the index ordered by `sort_field`
    fn sorted_search(
        &self,
        index: &str,
        sort_field: &str,
        order: SortOrder,
        size: usize,
    ) -> Result<Vec<Document>>;
}
