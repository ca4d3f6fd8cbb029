// Error types for the search gateway

/// Errors raised by the search backend, the event sink or configuration loading.
///
/// Blank queries and non-positive sizes are never errors: they are normalized
/// to defaults before any request is built. An empty result set is not an
/// error either.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The backend could not serve the request (network, 5xx, timeout, outage).
    #[error("search backend unavailable during {operation}: {reason}")]
    BackendUnavailable {
        operation: &'static str,
        reason: String,
    },

    /// The requested index does not exist on the backend.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// The search-log sink rejected an event.
    #[error("event sink failed: {0}")]
    Sink(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    pub fn unavailable(operation: &'static str, reason: impl Into<String>) -> Self {
        SearchError::BackendUnavailable {
            operation,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
