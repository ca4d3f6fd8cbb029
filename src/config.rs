// Configuration for the search gateway
// Values come from JSON or from environment variables; every field has a default

use serde::Deserialize;

use crate::error::{Result, SearchError};

/// Runtime configuration consumed by the search service and the stats facade
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Product index searched by `/search` and `/suggest`
    #[serde(default = "default_index")]
    pub index: String,
    /// Index holding persisted search-log events
    #[serde(default = "default_search_log_index")]
    pub search_log_index: String,
    /// Completion field used by the first suggestion stage
    #[serde(default = "default_suggest_field")]
    pub suggest_field: String,
    /// Text field projected when a hit has no display name
    #[serde(default = "default_suggest_text_field")]
    pub suggest_text_field: String,
    /// Read popular/recent statistics from the search-log index
    #[serde(default)]
    pub durable_stats: bool,
    /// Capacity of the in-memory recency ring
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    /// How many recent and popular keywords the local suggest fallback scans
    #[serde(default = "default_local_fallback_window")]
    pub local_fallback_window: usize,
}

fn default_index() -> String { "goods".into() }
fn default_search_log_index() -> String { "search_log".into() }
fn default_suggest_field() -> String { "suggest".into() }
fn default_suggest_text_field() -> String { "goods_name".into() }
fn default_recent_capacity() -> usize { 100 }
fn default_local_fallback_window() -> usize { 50 }

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            index: default_index(),
            search_log_index: default_search_log_index(),
            suggest_field: default_suggest_field(),
            suggest_text_field: default_suggest_text_field(),
            durable_stats: false,
            recent_capacity: default_recent_capacity(),
            local_fallback_window: default_local_fallback_window(),
        }
    }
}

impl SearchConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(data: &str) -> Result<Self> {
        let config: SearchConfig =
            serde_json::from_str(data).map_err(|e| SearchError::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Read configuration from `SEARCH_*` environment variables
    pub fn from_env() -> Self {
        let defaults = SearchConfig::default();
        let index = std::env::var("SEARCH_INDEX").unwrap_or(defaults.index);
        let search_log_index =
            std::env::var("SEARCH_LOG_INDEX").unwrap_or(defaults.search_log_index);
        let suggest_field =
            std::env::var("SEARCH_SUGGEST_FIELD").unwrap_or(defaults.suggest_field);
        let suggest_text_field =
            std::env::var("SEARCH_SUGGEST_TEXT_FIELD").unwrap_or(defaults.suggest_text_field);
        let durable_stats = std::env::var("SEARCH_DURABLE_STATS")
            .ok()
            .and_then(|s| parse_flag(&s))
            .unwrap_or(defaults.durable_stats);
        let recent_capacity = std::env::var("SEARCH_RECENT_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.recent_capacity);
        let local_fallback_window = std::env::var("SEARCH_LOCAL_FALLBACK_WINDOW")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.local_fallback_window);

        SearchConfig {
            index,
            search_log_index,
            suggest_field,
            suggest_text_field,
            durable_stats,
            recent_capacity,
            local_fallback_window,
        }
        .normalized()
    }

    /// Builder-style switch for the durable statistics source
    pub fn with_durable_stats(mut self, enabled: bool) -> Self {
        self.durable_stats = enabled;
        self
    }

    pub fn with_recent_capacity(mut self, capacity: usize) -> Self {
        self.recent_capacity = capacity;
        self.normalized()
    }

    // A ring must hold at least one event.
    fn normalized(mut self) -> Self {
        self.recent_capacity = self.recent_capacity.max(1);
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
