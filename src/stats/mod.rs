// Popular/recent statistics module for the search gateway
// In-memory ring and counters, optionally backed by the persisted search log

mod popular;
mod recent;
mod source;

pub use popular::*;
pub use recent::*;
pub use source::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SearchConfig;
use crate::search::SearchBackend;

/// Popular keywords returned when the caller gives no positive limit
pub const DEFAULT_POPULAR_LIMIT: usize = 10;

/// Keyword with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularItem {
    pub keyword: String,
    pub count: u64,
}

/// Keyword with the time it was searched (epoch milliseconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentItem {
    pub keyword: String,
    pub ts: i64,
}

/// Popular and recent query tracking.
///
/// One instance is built at startup and shared by every request handler and
/// by the search-log consumer. The statistics source is chosen once from the
/// configuration: live only, or durable with live recovery. Reads never fail;
/// a durable failure degrades to in-memory data.
pub struct PopularRecentService {
    live: Arc<LiveStats>,
    source: Arc<dyn StatsSource>,
}

impl PopularRecentService {
    /// In-memory statistics only
    pub fn live(capacity: usize) -> Self {
        let live = Arc::new(LiveStats::new(capacity));
        PopularRecentService {
            source: live.clone(),
            live,
        }
    }

    /// Durable statistics from `index`, recovering with in-memory data
    pub fn durable(backend: Arc<dyn SearchBackend>, index: &str, capacity: usize) -> Self {
        let live = Arc::new(LiveStats::new(capacity));
        let durable = Arc::new(DurableStats::new(backend, index));
        PopularRecentService {
            source: Arc::new(Fallback::new(durable, live.clone())),
            live,
        }
    }

    /// Pick the strategy from `config.durable_stats`
    pub fn from_config(config: &SearchConfig, backend: Arc<dyn SearchBackend>) -> Self {
        if config.durable_stats {
            PopularRecentService::durable(backend, &config.search_log_index, config.recent_capacity)
        } else {
            PopularRecentService::live(config.recent_capacity)
        }
    }

    /// Record a query. Blank input is ignored; the keyword is trimmed.
    pub fn record_query(&self, text: &str) {
        self.source.record_query(text);
    }

    /// Top keywords; `limit <= 0` means `DEFAULT_POPULAR_LIMIT`
    pub fn popular(&self, limit: i64) -> Vec<PopularItem> {
        let limit = if limit <= 0 { DEFAULT_POPULAR_LIMIT } else { limit as usize };
        self.source.popular(limit).unwrap_or_else(|e| {
            warn!(source = self.source.name(), error = %e, "popular keywords unavailable");
            Vec::new()
        })
    }

    /// Latest queries; `limit <= 0` means the ring capacity, larger limits are clamped to it
    pub fn recent(&self, limit: i64) -> Vec<RecentItem> {
        let capacity = self.capacity();
        let limit = if limit <= 0 { capacity } else { (limit as usize).min(capacity) };
        self.source.recent(limit).unwrap_or_else(|e| {
            warn!(source = self.source.name(), error = %e, "recent keywords unavailable");
            Vec::new()
        })
    }

    /// Capacity of the recency ring
    pub fn capacity(&self) -> usize {
        self.live.ring().capacity()
    }

    /// Name of the configured source ("live" or "durable")
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// In-memory statistics, regardless of the configured source
    pub fn live_stats(&self) -> &LiveStats {
        &self.live
    }
}
