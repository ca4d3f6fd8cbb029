// Statistics sources for the search gateway
// Live (in-process) and durable (search-log index) sources behind one trait

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use super::popular::FrequencyTable;
use super::recent::{QueryEvent, RecencyRing};
use super::{PopularItem, RecentItem};
use crate::error::Result;
use crate::search::{SearchBackend, SortOrder};

/// Aggregated field of the search-log index used for popularity
pub const KEYWORD_TERMS_FIELD: &str = "keyword.keyword";
/// Event time field of the search-log index
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A provider of popular/recent query statistics
pub trait StatsSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Record a query; must never fail
    fn record_query(&self, keyword: &str);

    /// Top `limit` keywords by count
    fn popular(&self, limit: usize) -> Result<Vec<PopularItem>>;

    /// Latest `limit` queries, newest first
    fn recent(&self, limit: usize) -> Result<Vec<RecentItem>>;
}

/// In-process statistics: recency ring plus frequency table
pub struct LiveStats {
    ring: RecencyRing,
    table: FrequencyTable,
}

impl LiveStats {
    pub fn new(capacity: usize) -> Self {
        LiveStats {
            ring: RecencyRing::new(capacity),
            table: FrequencyTable::new(),
        }
    }

    pub fn ring(&self) -> &RecencyRing {
        &self.ring
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }
}

impl StatsSource for LiveStats {
    fn name(&self) -> &'static str {
        "live"
    }

    fn record_query(&self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return;
        }
        self.table.increment(keyword);
        self.ring.push(QueryEvent::now(keyword));
    }

    fn popular(&self, limit: usize) -> Result<Vec<PopularItem>> {
        Ok(self
            .table
            .top(limit)
            .into_iter()
            .map(|(keyword, count)| PopularItem { keyword, count })
            .collect())
    }

    fn recent(&self, limit: usize) -> Result<Vec<RecentItem>> {
        Ok(self
            .ring
            .latest(limit)
            .into_iter()
            .map(|event| RecentItem {
                keyword: event.keyword().to_string(),
                ts: event.timestamp(),
            })
            .collect())
    }
}

/// Statistics aggregated by the backend over the persisted search log.
///
/// Events reach the search log through the pipeline, so recording here is a no-op.
pub struct DurableStats {
    backend: Arc<dyn SearchBackend>,
    index: String,
}

impl DurableStats {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        DurableStats {
            backend,
            index: index.into(),
        }
    }
}

impl StatsSource for DurableStats {
    fn name(&self) -> &'static str {
        "durable"
    }

    fn record_query(&self, _keyword: &str) {}

    fn popular(&self, limit: usize) -> Result<Vec<PopularItem>> {
        let buckets = self
            .backend
            .terms_aggregation(&self.index, KEYWORD_TERMS_FIELD, limit)?;
        let items: Vec<PopularItem> = buckets
            .into_iter()
            .map(|b| PopularItem {
                keyword: b.term,
                count: b.count,
            })
            .collect();

        info!(index = %self.index, count = items.len(), "durable popular keywords");
        Ok(items)
    }

    fn recent(&self, limit: usize) -> Result<Vec<RecentItem>> {
        let docs = self
            .backend
            .sorted_search(&self.index, TIMESTAMP_FIELD, SortOrder::Desc, limit)?;
        let items: Vec<RecentItem> = docs
            .iter()
            .filter_map(|doc| {
                let keyword = doc.get("keyword").and_then(Value::as_str)?;
                let ts = doc.get(TIMESTAMP_FIELD).and_then(Value::as_i64).unwrap_or(0);
                Some(RecentItem {
                    keyword: keyword.to_string(),
                    ts,
                })
            })
            .collect();

        info!(index = %self.index, count = items.len(), "durable recent keywords");
        Ok(items)
    }
}

/// Serves reads from `primary` and recovers from its failures with `fallback`.
/// Records go to both.
pub struct Fallback {
    primary: Arc<dyn StatsSource>,
    fallback: Arc<dyn StatsSource>,
}

impl Fallback {
    pub fn new(primary: Arc<dyn StatsSource>, fallback: Arc<dyn StatsSource>) -> Self {
        Fallback { primary, fallback }
    }
}

impl StatsSource for Fallback {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn record_query(&self, keyword: &str) {
        self.primary.record_query(keyword);
        self.fallback.record_query(keyword);
    }

    fn popular(&self, limit: usize) -> Result<Vec<PopularItem>> {
        self.primary.popular(limit).or_else(|e| {
            error!(
                source = self.primary.name(),
                error = %e,
                "popular keyword lookup failed, using {} statistics",
                self.fallback.name()
            );
            self.fallback.popular(limit)
        })
    }

    fn recent(&self, limit: usize) -> Result<Vec<RecentItem>> {
        self.primary.recent(limit).or_else(|e| {
            error!(
                source = self.primary.name(),
                error = %e,
                "recent keyword lookup failed, using {} statistics",
                self.fallback.name()
            );
            self.fallback.recent(limit)
        })
    }
}
