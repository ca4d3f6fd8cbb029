// Popular query module for the search gateway
// Concurrent keyword -> occurrence counter

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Concurrent frequency table.
///
/// Counts only grow and entries are never evicted. Each key is updated with a
/// single atomic increment; there is no table-wide lock.
#[derive(Default)]
pub struct FrequencyTable {
    counts: DashMap<String, AtomicU64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        FrequencyTable {
            counts: DashMap::new(),
        }
    }

    /// Increment `keyword`, inserting it with count 1 when absent. Returns the new count.
    pub fn increment(&self, keyword: &str) -> u64 {
        if let Some(counter) = self.counts.get(keyword) {
            return counter.fetch_add(1, Ordering::Relaxed) + 1;
        }
        self.counts
            .entry(keyword.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    pub fn count(&self, keyword: &str) -> u64 {
        self.counts
            .get(keyword)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Top `limit` keywords by count descending; equal counts sort by keyword
    pub fn top(&self, limit: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }

    /// Number of distinct keywords
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
