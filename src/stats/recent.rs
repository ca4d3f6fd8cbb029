// Recent query module for the search gateway
// Bounded ring of the latest recorded queries, newest first

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Upper bound on slots allocated up front; larger rings grow on demand
const PREALLOCATE_LIMIT: usize = 1024;

/// A recorded query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEvent {
    keyword: String,
    timestamp: i64,
}

impl QueryEvent {
    /// `keyword` must already be trimmed and non-empty
    pub fn new(keyword: impl Into<String>, timestamp: i64) -> Self {
        QueryEvent {
            keyword: keyword.into(),
            timestamp,
        }
    }

    /// Event stamped with the current time in epoch milliseconds
    pub fn now(keyword: impl Into<String>) -> Self {
        QueryEvent::new(keyword, chrono::Utc::now().timestamp_millis())
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Fixed-capacity, insertion-ordered buffer of query events.
///
/// Push and eviction happen under one lock, so every recorded event appears
/// exactly once and leaves in FIFO order. Events are not deduplicated.
pub struct RecencyRing {
    events: Mutex<VecDeque<QueryEvent>>,
    capacity: usize,
}

impl RecencyRing {
    /// Create a ring; a zero capacity is raised to 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RecencyRing {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT))),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest events beyond capacity
    pub fn push(&self, event: QueryEvent) {
        let mut events = self.events.lock();
        events.push_front(event);
        while events.len() > self.capacity {
            events.pop_back();
        }
    }

    /// Up to `limit` events, newest first
    pub fn latest(&self, limit: usize) -> Vec<QueryEvent> {
        self.events.lock().iter().take(limit).cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
