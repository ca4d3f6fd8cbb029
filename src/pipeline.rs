// Search-log pipeline for the search gateway
// Moves keyword events from the API to the statistics and the persisted search log

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::stats::PopularRecentService;

/// User recorded when the caller is not identified
pub const ANONYMOUS_USER: &str = "anonymous";

/// A submitted search, as persisted in the search-log index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEvent {
    pub user_id: String,
    pub keyword: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl SearchLogEvent {
    /// Build an event for `keyword`; `None` for a blank keyword
    pub fn new(keyword: &str, user_id: Option<&str>) -> Option<Self> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return None;
        }
        Some(SearchLogEvent {
            user_id: user_id.unwrap_or(ANONYMOUS_USER).to_string(),
            keyword: keyword.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Durable destination of search-log events
pub trait EventSink: Send + Sync {
    fn persist(&self, event: &SearchLogEvent) -> Result<()>;
}

/// Create a bounded channel between producers and one consumer
pub fn search_log_channel(buffer: usize) -> (SearchLogProducer, mpsc::Receiver<SearchLogEvent>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (SearchLogProducer { tx }, rx)
}

/// Sending half of the search-log channel; cheap to clone
#[derive(Clone)]
pub struct SearchLogProducer {
    tx: mpsc::Sender<SearchLogEvent>,
}

impl SearchLogProducer {
    /// Send without waiting. Blank keywords are skipped; a full or closed
    /// channel is logged and the event dropped. Returns whether it was queued.
    pub fn send(&self, keyword: &str, user_id: Option<&str>) -> bool {
        let Some(event) = SearchLogEvent::new(keyword, user_id) else {
            return false;
        };

        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                error!(keyword, error = %e, "failed to queue search log event");
                false
            }
        }
    }

    /// Send, waiting for channel capacity. Same skipping rules as `send`.
    pub async fn send_async(&self, keyword: &str, user_id: Option<&str>) -> bool {
        let Some(event) = SearchLogEvent::new(keyword, user_id) else {
            return false;
        };

        match self.tx.send(event).await {
            Ok(()) => true,
            Err(e) => {
                error!(keyword, error = %e, "failed to queue search log event");
                false
            }
        }
    }
}

/// Receiving half: updates statistics and persists every event
pub struct SearchLogConsumer {
    rx: mpsc::Receiver<SearchLogEvent>,
    stats: Arc<PopularRecentService>,
    sink: Arc<dyn EventSink>,
}

impl SearchLogConsumer {
    pub fn new(
        rx: mpsc::Receiver<SearchLogEvent>,
        stats: Arc<PopularRecentService>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        SearchLogConsumer { rx, stats, sink }
    }

    /// Consume until every producer is dropped. Returns the number of events handled.
    pub async fn run(mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.rx.recv().await {
            if self.handle(&event) {
                handled += 1;
            }
        }
        info!(handled, "search log consumer stopped");
        handled
    }

    /// Run on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }

    /// Record one event; failures are logged and never stop consumption
    pub fn handle(&self, event: &SearchLogEvent) -> bool {
        if event.keyword.trim().is_empty() {
            warn!(user_id = %event.user_id, "blank search log keyword received");
            return false;
        }

        self.stats.record_query(&event.keyword);

        if let Err(e) = self.sink.persist(event) {
            error!(keyword = %event.keyword, user_id = %event.user_id, error = %e, "failed to persist search log");
            return true;
        }

        info!(
            keyword = %event.keyword,
            user_id = %event.user_id,
            timestamp = event.timestamp,
            "search log processed"
        );
        true
    }
}
