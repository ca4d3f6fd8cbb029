// API-facing gateway for the search gateway crate
// Maps search/popular/recent/suggest parameters onto the search service and statistics

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::pipeline::SearchLogProducer;
use crate::search::{Document, Pagination, SearchBackend, SearchService, DEFAULT_SUGGEST_LIMIT};
use crate::stats::{PopularItem, PopularRecentService, RecentItem, DEFAULT_POPULAR_LIMIT};

/// Items returned by `/popular` and `/recent` when no limit is given
pub const DEFAULT_LIST_LIMIT: i64 = DEFAULT_POPULAR_LIMIT as i64;

/// Query string of `/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub field: Option<String>,
    pub size: Option<i64>,
    /// 1-based page number
    pub page: Option<i64>,
}

/// Query string of `/suggest`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestParams {
    pub prefix: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: Option<String>,
    pub size: usize,
    pub page: usize,
    pub total: u64,
    pub total_pages: u64,
    pub results: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularResponse {
    pub items: Vec<PopularItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentResponse {
    pub items: Vec<RecentItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

/// Entry point used by the HTTP layer
pub struct SearchGateway {
    service: SearchService,
    stats: Arc<PopularRecentService>,
    producer: Option<SearchLogProducer>,
    local_fallback_window: usize,
}

impl SearchGateway {
    pub fn new(
        config: &SearchConfig,
        backend: Arc<dyn SearchBackend>,
        stats: Arc<PopularRecentService>,
    ) -> Self {
        SearchGateway {
            service: SearchService::new(backend, config),
            stats,
            producer: None,
            local_fallback_window: config.local_fallback_window,
        }
    }

    /// Route recorded queries through the search-log pipeline. The consumer
    /// then updates the statistics; an event the channel does not accept is
    /// recorded directly instead.
    pub fn with_producer(mut self, producer: SearchLogProducer) -> Self {
        self.producer = Some(producer);
        self
    }

    pub fn stats(&self) -> &PopularRecentService {
        &self.stats
    }

    /// Record the query, then run one page of the search.
    /// Only a failure of the search itself surfaces as an error.
    pub fn search(&self, params: &SearchParams, user_id: Option<&str>) -> Result<SearchResponse> {
        let q = params.q.as_deref();
        if let Some(q) = q {
            self.record(q, user_id);
        }

        let page = Pagination::new(params.page, params.size);
        let result = self.service.search(
            q,
            params.field.as_deref(),
            i64::try_from(page.size).unwrap_or(i64::MAX),
            i64::try_from(page.from()).unwrap_or(i64::MAX),
        )?;

        Ok(SearchResponse {
            query: params.q.clone(),
            size: page.size,
            page: page.page,
            total: result.total,
            total_pages: page.total_pages(result.total),
            results: result.results,
        })
    }

    pub fn popular(&self, limit: Option<i64>) -> PopularResponse {
        PopularResponse {
            items: self.stats.popular(limit.unwrap_or(DEFAULT_LIST_LIMIT)),
        }
    }

    pub fn recent(&self, limit: Option<i64>) -> RecentResponse {
        RecentResponse {
            items: self.stats.recent(limit.unwrap_or(DEFAULT_LIST_LIMIT)),
        }
    }

    pub fn suggest(&self, params: &SuggestParams) -> SuggestResponse {
        let limit = match params.limit {
            Some(l) if l > 0 => l as usize,
            _ => DEFAULT_SUGGEST_LIMIT,
        };
        SuggestResponse {
            suggestions: self.suggest_keywords(params.prefix.as_deref().unwrap_or(""), limit),
        }
    }

    /// Suggestions for `prefix`, never failing.
    ///
    /// Without a prefix, recent keywords are mixed with popular ones. With a
    /// prefix, the backend is asked first; when it fails or finds nothing the
    /// recent and popular keywords are filtered locally.
    pub fn suggest_keywords(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim();
        let limit_arg = i64::try_from(limit).unwrap_or(i64::MAX);
        if prefix.is_empty() {
            let recent = self.stats.recent(limit_arg).into_iter().map(|r| r.keyword);
            let popular = self.stats.popular(limit_arg).into_iter().map(|p| p.keyword);
            return unique_prefix(recent.chain(popular), limit);
        }

        match self.service.suggest(prefix, limit_arg) {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => {}
            Err(e) => debug!(prefix, error = %e, "backend suggestions failed, using local keywords"),
        }

        let lower = prefix.to_lowercase();
        let window = i64::try_from(self.local_fallback_window).unwrap_or(i64::MAX);
        let recent = self.stats.recent(window).into_iter().map(|r| r.keyword);
        let popular = self.stats.popular(window).into_iter().map(|p| p.keyword);
        let matching = recent
            .chain(popular)
            .filter(|k| k.to_lowercase().starts_with(&lower));
        unique_prefix(matching, limit)
    }

    fn record(&self, q: &str, user_id: Option<&str>) {
        let queued = match &self.producer {
            Some(producer) => producer.send(q, user_id),
            None => false,
        };
        if !queued {
            self.stats.record_query(q);
        }
    }
}

/// First `limit` distinct keywords in encounter order
fn unique_prefix(keywords: impl Iterator<Item = String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .filter(|k| seen.insert(k.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{search_log_channel, SearchLogConsumer};
    use crate::search::{MemoryBackend, MemoryLogSink};
    use serde_json::json;

    fn create_test_gateway(backend: Arc<MemoryBackend>) -> SearchGateway {
        let config = SearchConfig::default().with_recent_capacity(20);
        let stats = Arc::new(PopularRecentService::from_config(&config, backend.clone()));
        SearchGateway::new(&config, backend, stats)
    }

    fn create_test_backend() -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new());
        for i in 0..25 {
            backend
                .add_json("goods", json!({"goods_name": format!("Shoe {}", i), "category": "shoes"}))
                .unwrap();
        }
        backend
    }

    #[test]
    fn test_unique_prefix() {
        let keywords = ["a", "b", "a", "c", "d"].iter().map(|s| s.to_string());
        assert_eq!(unique_prefix(keywords, 3), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_gateway_search_pagination() {
        let gateway = create_test_gateway(create_test_backend());
        let params = SearchParams {
            q: Some("shoe".to_string()),
            size: Some(10),
            page: Some(3),
            ..SearchParams::default()
        };

        let response = gateway.search(&params, None).unwrap();
        assert_eq!(response.total, 25);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 3);
        assert_eq!(response.results.len(), 5);
        assert_eq!(gateway.stats().popular(1)[0].keyword, "shoe");
    }

    #[test]
    fn test_gateway_search_huge_page() {
        let gateway = create_test_gateway(create_test_backend());
        let params = SearchParams {
            q: Some("shoe".to_string()),
            size: Some(10),
            page: Some(i64::MAX),
            ..SearchParams::default()
        };

        let response = gateway.search(&params, None).unwrap();
        assert_eq!(response.total, 25);
        assert!(response.results.is_empty());
        assert_eq!(response.total_pages, 3);
    }

    #[tokio::test]
    async fn test_gateway_records_when_channel_full() {
        let backend = create_test_backend();
        let config = SearchConfig::default().with_recent_capacity(20);
        let stats = Arc::new(PopularRecentService::from_config(&config, backend.clone()));
        let (producer, rx) = search_log_channel(1);
        let gateway = SearchGateway::new(&config, backend.clone(), stats.clone()).with_producer(producer);

        let params = SearchParams {
            q: Some("shoe".to_string()),
            ..SearchParams::default()
        };
        for _ in 0..3 {
            gateway.search(&params, Some("u1")).unwrap();
        }
        // one event waits in the channel, the other two were recorded directly
        assert_eq!(stats.popular(1)[0].count, 2);

        let sink = Arc::new(MemoryLogSink::new(backend, &config.search_log_index));
        let consumer = SearchLogConsumer::new(rx, stats.clone(), sink).spawn();
        drop(gateway);
        assert_eq!(consumer.await.unwrap(), 1);

        assert_eq!(stats.popular(1)[0].count, 3);
        assert_eq!(stats.recent(0).len(), 3);
    }

    #[test]
    fn test_gateway_search_defaults() {
        let gateway = create_test_gateway(create_test_backend());
        let params = SearchParams {
            page: Some(0),
            ..SearchParams::default()
        };

        let response = gateway.search(&params, None).unwrap();
        assert_eq!(response.page, 1);
        assert_eq!(response.size, 10);
        assert_eq!(response.results.len(), 10);
        // nothing to record without a query
        assert!(gateway.stats().recent(0).is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalPages"], 3);
    }

    #[test]
    fn test_gateway_search_empty_index() {
        let backend = Arc::new(MemoryBackend::new());
        backend.create_index("goods");
        let gateway = create_test_gateway(backend);

        let response = gateway.search(&SearchParams::default(), None).unwrap();
        assert_eq!(response.total, 0);
        assert_eq!(response.total_pages, 1);
    }

    #[test]
    fn test_gateway_search_failure_surfaces() {
        let backend = create_test_backend();
        backend.set_available(false);
        let gateway = create_test_gateway(backend);
        assert!(gateway.search(&SearchParams::default(), None).is_err());
        assert_eq!(gateway.popular(None).items.len(), 0);
    }

    #[test]
    fn test_gateway_suggest_mix_without_prefix() {
        let gateway = create_test_gateway(create_test_backend());
        for q in ["shoe", "shoe", "shoe", "hat", "bag", "hat"] {
            gateway.stats().record_query(q);
        }

        let response = gateway.suggest(&SuggestParams { prefix: None, limit: Some(2) });
        assert_eq!(response.suggestions, vec!["hat", "bag"]);

        let response = gateway.suggest(&SuggestParams { prefix: Some("  ".to_string()), limit: None });
        assert_eq!(response.suggestions, vec!["hat", "bag", "shoe"]);
    }

    #[test]
    fn test_gateway_suggest_local_fallback() {
        let backend = create_test_backend();
        let gateway = create_test_gateway(backend.clone());
        for q in ["Hat", "hammer", "shoe", "handbag"] {
            gateway.stats().record_query(q);
        }

        // nothing in the index starts with "ha"
        let out = gateway.suggest_keywords("HA", 2);
        assert_eq!(out, vec!["handbag", "hammer"]);

        backend.set_available(false);
        let out = gateway.suggest_keywords("sh", 5);
        assert_eq!(out, vec!["shoe"]);
    }

    #[test]
    fn test_gateway_suggest_uses_backend() {
        let gateway = create_test_gateway(create_test_backend());
        gateway.stats().record_query("shoelace");

        let out = gateway.suggest_keywords("shoe 1", 3);
        assert_eq!(out, vec!["Shoe 1", "Shoe 10", "Shoe 11"]);
    }
}
