// Search service module for the search gateway
// Executes built queries against the backend and resolves prefix suggestions

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info};

use super::backend::{Document, SearchBackend};
use super::query::{QueryBuilder, SearchRequest, GOODS_NAME};
use crate::config::SearchConfig;
use crate::error::Result;

/// Suggestions returned when the caller gives no positive limit
pub const DEFAULT_SUGGEST_LIMIT: usize = 8;

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub total: u64,
    pub results: Vec<Document>,
}

/// Runs searches and two-stage prefix suggestions against one index
pub struct SearchService {
    backend: Arc<dyn SearchBackend>,
    builder: QueryBuilder,
    suggest_field: String,
    suggest_text_field: String,
}

impl SearchService {
    pub fn new(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        SearchService {
            backend,
            builder: QueryBuilder::new(config.index.clone()),
            suggest_field: config.suggest_field.clone(),
            suggest_text_field: config.suggest_text_field.clone(),
        }
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Build and execute a search. Backend errors propagate; there is no retry here.
    pub fn search(
        &self,
        keyword: Option<&str>,
        field: Option<&str>,
        size: i64,
        from: i64,
    ) -> Result<SearchResult> {
        let request = self.builder.build_search(keyword, field, size, from);
        log_request("search", &request);

        let started = Instant::now();
        let hits = self.backend.search(&request)?;
        info!(
            operation = "search",
            total = hits.total,
            returned = hits.hits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search backend response"
        );

        Ok(SearchResult {
            total: hits.total,
            results: hits.hits,
        })
    }

    /// Prefix suggestions.
    ///
    /// Completion on the suggest field is tried first and any failure there is
    /// ignored. When it yields nothing, a phrase-prefix search over the product
    /// names runs instead; errors from that stage propagate.
    pub fn suggest(&self, prefix: &str, limit: i64) -> Result<Vec<String>> {
        let prefix = prefix.trim();
        let size = if limit <= 0 { DEFAULT_SUGGEST_LIMIT } else { limit as usize };
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        match self.complete(prefix, size) {
            Ok(found) if !found.is_empty() => return Ok(found),
            Ok(_) => {}
            Err(e) => debug!(prefix, error = %e, "completion suggest failed, using prefix search"),
        }

        self.prefix_search(prefix, size)
    }

    fn complete(&self, prefix: &str, size: usize) -> Result<Vec<String>> {
        debug!(operation = "suggest-completion", field = %self.suggest_field, prefix, size);

        let started = Instant::now();
        let options = self.backend.completion_suggest(
            self.builder.index(),
            &self.suggest_field,
            prefix,
            size,
        )?;

        let mut out: Vec<String> = Vec::new();
        for text in options {
            if text.is_empty() || out.contains(&text) {
                continue;
            }
            out.push(text);
            if out.len() >= size {
                break;
            }
        }

        info!(
            operation = "suggest-completion",
            returned = out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search backend response"
        );
        Ok(out)
    }

    fn prefix_search(&self, prefix: &str, size: usize) -> Result<Vec<String>> {
        let request = self.builder.build_prefix(prefix, size, &self.suggest_text_field);
        log_request("suggest-fallback", &request);

        let started = Instant::now();
        let hits = self.backend.search(&request)?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for hit in &hits.hits {
            let Some(text) = display_text(hit, &self.suggest_text_field) else {
                continue;
            };
            if seen.insert(text.to_string()) {
                out.push(text.to_string());
            }
        }
        out.truncate(size);

        info!(
            operation = "suggest-fallback",
            total = hits.total,
            returned = out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search backend response"
        );
        Ok(out)
    }
}

/// Display name of a hit, or the configured text field when the name is absent
fn display_text<'a>(hit: &'a Document, text_field: &str) -> Option<&'a str> {
    let value = match hit.get(GOODS_NAME) {
        Some(v) if !v.is_null() => v,
        _ => hit.get(text_field)?,
    };
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn log_request(operation: &str, request: &SearchRequest) {
    debug!(
        operation,
        index = %request.index,
        from = request.from,
        size = request.size,
        query_kind = request.query.kind(),
        "search backend request"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::search::backend::{SearchHits, SortOrder, TermBucket};
    use crate::search::query::{Query, GOODS_NAME_CHOSUNG};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Backend returning canned answers; `None` means the call fails
    struct StubBackend {
        completions: Option<Vec<String>>,
        hits: Option<Vec<Document>>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl StubBackend {
        fn new(completions: Option<Vec<&str>>, hits: Option<Vec<Value>>) -> Self {
            StubBackend {
                completions: completions.map(|c| c.into_iter().map(str::to_string).collect()),
                hits: hits.map(|h| {
                    h.into_iter()
                        .filter_map(|v| v.as_object().cloned())
                        .collect()
                }),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl SearchBackend for StubBackend {
        fn search(&self, request: &SearchRequest) -> Result<SearchHits> {
            self.requests.lock().push(request.clone());
            match &self.hits {
                Some(hits) => Ok(SearchHits {
                    total: hits.len() as u64,
                    hits: hits.clone(),
                }),
                None => Err(SearchError::unavailable("search", "stub down")),
            }
        }

        fn completion_suggest(&self, _: &str, _: &str, _: &str, _: usize) -> Result<Vec<String>> {
            self.completions
                .clone()
                .ok_or_else(|| SearchError::unavailable("completion_suggest", "stub down"))
        }

        fn terms_aggregation(&self, _: &str, _: &str, _: usize) -> Result<Vec<TermBucket>> {
            Ok(Vec::new())
        }

        fn sorted_search(&self, _: &str, _: &str, _: SortOrder, _: usize) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }
    }

    fn create_test_service(backend: Arc<StubBackend>) -> SearchService {
        SearchService::new(backend, &SearchConfig::default())
    }

    #[test]
    fn test_search_passes_window_and_returns_hits() {
        let backend = Arc::new(StubBackend::new(None, Some(vec![json!({"goods_name": "Shoe"})])));
        let service = create_test_service(backend.clone());

        let result = service.search(Some("shoe"), None, 10, 20).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.results[0]["goods_name"], "Shoe");

        let requests = backend.requests.lock();
        assert_eq!(requests[0].index, "goods");
        assert_eq!(requests[0].from, 20);
        assert_eq!(requests[0].query.kind(), "multi_match");
    }

    #[test]
    fn test_search_propagates_backend_error() {
        let backend = Arc::new(StubBackend::new(None, None));
        let service = create_test_service(backend);
        assert!(service.search(Some("shoe"), None, 10, 0).is_err());
    }

    #[test]
    fn test_suggest_blank_prefix() {
        let backend = Arc::new(StubBackend::new(Some(vec!["abc"]), Some(vec![])));
        let service = create_test_service(backend.clone());
        assert!(service.suggest("   ", 5).unwrap().is_empty());
        assert!(backend.requests.lock().is_empty());
    }

    #[test]
    fn test_suggest_completion_dedup_and_limit() {
        let backend = Arc::new(StubBackend::new(Some(vec!["abc", "abc", "abd"]), None));
        let service = create_test_service(backend.clone());

        let out = service.suggest("ab", 2).unwrap();
        assert_eq!(out, vec!["abc", "abd"]);
        // completion answered, so no prefix search ran
        assert!(backend.requests.lock().is_empty());
    }

    #[test]
    fn test_suggest_falls_back_when_completion_fails() {
        let backend = Arc::new(StubBackend::new(
            None,
            Some(vec![
                json!({"goods_name": "Shoe Rack"}),
                json!({"goods_name": "Shoe Rack"}),
                json!({"goods_name": null, "goods_name_text": "Shoe Horn"}),
                json!({"goods_name": "  "}),
                json!({"goods_name": "Shoe Box"}),
            ]),
        ));
        let config = SearchConfig {
            suggest_text_field: "goods_name_text".to_string(),
            ..SearchConfig::default()
        };
        let service = SearchService::new(backend.clone(), &config);

        let out = service.suggest("sho", 2).unwrap();
        assert_eq!(out, vec!["Shoe Rack", "Shoe Horn"]);

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].size, 2);
        assert!(matches!(requests[0].query, Query::Bool { .. }));
    }

    #[test]
    fn test_suggest_chosung_prefix_queries_chosung_field() {
        let backend = Arc::new(StubBackend::new(Some(vec![]), Some(vec![json!({"goods_name": "신발"})])));
        let service = create_test_service(backend.clone());

        let out = service.suggest("ㅅㅂ", 0).unwrap();
        assert_eq!(out, vec!["신발"]);

        let requests = backend.requests.lock();
        assert_eq!(requests[0].size, DEFAULT_SUGGEST_LIMIT);
        assert_eq!(
            requests[0].query,
            Query::PhrasePrefix {
                field: GOODS_NAME_CHOSUNG.to_string(),
                query: "ㅅㅂ".to_string(),
            }
        );
    }

    #[test]
    fn test_suggest_fallback_error_propagates() {
        let backend = Arc::new(StubBackend::new(None, None));
        let service = create_test_service(backend);
        assert!(service.suggest("sho", 5).is_err());
    }
}
