// In-memory search backend for the search gateway
// Multi-index document store answering the same requests as the remote backend

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use super::backend::{Document, SearchBackend, SearchHits, SortOrder, TermBucket};
use super::chosung::initial_consonants;
use super::query::{Operator, Query, SearchRequest, GOODS_NAME, GOODS_NAME_CHOSUNG};
use crate::error::{Result, SearchError};
use crate::pipeline::{EventSink, SearchLogEvent};

/// Suffix addressing the raw, unanalyzed value of a text field
const KEYWORD_SUBFIELD: &str = ".keyword";

/// Documents of one index in insertion order
#[derive(Debug, Default)]
struct MemoryIndex {
    documents: Vec<Document>,
}

/// In-memory implementation of `SearchBackend`.
///
/// Text is analyzed into lowercase Unicode words. Queries are evaluated as
/// plain filters; hits come back in insertion order without relevance ranking.
/// Availability can be switched off to simulate outages.
pub struct MemoryBackend {
    indices: RwLock<HashMap<String, MemoryIndex>>,
    available: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend with no indices
    pub fn new() -> Self {
        MemoryBackend {
            indices: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Create an index if it does not exist yet
    pub fn create_index(&self, index: &str) {
        self.indices.write().entry(index.to_string()).or_default();
    }

    /// Add a document, creating the index on first use.
    /// A missing chosung field is derived from the display name.
    pub fn add_document(&self, index: &str, mut doc: Document) {
        let derived = match doc.get(GOODS_NAME) {
            Some(Value::String(name)) if !doc.contains_key(GOODS_NAME_CHOSUNG) => {
                Some(initial_consonants(name))
            }
            _ => None,
        };
        if let Some(chosung) = derived {
            doc.insert(GOODS_NAME_CHOSUNG.to_string(), Value::String(chosung));
        }

        self.indices
            .write()
            .entry(index.to_string())
            .or_default()
            .documents
            .push(doc);
    }

    /// Add a JSON object; other JSON values are rejected
    pub fn add_json(&self, index: &str, value: Value) -> Result<()> {
        match value {
            Value::Object(doc) => {
                self.add_document(index, doc);
                Ok(())
            }
            other => Err(SearchError::Sink(format!("expected a JSON object, got {}", other))),
        }
    }

    /// Remove every document of an index
    pub fn clear(&self, index: &str) {
        if let Some(idx) = self.indices.write().get_mut(index) {
            idx.documents.clear();
        }
    }

    /// Number of documents in an index (0 when missing)
    pub fn len(&self, index: &str) -> usize {
        self.indices
            .read()
            .get(index)
            .map(|idx| idx.documents.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Toggle availability; while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(AtomicOrdering::SeqCst)
    }

    fn ensure_available(&self, operation: &'static str) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(SearchError::unavailable(operation, "backend is offline"))
        }
    }

    fn with_index<T>(&self, index: &str, f: impl FnOnce(&MemoryIndex) -> T) -> Result<T> {
        let indices = self.indices.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        Ok(f(idx))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new()
    }
}

/// Writes search-log events as documents into an index of the in-memory backend
pub struct MemoryLogSink {
    backend: Arc<MemoryBackend>,
    index: String,
}

impl MemoryLogSink {
    pub fn new(backend: Arc<MemoryBackend>, index: impl Into<String>) -> Self {
        let index = index.into();
        backend.create_index(&index);
        MemoryLogSink { backend, index }
    }
}

impl EventSink for MemoryLogSink {
    fn persist(&self, event: &SearchLogEvent) -> Result<()> {
        if !self.backend.is_available() {
            return Err(SearchError::Sink(format!("index {} is offline", self.index)));
        }
        let doc = serde_json::to_value(event)?;
        self.backend.add_json(&self.index, doc)
    }
}

impl SearchBackend for MemoryBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchHits> {
        self.ensure_available("search")?;
        self.with_index(&request.index, |idx| {
            let matched: Vec<&Document> = idx
                .documents
                .iter()
                .filter(|doc| matches(&request.query, doc))
                .collect();

            let total = matched.len() as u64;
            let hits = matched
                .into_iter()
                .skip(request.from)
                .take(request.size)
                .map(|doc| project(doc, request.source_includes.as_deref()))
                .collect();

            SearchHits { total, hits }
        })
    }

    fn completion_suggest(
        &self,
        index: &str,
        field: &str,
        prefix: &str,
        size: usize,
    ) -> Result<Vec<String>> {
        self.ensure_available("completion_suggest")?;
        let prefix_lower = prefix.to_lowercase();

        self.with_index(index, |idx| {
            let mut options: Vec<(u64, String)> = Vec::new();
            for doc in &idx.documents {
                let Some(value) = doc.get(field) else { continue };
                let (inputs, weight) = completion_inputs(value);
                for input in inputs {
                    if input.to_lowercase().starts_with(&prefix_lower) {
                        options.push((weight, input));
                    }
                }
            }

            options.sort_by(|a, b| b.0.cmp(&a.0));

            let mut out: Vec<String> = Vec::new();
            for (_, text) in options {
                if out.len() >= size {
                    break;
                }
                if !out.contains(&text) {
                    out.push(text);
                }
            }
            out
        })
    }

    fn terms_aggregation(&self, index: &str, field: &str, size: usize) -> Result<Vec<TermBucket>> {
        self.ensure_available("terms_aggregation")?;
        let field = field.strip_suffix(KEYWORD_SUBFIELD).unwrap_or(field);

        self.with_index(index, |idx| {
            let mut counts: HashMap<String, u64> = HashMap::new();
            for doc in &idx.documents {
                for value in field_values(doc, field) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }

            let mut buckets: Vec<TermBucket> = counts
                .into_iter()
                .map(|(term, count)| TermBucket { term, count })
                .collect();
            buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
            buckets.truncate(size);
            buckets
        })
    }

    fn sorted_search(
        &self,
        index: &str,
        sort_field: &str,
        order: SortOrder,
        size: usize,
    ) -> Result<Vec<Document>> {
        self.ensure_available("sorted_search")?;

        self.with_index(index, |idx| {
            let mut docs: Vec<(Option<f64>, &Document)> = idx
                .documents
                .iter()
                .map(|doc| (doc.get(sort_field).and_then(Value::as_f64), doc))
                .collect();

            // Documents without the sort field go last in both directions
            docs.sort_by(|a, b| match (a.0, b.0) {
                (Some(x), Some(y)) => {
                    let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                    match order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });

            docs.into_iter().take(size).map(|(_, doc)| doc.clone()).collect()
        })
    }
}

/// Lowercase Unicode words
fn analyze(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// String views of a field: strings, numbers and arrays of those
fn field_values(doc: &Document, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Number(n)) => vec![n.to_string()],
        Some(Value::Bool(b)) => vec![b.to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Completion inputs and weight: a string, an array of strings, or `{input, weight}`
fn completion_inputs(value: &Value) -> (Vec<String>, u64) {
    match value {
        Value::String(s) => (vec![s.clone()], 1),
        Value::Array(items) => (
            items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            1,
        ),
        Value::Object(obj) => {
            let weight = obj.get("weight").and_then(Value::as_u64).unwrap_or(1);
            let inputs = match obj.get("input") {
                Some(Value::String(s)) => vec![s.clone()],
                Some(Value::Array(items)) => {
                    items.iter().filter_map(Value::as_str).map(str::to_string).collect()
                }
                _ => Vec::new(),
            };
            (inputs, weight)
        }
        _ => (Vec::new(), 0),
    }
}

/// Whether `doc` satisfies `query`
fn matches(query: &Query, doc: &Document) -> bool {
    match query {
        Query::MatchAll => true,
        Query::Match { field, query, operator } => field_matches(doc, field, &analyze(query), *operator),
        Query::PhrasePrefix { field, query } => {
            let terms = analyze(query);
            field_values(doc, field)
                .iter()
                .any(|value| phrase_prefix_matches(&analyze(value), &terms))
        }
        Query::MultiMatch { fields, query, operator, .. } => {
            let terms = analyze(query);
            fields.iter().any(|f| field_matches(doc, &f.field, &terms, *operator))
        }
        Query::Bool { should } => should.iter().any(|q| matches(q, doc)),
    }
}

fn field_matches(doc: &Document, field: &str, terms: &[String], operator: Operator) -> bool {
    if terms.is_empty() {
        return false;
    }

    let tokens: Vec<String> = field_values(doc, field)
        .iter()
        .flat_map(|value| analyze(value))
        .collect();
    match operator {
        Operator::And => terms.iter().all(|t| tokens.contains(t)),
        Operator::Or => terms.iter().any(|t| tokens.contains(t)),
    }
}

/// Terms appear consecutively, the last one as a prefix of its token
fn phrase_prefix_matches(tokens: &[String], terms: &[String]) -> bool {
    let Some((last, head)) = terms.split_last() else {
        return false;
    };
    if tokens.len() < terms.len() {
        return false;
    }

    tokens.windows(terms.len()).any(|window| {
        window[..head.len()] == head[..] && window[head.len()].starts_with(last.as_str())
    })
}

fn project(doc: &Document, includes: Option<&[String]>) -> Document {
    match includes {
        None => doc.clone(),
        Some(fields) => doc
            .iter()
            .filter(|(key, _)| fields.iter().any(|f| f == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}
