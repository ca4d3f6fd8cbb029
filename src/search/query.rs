// Query builder module for the search gateway
// Turns raw user input (text, optional field, page window) into a structured backend request

use super::chosung::is_initial_consonant_only;

/// Keyword that selects every document
pub const MATCH_ALL_SENTINEL: &str = "*";
/// Page size used when the caller supplies a non-positive size
pub const DEFAULT_PAGE_SIZE: usize = 10;

pub const GOODS_NAME: &str = "goods_name";
pub const GOODS_NAME_CHOSUNG: &str = "goods_name_chosung";
pub const KEY_WORD: &str = "key_word";
pub const GOODS_CODE: &str = "goods_code";
pub const DESCRIPTION: &str = "description";
pub const CATEGORY: &str = "category";

/// Physical fields a caller may target with the `field` selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Chosung projection of the display name
    InitialConsonant,
    /// Primary display name
    DisplayName,
    /// Secondary keyword field
    Keyword,
    /// Product code / identifier
    Code,
}

impl FieldRole {
    /// Map a field selector to a known role. Blank or unknown selectors yield `None`.
    pub fn parse(field: &str) -> Option<Self> {
        match field.trim() {
            GOODS_NAME_CHOSUNG => Some(FieldRole::InitialConsonant),
            GOODS_NAME => Some(FieldRole::DisplayName),
            KEY_WORD => Some(FieldRole::Keyword),
            GOODS_CODE => Some(FieldRole::Code),
            _ => None,
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            FieldRole::InitialConsonant => GOODS_NAME_CHOSUNG,
            FieldRole::DisplayName => GOODS_NAME,
            FieldRole::Keyword => KEY_WORD,
            FieldRole::Code => GOODS_CODE,
        }
    }
}

/// How the terms of a match query combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Every term must match
    And,
    /// Any term may match (backend default)
    Or,
}

/// Multi-field scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiMatchType {
    /// Score of the single best matching field
    BestFields,
}

/// Field with a relevance boost
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedField {
    pub field: String,
    pub boost: f64,
}

impl BoostedField {
    pub fn new(field: &str, boost: f64) -> Self {
        BoostedField {
            field: field.to_string(),
            boost,
        }
    }
}

/// Structured query understood by every `SearchBackend`
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    Match {
        field: String,
        query: String,
        operator: Operator,
    },
    PhrasePrefix {
        field: String,
        query: String,
    },
    MultiMatch {
        fields: Vec<BoostedField>,
        query: String,
        match_type: MultiMatchType,
        operator: Operator,
    },
    /// Matches when any `should` clause matches
    Bool {
        should: Vec<Query>,
    },
}

impl Query {
    /// Short name of the query variant, used in request logs
    pub fn kind(&self) -> &'static str {
        match self {
            Query::MatchAll => "match_all",
            Query::Match { .. } => "match",
            Query::PhrasePrefix { .. } => "match_phrase_prefix",
            Query::MultiMatch { .. } => "multi_match",
            Query::Bool { .. } => "bool",
        }
    }

    fn phrase_prefix(field: &str, query: &str) -> Self {
        Query::PhrasePrefix {
            field: field.to_string(),
            query: query.to_string(),
        }
    }

    fn field_match(field: &str, query: &str, operator: Operator) -> Self {
        Query::Match {
            field: field.to_string(),
            query: query.to_string(),
            operator,
        }
    }
}

/// A full search request: target index, page window and query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub from: usize,
    pub size: usize,
    pub query: Query,
    /// Restrict returned document fields; `None` returns whole documents
    pub source_includes: Option<Vec<String>>,
}

/// Builds search and prefix requests for one index
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    index: String,
}

impl QueryBuilder {
    pub fn new(index: impl Into<String>) -> Self {
        QueryBuilder {
            index: index.into(),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Build a ranked search request.
    ///
    /// Blank keywords become a match-all query, `size <= 0` becomes
    /// `DEFAULT_PAGE_SIZE` and a negative `from` is clamped to 0.
    pub fn build_search(
        &self,
        keyword: Option<&str>,
        field: Option<&str>,
        size: i64,
        from: i64,
    ) -> SearchRequest {
        let size = if size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            usize::try_from(size).unwrap_or(usize::MAX)
        };
        let from = usize::try_from(from.max(0)).unwrap_or(usize::MAX);

        SearchRequest {
            index: self.index.clone(),
            from,
            size,
            query: build_query(keyword, field),
            source_includes: None,
        }
    }

    /// Build the document prefix request used when completion finds nothing.
    /// Only the display fields are fetched.
    pub fn build_prefix(&self, prefix: &str, size: usize, text_field: &str) -> SearchRequest {
        let mut includes = vec![GOODS_NAME.to_string()];
        if text_field != GOODS_NAME {
            includes.push(text_field.to_string());
        }

        SearchRequest {
            index: self.index.clone(),
            from: 0,
            size,
            query: prefix_query(prefix),
            source_includes: Some(includes),
        }
    }
}

/// Classify the keyword and field selector into a query
pub fn build_query(keyword: Option<&str>, field: Option<&str>) -> Query {
    let q = match keyword.map(str::trim) {
        Some(k) if !k.is_empty() => k,
        _ => MATCH_ALL_SENTINEL,
    };

    if q == MATCH_ALL_SENTINEL {
        return Query::MatchAll;
    }

    match field.and_then(FieldRole::parse) {
        Some(role @ FieldRole::InitialConsonant) => Query::phrase_prefix(role.field_name(), q),
        Some(role @ (FieldRole::DisplayName | FieldRole::Keyword)) => {
            Query::field_match(role.field_name(), q, Operator::And)
        }
        Some(role @ FieldRole::Code) => Query::field_match(role.field_name(), q, Operator::Or),
        None => default_multi_match(q),
    }
}

/// Boosted best-fields match across name, chosung, description and category
pub fn default_multi_match(query: &str) -> Query {
    Query::MultiMatch {
        fields: vec![
            BoostedField::new(GOODS_NAME, 2.0),
            BoostedField::new(GOODS_NAME_CHOSUNG, 3.0),
            BoostedField::new(DESCRIPTION, 1.0),
            BoostedField::new(CATEGORY, 1.0),
        ],
        query: query.to_string(),
        match_type: MultiMatchType::BestFields,
        operator: Operator::And,
    }
}

/// Prefix query for suggestions: chosung input only probes the chosung field
pub fn prefix_query(prefix: &str) -> Query {
    if is_initial_consonant_only(prefix) {
        Query::phrase_prefix(GOODS_NAME_CHOSUNG, prefix)
    } else {
        Query::Bool {
            should: vec![
                Query::phrase_prefix(GOODS_NAME, prefix),
                Query::phrase_prefix(GOODS_NAME_CHOSUNG, prefix),
            ],
        }
    }
}

/// 1-based page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub size: usize,
}

impl Pagination {
    /// Missing or non-positive values fall back to page 1 and `DEFAULT_PAGE_SIZE`
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => usize::try_from(p).unwrap_or(usize::MAX),
            _ => 1,
        };
        let size = match size {
            Some(s) if s > 0 => usize::try_from(s).unwrap_or(usize::MAX),
            _ => DEFAULT_PAGE_SIZE,
        };
        Pagination { page, size }
    }

    /// Offset of the first hit on this page, saturating for absurd page numbers
    pub fn from(&self) -> usize {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total_pages(total, self.size)
    }
}

/// `ceil(total / size)` with a floor of 1; a zero size yields 1
pub fn total_pages(total: u64, size: usize) -> u64 {
    if size == 0 {
        return 1;
    }
    let size = u64::try_from(size).unwrap_or(u64::MAX);
    total.div_ceil(size).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_match_all_for_blank_keyword() {
        assert_eq!(build_query(None, None), Query::MatchAll);
        assert_eq!(build_query(Some(""), Some(GOODS_NAME_CHOSUNG)), Query::MatchAll);
        assert_eq!(build_query(Some("   "), Some(GOODS_CODE)), Query::MatchAll);
        assert_eq!(build_query(Some("*"), Some(GOODS_NAME)), Query::MatchAll);
    }

    #[test]
    fn test_build_chosung_field() {
        let query = build_query(Some("ㅅㅂ"), Some("goods_name_chosung"));
        assert_eq!(
            query,
            Query::PhrasePrefix {
                field: GOODS_NAME_CHOSUNG.to_string(),
                query: "ㅅㅂ".to_string(),
            }
        );
    }

    #[test]
    fn test_build_name_and_keyword_fields_use_and() {
        for field in [GOODS_NAME, KEY_WORD] {
            let query = build_query(Some(" running shoe "), Some(field));
            assert_eq!(
                query,
                Query::Match {
                    field: field.to_string(),
                    query: "running shoe".to_string(),
                    operator: Operator::And,
                }
            );
        }
    }

    #[test]
    fn test_build_code_field_uses_default_operator() {
        let query = build_query(Some("A-100"), Some(GOODS_CODE));
        assert!(matches!(query, Query::Match { operator: Operator::Or, .. }));
    }

    #[test]
    fn test_build_default_multi_match() {
        for field in [None, Some(""), Some("price")] {
            let query = build_query(Some("shoe"), field);
            match query {
                Query::MultiMatch { fields, query, match_type, operator } => {
                    assert_eq!(query, "shoe");
                    assert_eq!(match_type, MultiMatchType::BestFields);
                    assert_eq!(operator, Operator::And);
                    assert_eq!(fields.len(), 4);
                    assert_eq!(fields[0], BoostedField::new(GOODS_NAME, 2.0));
                    assert_eq!(fields[1], BoostedField::new(GOODS_NAME_CHOSUNG, 3.0));
                }
                other => panic!("unexpected query {:?}", other),
            }
        }
    }

    #[test]
    fn test_build_search_normalizes_window() {
        let builder = QueryBuilder::new("goods");
        let request = builder.build_search(Some("shoe"), None, 0, -5);
        assert_eq!(request.index, "goods");
        assert_eq!(request.size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.from, 0);

        let request = builder.build_search(None, None, 20, 40);
        assert_eq!(request.size, 20);
        assert_eq!(request.from, 40);
        assert_eq!(request.query.kind(), "match_all");
    }

    #[test]
    fn test_prefix_query_strategy() {
        assert_eq!(prefix_query("ㅅㅂ").kind(), "match_phrase_prefix");
        match prefix_query("sho") {
            Query::Bool { should } => assert_eq!(should.len(), 2),
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_build_prefix_projects_display_fields() {
        let builder = QueryBuilder::new("goods");
        let request = builder.build_prefix("sho", 8, "title");
        assert_eq!(
            request.source_includes,
            Some(vec!["goods_name".to_string(), "title".to_string()])
        );
        let request = builder.build_prefix("sho", 8, GOODS_NAME);
        assert_eq!(request.source_includes, Some(vec!["goods_name".to_string()]));
    }

    #[test]
    fn test_pagination() {
        let page = Pagination::new(Some(3), Some(10));
        assert_eq!(page.from(), 20);
        assert_eq!(page.total_pages(95), 10);
        assert_eq!(page.total_pages(0), 1);
        assert_eq!(page.total_pages(100), 10);
        assert_eq!(page.total_pages(101), 11);

        let page = Pagination::new(Some(0), None);
        assert_eq!(page.page, 1);
        assert_eq!(page.size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.from(), 0);

        assert_eq!(Pagination::new(Some(-4), Some(-1)).page, 1);
        assert_eq!(total_pages(50, 0), 1);
    }

    #[test]
    fn test_pagination_huge_page() {
        let page = Pagination::new(Some(i64::MAX), Some(10));
        assert_eq!(page.from(), usize::MAX);

        let page = Pagination::new(Some(2), Some(i64::MAX));
        assert_eq!(page.from(), usize::try_from(i64::MAX).unwrap());
        assert_eq!(total_pages(u64::MAX, usize::MAX), 1);
        assert_eq!(page.total_pages(5), 1);
    }
}
