/// Document search
///
/// Ranking is a static relevance score: a title match scores 10, otherwise a
/// category match 5, otherwise a content match 1. Equal scores are ordered
/// newest first. Search never fails a request: database errors come back as
/// an empty result set carrying an error message.
pub mod snippet;

pub use snippet::{build_snippet, highlight, strip_html, DEFAULT_SNIPPET_LENGTH};

use crate::{
    cache::{namespaces, CacheManager},
    content::clamp_page,
    db::{DatabaseAdapter, Document, SearchRow, TitleSuggestion},
    error::WikiResult,
    metrics,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Queries shorter than this (after trimming) match nothing
pub const MIN_QUERY_CHARS: usize = 2;

/// One ranked search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub title: String,
    pub highlighted_title: String,
    pub snippet: String,
    pub category: String,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub view_count: i64,
    pub relevance_score: i64,
}

impl SearchResult {
    fn from_row(row: SearchRow, query: &str) -> Self {
        Self {
            highlighted_title: highlight(&row.title, query),
            snippet: build_snippet(&row.content, query, DEFAULT_SNIPPET_LENGTH),
            id: row.id,
            title: row.title,
            category: row.category,
            author_name: row.author_name,
            created_at: row.created_at,
            view_count: row.view_count,
            relevance_score: row.relevance_score,
        }
    }
}

/// A page of search hits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub total: i64,
    pub query: String,
    pub limit: i64,
    pub offset: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResults {
    pub fn empty(query: &str, limit: i64, offset: i64) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            query: query.to_string(),
            limit,
            offset,
            error: None,
        }
    }

    pub fn failed(query: &str, limit: i64, offset: i64, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(query, limit, offset)
        }
    }
}

/// Search service over the configured database
pub struct SearchEngine {
    db: Arc<dyn DatabaseAdapter>,
    cache: Arc<CacheManager>,
    search_ttl: Duration,
}

impl SearchEngine {
    pub fn new(db: Arc<dyn DatabaseAdapter>, cache: Arc<CacheManager>, search_ttl: Duration) -> Self {
        Self {
            db,
            cache,
            search_ttl,
        }
    }

    /// Ranked full-text search
    pub async fn full_text_search(&self, query: &str, limit: i64, offset: i64) -> SearchResults {
        let query = query.trim();
        let (limit, offset) = clamp_page(limit, offset);
        let backend = self.db.backend_name();

        if query.chars().count() < MIN_QUERY_CHARS {
            metrics::record_search(backend, "short");
            return SearchResults::empty(query, limit, offset);
        }

        let outcome = self
            .cache
            .cached(
                namespaces::SEARCH,
                &(query, limit, offset),
                Some(self.search_ttl),
                || self.run_search(query, limit, offset),
            )
            .await;

        match outcome {
            Ok(results) => {
                metrics::record_search(backend, "ok");
                debug!("Search '{}' matched {} documents", query, results.total);
                results
            }
            Err(e) => {
                metrics::record_search(backend, "error");
                error!("Search '{}' failed: {}", query, e);
                SearchResults::failed(query, limit, offset, "Search is temporarily unavailable")
            }
        }
    }

    async fn run_search(&self, query: &str, limit: i64, offset: i64) -> WikiResult<SearchResults> {
        let (rows, total) = self.db.search_documents(query, limit, offset).await?;

        Ok(SearchResults {
            results: rows
                .into_iter()
                .map(|row| SearchResult::from_row(row, query))
                .collect(),
            total,
            query: query.to_string(),
            limit,
            offset,
            error: None,
        })
    }

    /// Title suggestions for a partially typed query
    pub async fn suggest(&self, prefix: &str, limit: i64) -> WikiResult<Vec<TitleSuggestion>> {
        let prefix = prefix.trim();
        if prefix.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        let (limit, _) = clamp_page(limit, 0);

        self.cache
            .cached(
                namespaces::SUGGEST,
                &(prefix, limit),
                Some(self.search_ttl),
                || self.db.suggest_titles(prefix, limit),
            )
            .await
    }

    /// Most viewed documents
    pub async fn popular(&self, limit: i64) -> WikiResult<Vec<Document>> {
        let (limit, _) = clamp_page(limit, 0);

        self.cache
            .cached(namespaces::POPULAR, &limit, None, || {
                self.db.popular_documents(limit)
            })
            .await
    }
}
