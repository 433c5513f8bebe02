//! Canned search provider for tests and offline runs.

use super::{SearchHit, SearchProvider};
use crate::error::SearchError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns fixed hits per query; unknown queries get `default_hits`.
#[derive(Default)]
pub struct StaticSearchProvider {
    by_query: HashMap<String, Vec<SearchHit>>,
    default_hits: Vec<SearchHit>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl StaticSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `hits` for every query without a specific entry.
    pub fn with_default_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.default_hits = hits;
        self
    }

    /// Serve `hits` for exactly `query`.
    pub fn with_query(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.by_query.insert(query.into(), hits);
        self
    }

    /// Fail whenever `query` is searched.
    pub fn failing_on(mut self, query: impl Into<String>) -> Self {
        self.failing.insert(query.into());
        self
    }

    /// Number of `search` calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(query) {
            return Err(SearchError::Request {
                message: format!("static failure for '{query}'"),
            });
        }
        let hits = self.by_query.get(query).unwrap_or(&self.default_hits);
        Ok(hits.iter().take(result_count).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
