//! Web search collaborators.
//!
//! The search provider is untrusted: it may return zero results or fail
//! transiently, and each query is treated as a soft failure on error.
//!
//! - `SerperSearchProvider`: Google results via the Serper JSON API.
//! - `StaticSearchProvider`: canned results for tests and offline runs.

pub mod serper;
pub mod static_provider;

use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use serper::SerperSearchProvider;
pub use static_provider::StaticSearchProvider;

/// One raw search result, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Publication date, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            date: None,
        }
    }

    /// Attach a publication date.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// URL normalized for duplicate detection across queries.
    pub fn dedup_key(&self) -> String {
        let lower = self.url.trim().to_lowercase();
        let without_scheme = lower
            .strip_prefix("https://")
            .or_else(|| lower.strip_prefix("http://"))
            .unwrap_or(&lower);
        let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
        without_www
            .split('#')
            .next()
            .unwrap_or(without_www)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Trait for web search providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, returning at most `result_count` hits in provider order.
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Create a search provider based on the configuration.
pub fn create_search_provider(
    config: &SearchConfig,
) -> Result<Arc<dyn SearchProvider>, SearchError> {
    match config.provider.as_str() {
        "static" => Ok(Arc::new(StaticSearchProvider::new())),
        _ => Ok(Arc::new(SerperSearchProvider::new(config)?)),
    }
}
