//! Serper (Google Search JSON API) provider.

use super::{SearchHit, SearchProvider};
use crate::config::SearchConfig;
use crate::error::SearchError;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

/// Search provider backed by the Serper API.
pub struct SerperSearchProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SerperSearchProvider {
    /// Create a provider reading the API key from `config.api_key_env`.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| SearchError::AuthFailed {
                provider: format!("serper: env var '{}' not set", config.api_key_env),
            })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a provider with an explicitly provided API key.
    pub fn new_with_key(config: &SearchConfig, api_key: String) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent("Penwright/0.1")
            .build()
            .map_err(|e| SearchError::Request {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
        })
    }

    /// Extract hits from a Serper response body.
    fn parse_organic(body: &Value, now: DateTime<Utc>) -> Vec<SearchHit> {
        body.get("organic")
            .and_then(|o| o.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let title = item.get("title")?.as_str()?.trim().to_string();
                        let url = item.get("link")?.as_str()?.trim().to_string();
                        if title.is_empty() || url.is_empty() {
                            return None;
                        }
                        let snippet = item
                            .get("snippet")
                            .and_then(|s| s.as_str())
                            .unwrap_or("")
                            .trim()
                            .to_string();
                        let date = item
                            .get("date")
                            .and_then(|d| d.as_str())
                            .and_then(|d| parse_published_date(d, now));
                        Some(SearchHit {
                            title,
                            url,
                            snippet,
                            date,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for SerperSearchProvider {
    async fn search(&self, query: &str, result_count: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.base_url);
        debug!(query = %query, result_count, "Sending Serper search request");

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": result_count }))
            .send()
            .await
            .map_err(|e| SearchError::Request {
                message: format!("Search request failed: {}", e),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SearchError::AuthFailed {
                provider: "serper".to_string(),
            });
        }
        if !status.is_success() {
            return Err(SearchError::Request {
                message: format!("HTTP {}", status),
            });
        }

        let body: Value = response.json().await.map_err(|e| SearchError::Parse {
            message: format!("Failed to parse search response: {}", e),
        })?;

        let mut hits = Self::parse_organic(&body, Utc::now());
        hits.truncate(result_count);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "serper"
    }
}

/// Parse the loose date strings search engines attach to results.
///
/// Accepts RFC 3339, `YYYY-MM-DD`, `Mar 12, 2024`, `March 12, 2024`
/// and relative forms such as `3 days ago`.
pub fn parse_published_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    let lower = raw.to_lowercase();
    let mut parts = lower.strip_suffix(" ago")?.split_whitespace();
    let amount: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.trim_end_matches('s');
    let delta = match unit {
        "minute" => ChronoDuration::minutes(amount),
        "hour" => ChronoDuration::hours(amount),
        "day" => ChronoDuration::days(amount),
        "week" => ChronoDuration::weeks(amount),
        "month" => ChronoDuration::days(amount * 30),
        "year" => ChronoDuration::days(amount * 365),
        _ => return None,
    };
    Some(now - delta)
}
