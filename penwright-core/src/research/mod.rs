//! Research stage: turn a topic into attributed, ranked source summaries.
//!
//! 1. **Plan**: derive a bounded, duplicate-free query list
//! 2. **Search**: fan the queries out to the search provider
//! 3. **Rank**: score hits by authority, recency and relevance
//! 4. **Summarize**: extract attributed insights from each shortlisted source
//! 5. **Cache**: memoize the result under a normalized (topic, keywords) key

pub mod cache;
pub mod engine;
pub mod planner;
pub mod ranker;
pub mod summarizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache::{CacheEntry, CacheKey, CacheStats, ResearchCache};
pub use engine::{ResearchEngine, ResearchOutcome};
pub use planner::QueryPlanner;
pub use ranker::{RankedSource, SourceRanker, domain_authority};
pub use summarizer::AttributionSummarizer;

/// Coarse trust level of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityTier {
    High,
    Medium,
    Low,
}

impl AuthorityTier {
    /// Tier for a 0-100 domain authority score.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::High,
            60..=79 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Lenient parse of a model-reported tier.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// The less trusted of two tiers.
    pub fn min(self, other: Self) -> Self {
        if self.rank() <= other.rank() { self } else { other }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl std::fmt::Display for AuthorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Where a summary's content came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryOrigin {
    /// Extracted from a real search result.
    #[default]
    Sourced,
    /// General background written by the model without a source.
    ModelFallback,
}

/// An attributed, structured extraction of insights from one web source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub title: String,
    /// Source URL; empty for model fallback summaries.
    pub url: String,
    pub key_points: Vec<String>,
    #[serde(default)]
    pub expert_quotes: Vec<String>,
    #[serde(default)]
    pub data_points: Vec<String>,
    /// 0-100.
    pub relevance_score: u8,
    pub source_authority: AuthorityTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub origin: SummaryOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_score() {
        assert_eq!(AuthorityTier::from_score(95), AuthorityTier::High);
        assert_eq!(AuthorityTier::from_score(80), AuthorityTier::High);
        assert_eq!(AuthorityTier::from_score(65), AuthorityTier::Medium);
        assert_eq!(AuthorityTier::from_score(50), AuthorityTier::Low);
    }

    #[test]
    fn test_tier_parse_and_min() {
        assert_eq!(AuthorityTier::parse(" HIGH "), Some(AuthorityTier::High));
        assert_eq!(AuthorityTier::parse("unknown"), None);
        assert_eq!(
            AuthorityTier::High.min(AuthorityTier::Medium),
            AuthorityTier::Medium
        );
        assert_eq!(AuthorityTier::Low.min(AuthorityTier::High), AuthorityTier::Low);
    }

    #[test]
    fn test_summary_serde_uses_lowercase_tier() {
        let summary = ResearchSummary {
            title: "T".into(),
            url: "https://a.org".into(),
            key_points: vec!["p".into()],
            expert_quotes: vec![],
            data_points: vec![],
            relevance_score: 70,
            source_authority: AuthorityTier::Medium,
            publication_date: None,
            origin: SummaryOrigin::Sourced,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["source_authority"], "medium");
        assert_eq!(json["origin"], "sourced");
    }
}
