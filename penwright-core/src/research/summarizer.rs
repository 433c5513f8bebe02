//! Attribution summarizer.
//!
//! Turns one ranked source into an attributed [`ResearchSummary`] via the
//! model. A source whose reply cannot be parsed or validated is dropped;
//! nothing is invented in its place.

use super::{AuthorityTier, RankedSource, ResearchSummary, SummaryOrigin};
use crate::brain::Brain;
use crate::extract::{StructuredParseResult, extract, extract_into, schemas};
use crate::sanitize::escape_for_llm_prompt;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_KEY_POINTS: usize = 5;
const MAX_FALLBACK_SUMMARIES: usize = 3;
/// Relevance assigned to fallback items that omit a score.
const DEFAULT_FALLBACK_RELEVANCE: u8 = 40;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a meticulous research analyst. You extract \
attributed insights strictly from the source material you are given. You never add facts, \
quotes or numbers that do not appear in the source. You reply with a single JSON object and \
nothing else.";

const FALLBACK_SYSTEM_PROMPT: &str = "You are a careful subject-matter generalist. Web research \
returned no usable sources, so you provide widely accepted background knowledge only. Do not \
invent statistics, quotes, studies or URLs. Reply with a single JSON object and nothing else.";

#[derive(Debug, Deserialize)]
struct RawSummary {
    title: String,
    key_points: Vec<String>,
    #[serde(default)]
    expert_quotes: Vec<String>,
    #[serde(default)]
    data_points: Vec<String>,
    relevance_score: f64,
    source_authority: String,
}

#[derive(Debug, Deserialize)]
struct RawFallbackItem {
    title: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    relevance_score: Option<f64>,
}

/// Produces attributed summaries of ranked sources.
pub struct AttributionSummarizer {
    brain: Arc<Brain>,
    max_source_chars: usize,
}

impl AttributionSummarizer {
    pub fn new(brain: Arc<Brain>, max_source_chars: usize) -> Self {
        Self {
            brain,
            max_source_chars,
        }
    }

    /// Summarize one source, or `None` when the model reply is unusable.
    pub async fn summarize(&self, source: &RankedSource, topic: &str) -> Option<ResearchSummary> {
        let prompt = self.summary_prompt(source, topic);
        let text = match self.brain.ask(SUMMARY_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url = %source.hit.url, error = %e, "Summarization call failed, dropping source");
                return None;
            }
        };

        let raw: RawSummary = match extract_into(&text, schemas::RESEARCH_SUMMARY) {
            StructuredParseResult::Ok(raw) => raw,
            StructuredParseResult::Malformed { .. } => {
                warn!(url = %source.hit.url, "Malformed summary reply, dropping source");
                return None;
            }
            StructuredParseResult::InvalidSchema { missing_fields, .. } => {
                warn!(url = %source.hit.url, ?missing_fields, "Summary reply failed validation, dropping source");
                return None;
            }
        };

        let key_points = clean_list(raw.key_points, MAX_KEY_POINTS);
        if key_points.is_empty() {
            warn!(url = %source.hit.url, "Summary has no key points, dropping source");
            return None;
        }

        // The model may only lower the tier derived from the domain, never raise it.
        let source_authority = AuthorityTier::parse(&raw.source_authority)
            .map_or(source.tier, |reported| reported.min(source.tier));

        Some(ResearchSummary {
            title: raw.title.trim().to_string(),
            url: source.hit.url.clone(),
            key_points,
            expert_quotes: clean_list(raw.expert_quotes, MAX_KEY_POINTS),
            data_points: clean_list(raw.data_points, MAX_KEY_POINTS),
            relevance_score: clamp_score(raw.relevance_score),
            source_authority,
            publication_date: source.hit.date,
            origin: SummaryOrigin::Sourced,
        })
    }

    /// Summarize every source concurrently, keeping rank order and dropping failures.
    pub async fn summarize_all(&self, sources: &[RankedSource], topic: &str) -> Vec<ResearchSummary> {
        let results = join_all(sources.iter().map(|s| self.summarize(s, topic))).await;
        let summaries: Vec<ResearchSummary> = results.into_iter().flatten().collect();
        info!(
            sources = sources.len(),
            summaries = summaries.len(),
            "Summarized shortlisted sources"
        );
        summaries
    }

    /// Model-authored background summaries for a topic with no usable sources.
    ///
    /// Results are tagged [`SummaryOrigin::ModelFallback`], carry no URL and
    /// are always low authority. Any parse failure yields an empty list.
    pub async fn fallback_summaries(&self, topic: &str, keywords: &[String]) -> Vec<ResearchSummary> {
        let prompt = fallback_prompt(topic, keywords);
        let text = match self.brain.ask(FALLBACK_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Fallback research call failed");
                return Vec::new();
            }
        };

        let value = match extract(&text, schemas::FALLBACK_RESEARCH) {
            StructuredParseResult::Ok(value) => value,
            other => {
                warn!(outcome = other.kind(), "Fallback research reply unusable");
                return Vec::new();
            }
        };

        let items = value["summaries"].as_array().cloned().unwrap_or_default();
        let summaries: Vec<ResearchSummary> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<RawFallbackItem>(item).ok())
            .filter_map(|item| {
                let key_points = clean_list(item.key_points, MAX_KEY_POINTS);
                let title = item.title.trim().to_string();
                if title.is_empty() || key_points.is_empty() {
                    return None;
                }
                Some(ResearchSummary {
                    title,
                    url: String::new(),
                    key_points,
                    expert_quotes: Vec::new(),
                    data_points: Vec::new(),
                    relevance_score: item
                        .relevance_score
                        .map_or(DEFAULT_FALLBACK_RELEVANCE, clamp_score),
                    source_authority: AuthorityTier::Low,
                    publication_date: None,
                    origin: SummaryOrigin::ModelFallback,
                })
            })
            .take(MAX_FALLBACK_SUMMARIES)
            .collect();

        debug!(count = summaries.len(), "Produced model fallback summaries");
        summaries
    }

    fn summary_prompt(&self, source: &RankedSource, topic: &str) -> String {
        let date = source
            .hit
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Topic: {topic}\n\n\
             <source>\n\
             Title: {title}\n\
             URL: {url}\n\
             Published: {date}\n\
             Content: {content}\n\
             </source>\n\n\
             Extract 3-5 attributed insights about the topic that are stated in the source. \
             Include direct expert quotes and concrete data points only if they appear verbatim \
             in the source; otherwise leave those lists empty. Rate how relevant the source is \
             to the topic from 0 to 100 and classify its authority as \"high\", \"medium\" or \"low\".\n\n\
             Respond with JSON of this shape:\n\
             {{\"title\": string, \"key_points\": [string], \"expert_quotes\": [string], \
             \"data_points\": [string], \"relevance_score\": number, \"source_authority\": string}}",
            topic = escape_for_llm_prompt(topic, 200),
            title = escape_for_llm_prompt(&source.hit.title, 300),
            url = escape_for_llm_prompt(&source.hit.url, 500),
            content = escape_for_llm_prompt(&source.hit.snippet, self.max_source_chars),
        )
    }
}

fn fallback_prompt(topic: &str, keywords: &[String]) -> String {
    let keywords = if keywords.is_empty() {
        "none".to_string()
    } else {
        escape_for_llm_prompt(&keywords.join(", "), 300)
    };
    format!(
        "Topic: {topic}\nKeywords: {keywords}\n\n\
         Provide up to {MAX_FALLBACK_SUMMARIES} short background summaries of well-established \
         knowledge about the topic.\n\n\
         Respond with JSON of this shape:\n\
         {{\"summaries\": [{{\"title\": string, \"key_points\": [string], \"relevance_score\": number}}]}}",
        topic = escape_for_llm_prompt(topic, 200),
    )
}

fn clean_list(items: Vec<String>, max: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}

fn clamp_score(raw: f64) -> u8 {
    if raw.is_finite() {
        raw.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}
