//! Research engine: orchestrates plan -> search -> rank -> summarize -> cache.

use super::cache::{CacheKey, ResearchCache};
use super::planner::QueryPlanner;
use super::ranker::SourceRanker;
use super::summarizer::AttributionSummarizer;
use super::{ResearchSummary, SummaryOrigin};
use crate::brain::Brain;
use crate::config::{OnResearchFailure, ResearchConfig};
use crate::providers::{GateError, RequestGate};
use crate::search::{SearchHit, SearchProvider};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Diagnostics for one research run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResearchOutcome {
    pub summaries: Vec<ResearchSummary>,
    pub queries_issued: usize,
    pub failed_queries: usize,
    /// Unique hits after cross-query de-duplication.
    pub hits_gathered: usize,
    /// Sources on the ranked shortlist.
    pub sources_kept: usize,
    pub cache_hit: bool,
    /// True when the summaries were written by the model without sources.
    pub used_fallback: bool,
}

/// The research stage of the pipeline.
pub struct ResearchEngine {
    search: Arc<dyn SearchProvider>,
    search_gate: RequestGate,
    summarizer: AttributionSummarizer,
    planner: QueryPlanner,
    ranker: SourceRanker,
    cache: Arc<ResearchCache>,
    results_per_query: usize,
    on_failure: OnResearchFailure,
}

impl ResearchEngine {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        brain: Arc<Brain>,
        cache: Arc<ResearchCache>,
        config: &ResearchConfig,
    ) -> Self {
        Self {
            search,
            search_gate: RequestGate::unbounded("search"),
            summarizer: AttributionSummarizer::new(brain, config.max_source_chars),
            planner: QueryPlanner::new(config.max_queries),
            ranker: SourceRanker::new(config),
            cache,
            results_per_query: 5,
            on_failure: config.on_research_failure,
        }
    }

    /// Route every search call through `gate`.
    pub fn with_search_gate(mut self, gate: RequestGate) -> Self {
        self.search_gate = gate;
        self
    }

    /// Number of results requested per query.
    pub fn with_results_per_query(mut self, count: usize) -> Self {
        self.results_per_query = count;
        self
    }

    pub fn cache(&self) -> &Arc<ResearchCache> {
        &self.cache
    }

    /// Research `topic`; an empty list means "proceed without grounding".
    pub async fn research(&self, topic: &str, keywords: &[String]) -> Vec<ResearchSummary> {
        self.research_detailed(topic, keywords).await.summaries
    }

    /// Research `topic` and report what happened along the way.
    ///
    /// Reads through the cache. Concurrent calls for the same cold key are
    /// coalesced: one performs the work and the rest reuse its result.
    pub async fn research_detailed(&self, topic: &str, keywords: &[String]) -> ResearchOutcome {
        if topic.trim().is_empty() {
            warn!("Research requested for an empty topic");
            return ResearchOutcome::default();
        }

        let key = CacheKey::new(topic, keywords);
        if let Some(summaries) = self.cache.get(&key) {
            debug!(key = %key, "Research cache hit");
            return ResearchOutcome {
                summaries,
                cache_hit: true,
                ..Default::default()
            };
        }

        let _flight = self.cache.begin_flight(&key).await;
        if let Some(summaries) = self.cache.get(&key) {
            debug!(key = %key, "Research computed by a concurrent caller");
            return ResearchOutcome {
                summaries,
                cache_hit: true,
                ..Default::default()
            };
        }

        let mut outcome = self.run_uncached(topic, keywords).await;

        let sourced = outcome
            .summaries
            .iter()
            .all(|s| s.origin == SummaryOrigin::Sourced);
        if sourced && !outcome.summaries.is_empty() {
            self.cache.put(key, outcome.summaries.clone());
        }

        if outcome.summaries.is_empty() && self.on_failure == OnResearchFailure::ModelFallback {
            warn!(topic, "No usable sources, asking the model for background");
            outcome.summaries = self.summarizer.fallback_summaries(topic, keywords).await;
            outcome.used_fallback = !outcome.summaries.is_empty();
        }

        info!(
            topic,
            queries = outcome.queries_issued,
            failed_queries = outcome.failed_queries,
            hits = outcome.hits_gathered,
            kept = outcome.sources_kept,
            summaries = outcome.summaries.len(),
            fallback = outcome.used_fallback,
            "Research complete"
        );
        outcome
    }

    async fn run_uncached(&self, topic: &str, keywords: &[String]) -> ResearchOutcome {
        let queries = self.planner.plan(topic, keywords);
        debug!(count = queries.len(), ?queries, "Planned research queries");

        let results = join_all(queries.iter().map(|q| self.search_one(q))).await;
        let failed_queries = results.iter().filter(|r| r.is_none()).count();

        let mut seen = HashSet::new();
        let hits: Vec<SearchHit> = results
            .into_iter()
            .flatten()
            .flatten()
            .filter(|hit| seen.insert(hit.dedup_key()))
            .collect();
        let hits_gathered = hits.len();

        let shortlist = self.ranker.rank(hits, topic);
        let sources_kept = shortlist.len();

        let summaries = if shortlist.is_empty() {
            Vec::new()
        } else {
            self.summarizer.summarize_all(&shortlist, topic).await
        };

        ResearchOutcome {
            summaries,
            queries_issued: queries.len(),
            failed_queries,
            hits_gathered,
            sources_kept,
            cache_hit: false,
            used_fallback: false,
        }
    }

    /// One gated search; `None` on any failure.
    async fn search_one(&self, query: &str) -> Option<Vec<SearchHit>> {
        let call = self.search.search(query, self.results_per_query);
        match self.search_gate.run(call).await {
            Ok(Ok(hits)) => Some(hits),
            Ok(Err(e)) => {
                warn!(query, provider = self.search.name(), error = %e, "Search query failed");
                None
            }
            Err(GateError::TimedOut { after_secs }) => {
                warn!(query, after_secs, "Search query timed out");
                None
            }
            Err(GateError::Closed) => None,
        }
    }
}
