//! The content synthesis pipeline: the public entry point of the crate.
//!
//! Exposes `research`, `generate` and `analyze`, plus `optimize` and the
//! end-to-end `synthesize`. Every outbound call goes through a
//! [`RequestGate`] built from the `limits` configuration section.

use crate::brain::{Brain, LlmProvider};
use crate::config::PenwrightConfig;
use crate::error::{PipelineError, Result};
use crate::generation::{ContentDraft, ContentGenerator, ContentRequest, GenerationReport};
use crate::providers::{RequestGate, create_provider};
use crate::research::{CacheStats, ResearchCache, ResearchEngine, ResearchOutcome, ResearchSummary};
use crate::search::{SearchProvider, create_search_provider};
use crate::seo::{SeoAnalysis, SeoAnalyzer};
use crate::types::TokenUsage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Everything produced by one end-to-end run.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResult {
    pub research: Vec<ResearchSummary>,
    pub draft: ContentDraft,
    pub report: GenerationReport,
    pub analysis: SeoAnalysis,
}

/// Research, generation and SEO analysis behind one handle.
pub struct ContentPipeline {
    research: ResearchEngine,
    generator: ContentGenerator,
    analyzer: SeoAnalyzer,
    brain: Arc<Brain>,
    sweeper: Option<JoinHandle<()>>,
}

impl ContentPipeline {
    /// Build the pipeline with providers selected by `config`.
    pub fn from_config(config: &PenwrightConfig) -> Result<Self> {
        let llm = create_provider(&config.llm)?;
        let search = create_search_provider(&config.search)?;
        Self::new(config, llm, search)
    }

    /// Build the pipeline around explicit providers.
    pub fn new(
        config: &PenwrightConfig,
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let limits = &config.limits;

        let llm_gate = RequestGate::new(
            "llm",
            limits.max_concurrent_llm,
            limits.llm_rpm,
            Duration::from_secs(limits.llm_timeout_secs),
        );
        let search_gate = RequestGate::new(
            "search",
            limits.max_concurrent_search,
            limits.search_rpm,
            Duration::from_secs(limits.search_timeout_secs),
        );

        let brain = Arc::new(
            Brain::new(llm, llm_gate)
                .with_temperature(config.llm.temperature)
                .with_max_tokens(config.llm.max_tokens),
        );

        let cache = Arc::new(ResearchCache::new(
            config.research.cache_capacity,
            Duration::from_secs(config.research.cache_ttl_secs),
        ));
        let sweeper = config
            .research
            .sweep_interval_secs
            .and_then(|secs| spawn_sweeper(&cache, Duration::from_secs(secs)));

        let research = ResearchEngine::new(search, Arc::clone(&brain), cache, &config.research)
            .with_search_gate(search_gate)
            .with_results_per_query(config.search.results_per_query);
        let analyzer = SeoAnalyzer::new(config.seo.clone());
        let generator =
            ContentGenerator::new(Arc::clone(&brain), config.generation.clone(), analyzer.clone());

        info!(
            model = brain.model_name(),
            cache_capacity = config.research.cache_capacity,
            on_research_failure = ?config.research.on_research_failure,
            "Content pipeline ready"
        );

        Ok(Self {
            research,
            generator,
            analyzer,
            brain,
            sweeper,
        })
    }

    /// Research `topic`. An empty result means "proceed without grounding".
    pub async fn research(&self, topic: &str, keywords: &[String]) -> Vec<ResearchSummary> {
        self.research.research(topic, keywords).await
    }

    /// Like [`research`](Self::research), but an empty result is an error.
    pub async fn research_required(
        &self,
        topic: &str,
        keywords: &[String],
    ) -> Result<Vec<ResearchSummary>> {
        let summaries = self.research(topic, keywords).await;
        if summaries.is_empty() {
            return Err(PipelineError::NoResearch {
                topic: topic.trim().to_string(),
            }
            .into());
        }
        Ok(summaries)
    }

    /// Research with diagnostics.
    pub async fn research_detailed(&self, topic: &str, keywords: &[String]) -> ResearchOutcome {
        self.research.research_detailed(topic, keywords).await
    }

    /// Generate a draft from a fully specified request.
    pub async fn generate(&self, request: &ContentRequest) -> Result<ContentDraft> {
        Ok(self.generator.generate(request).await?)
    }

    /// Generate a draft and its control report.
    pub async fn generate_detailed(
        &self,
        request: &ContentRequest,
    ) -> Result<(ContentDraft, GenerationReport)> {
        Ok(self.generator.generate_detailed(request).await?)
    }

    /// Score `content` against `target_keywords`.
    pub fn analyze(
        &self,
        content: &str,
        target_keywords: &[String],
        existing_internal_urls: Option<&[String]>,
    ) -> SeoAnalysis {
        self.analyzer
            .analyze(content, target_keywords, existing_internal_urls)
    }

    /// Ask the model to apply `analysis` to `draft`; keeps the better of the two.
    pub async fn optimize(&self, draft: &ContentDraft, analysis: &SeoAnalysis) -> ContentDraft {
        self.generator.optimize(draft, analysis).await
    }

    /// Research, generate and analyze in one call.
    ///
    /// Research already present on `request` is kept; otherwise it is
    /// fetched for the request's topic and keywords.
    pub async fn synthesize(
        &self,
        mut request: ContentRequest,
        existing_internal_urls: Option<&[String]>,
    ) -> Result<SynthesisResult> {
        if request.research.is_empty() {
            request.research = self.research(&request.topic, &request.keywords).await;
            if request.research.is_empty() {
                warn!(topic = %request.topic, "Generating without research");
            }
        }

        let (draft, report) = self.generate_detailed(&request).await?;
        let analysis = self.analyze(&draft.content, &request.keywords, existing_internal_urls);

        Ok(SynthesisResult {
            research: request.research,
            draft,
            report,
            analysis,
        })
    }

    /// Cumulative model token usage.
    pub fn usage(&self) -> TokenUsage {
        self.brain.usage()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.research.cache().stats()
    }
}

impl Drop for ContentPipeline {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

/// Start the cache sweeper if a Tokio runtime is available.
fn spawn_sweeper(cache: &Arc<ResearchCache>, interval: Duration) -> Option<JoinHandle<()>> {
    if tokio::runtime::Handle::try_current().is_err() {
        warn!("No async runtime; research cache sweeper not started");
        return None;
    }
    Some(cache.spawn_sweeper(interval))
}
