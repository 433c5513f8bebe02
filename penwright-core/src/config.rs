//! Configuration system for Penwright.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/penwright/config.toml` and/or `.penwright/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for the content pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PenwrightConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
    pub generation: GenerationConfig,
    pub seo: SeoConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

/// Configuration for the language model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai", "ollama", or any OpenAI-compatible endpoint.
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Default temperature for generation.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Configuration for the web search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Provider name: "serper" (HTTP) or "static" (no network, empty results).
    pub provider: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override.
    pub base_url: Option<String>,
    /// Number of results requested per query.
    pub results_per_query: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "serper".to_string(),
            api_key_env: "SERPER_API_KEY".to_string(),
            base_url: None,
            results_per_query: 5,
        }
    }
}

/// What to do when research yields no usable sources at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnResearchFailure {
    /// Return an empty list; the caller proceeds without grounding data.
    #[default]
    PropagateEmpty,
    /// Ask the model for general background summaries, tagged as model-sourced.
    ModelFallback,
}

/// Configuration for query planning, ranking and the research cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Upper bound on planned search queries.
    pub max_queries: usize,
    /// Size of the ranked shortlist handed to summarization (6-8).
    pub shortlist_size: usize,
    /// Sources must score above this to survive the first filter pass.
    pub primary_threshold: u32,
    /// Relaxed threshold used when too few sources survive.
    pub fallback_threshold: u32,
    /// Minimum survivors before the relaxed pass kicks in.
    pub min_survivors: usize,
    /// Lifetime of a cached research result.
    pub cache_ttl_secs: u64,
    /// Maximum number of cached research results.
    pub cache_capacity: usize,
    /// Optional interval for a background sweep of expired entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_secs: Option<u64>,
    /// Behavior when no sources are found.
    pub on_research_failure: OnResearchFailure,
    /// Maximum characters of source text embedded in a summarization prompt.
    pub max_source_chars: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_queries: 15,
            shortlist_size: 8,
            primary_threshold: 25,
            fallback_threshold: 15,
            min_survivors: 3,
            cache_ttl_secs: 3600,
            cache_capacity: 256,
            sweep_interval_secs: None,
            on_research_failure: OnResearchFailure::PropagateEmpty,
            max_source_chars: 4000,
        }
    }
}

/// Configuration for draft generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Fractional tolerance for the first attempt (0.05 = +/-5%).
    pub tolerance: f64,
    /// Fractional tolerance applied to the single retry.
    pub retry_tolerance: f64,
    /// Reading speed used to derive reading time.
    pub words_per_minute: usize,
    /// Maximum meta description length in characters.
    pub meta_description_max_chars: usize,
    /// Temperature for drafting calls.
    pub temperature: f32,
    /// Whether to request an outline before drafting.
    pub outline: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            retry_tolerance: 0.10,
            words_per_minute: 200,
            meta_description_max_chars: 160,
            temperature: 0.7,
            outline: true,
        }
    }
}

/// Thresholds for SEO analysis and recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoConfig {
    /// Minimum keyword density in percent.
    pub min_density: f64,
    /// Maximum keyword density in percent.
    pub max_density: f64,
    /// Flesch Reading Ease target.
    pub target_readability: f64,
    /// Internal links below this count produce a recommendation.
    pub min_internal_links: usize,
    /// Headings below this count produce a recommendation.
    pub min_headings: usize,
    /// Internal link matches must exceed this relevance (0.0-1.0).
    pub link_relevance_threshold: f64,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            min_density: 0.5,
            max_density: 2.5,
            target_readability: 60.0,
            min_internal_links: 3,
            min_headings: 2,
            link_relevance_threshold: 0.3,
        }
    }
}

/// Concurrency, rate and timeout limits for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum in-flight model requests.
    pub max_concurrent_llm: usize,
    /// Maximum in-flight search requests.
    pub max_concurrent_search: usize,
    /// Model requests per minute (0 = unlimited).
    pub llm_rpm: usize,
    /// Search requests per minute (0 = unlimited).
    pub search_rpm: usize,
    /// Per-call timeout for model requests.
    pub llm_timeout_secs: u64,
    /// Per-call timeout for search requests.
    pub search_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_llm: 4,
            max_concurrent_search: 6,
            llm_rpm: 0,
            search_rpm: 0,
            llm_timeout_secs: 60,
            search_timeout_secs: 15,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PenwrightConfig {
    /// Check cross-field invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        if self.research.max_queries == 0 {
            return invalid("research.max_queries must be greater than zero");
        }
        if !(6..=8).contains(&self.research.shortlist_size) {
            return invalid("research.shortlist_size must be between 6 and 8");
        }
        if self.research.fallback_threshold >= self.research.primary_threshold {
            return invalid("research.fallback_threshold must be below research.primary_threshold");
        }
        if self.research.cache_capacity == 0 {
            return invalid("research.cache_capacity must be greater than zero");
        }
        if self.research.cache_ttl_secs == 0 {
            return invalid("research.cache_ttl_secs must be greater than zero");
        }
        if !(self.generation.tolerance > 0.0 && self.generation.tolerance < 1.0) {
            return invalid("generation.tolerance must be in the range (0, 1)");
        }
        if self.generation.retry_tolerance < self.generation.tolerance
            || self.generation.retry_tolerance >= 1.0
        {
            return invalid(
                "generation.retry_tolerance must be at least generation.tolerance and below 1",
            );
        }
        if self.generation.words_per_minute == 0 {
            return invalid("generation.words_per_minute must be greater than zero");
        }
        if self.seo.min_density < 0.0 || self.seo.min_density >= self.seo.max_density {
            return invalid("seo.min_density must be non-negative and below seo.max_density");
        }
        if !(0.0..=1.0).contains(&self.seo.link_relevance_threshold) {
            return invalid("seo.link_relevance_threshold must be in the range 0.0-1.0");
        }
        if self.limits.max_concurrent_llm == 0 || self.limits.max_concurrent_search == 0 {
            return invalid("limits.max_concurrent_* must be greater than zero");
        }
        if self.limits.llm_timeout_secs == 0 || self.limits.search_timeout_secs == 0 {
            return invalid("limits.*_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `PENWRIGHT_`)
/// 3. Workspace-local config (`.penwright/config.toml`)
/// 4. User config (`~/.config/penwright/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&PenwrightConfig>,
) -> Result<PenwrightConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(PenwrightConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "penwright", "penwright") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".penwright").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // PENWRIGHT_LLM__MODEL, PENWRIGHT_RESEARCH__CACHE_TTL_SECS, etc.
    figment = figment.merge(Env::prefixed("PENWRIGHT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Render the built-in defaults as TOML, suitable for seeding a config file.
pub fn default_config_toml() -> Result<String, ConfigError> {
    toml::to_string_pretty(&PenwrightConfig::default()).map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
