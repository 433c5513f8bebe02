//! # Penwright Core
//!
//! Core library for the Penwright content synthesis pipeline.
//! Provides research planning, source ranking, a single-flight research
//! cache, attributed summarization, word-count controlled generation,
//! SEO scoring, and the resilient structured-output extractor they share.

pub mod brain;
pub mod config;
pub mod error;
pub mod extract;
pub mod generation;
pub mod pipeline;
pub mod providers;
pub mod research;
pub mod sanitize;
pub mod search;
pub mod seo;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{Brain, LlmProvider, MockLlmProvider};
pub use config::{OnResearchFailure, PenwrightConfig, load_config};
pub use error::{PenwrightError, PipelineError, Result};
pub use extract::{FieldKind, FieldRequirement, StructuredParseResult, extract, extract_into};
pub use generation::{
    ContentDraft, ContentGenerator, ContentRequest, ContentType, GenerationReport,
    GenerationState,
};
pub use pipeline::{ContentPipeline, SynthesisResult};
pub use research::{
    AuthorityTier, ResearchCache, ResearchEngine, ResearchOutcome, ResearchSummary,
};
pub use search::{SearchHit, SearchProvider, StaticSearchProvider};
pub use seo::{Priority, SeoAnalysis, SeoAnalyzer};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
