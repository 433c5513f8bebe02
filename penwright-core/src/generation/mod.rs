//! Content generation stage.
//!
//! Outline → draft under word-count control → meta description → local SEO
//! score. Word count and reading time are always derived from the final
//! text, never taken from the model.

pub mod controller;
pub mod prompts;

use crate::brain::Brain;
use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::extract::{StructuredParseResult, extract_into, schemas};
use crate::research::ResearchSummary;
use crate::sanitize::{first_sentence, truncate_at_word_boundary};
use crate::seo::{SeoAnalysis, SeoAnalyzer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use controller::{
    ControlledDraft, Correction, GenerationState, MAX_WORD_COUNT_RETRIES, ToleranceBand,
    WordCountController, count_words, reading_time,
};

/// Kind of content to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    BlogPost,
    Article,
    LandingPage,
    Newsletter,
    SocialPost,
    Whitepaper,
    ProductDescription,
    CaseStudy,
}

impl ContentType {
    /// Style guidance embedded in prompts.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::BlogPost => "conversational, scannable, with a clear takeaway",
            Self::Article => "informative and balanced, with evidence for each claim",
            Self::LandingPage => "benefit-led, persuasive, ending with a call to action",
            Self::Newsletter => "personal and timely, with short sections",
            Self::SocialPost => "punchy and brief, with a hook in the first line",
            Self::Whitepaper => "authoritative and detailed, with data-backed arguments",
            Self::ProductDescription => "concrete features and benefits for the buyer",
            Self::CaseStudy => "problem, approach and measurable results",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BlogPost => "blog post",
            Self::Article => "article",
            Self::LandingPage => "landing page",
            Self::Newsletter => "newsletter",
            Self::SocialPost => "social media post",
            Self::Whitepaper => "whitepaper",
            Self::ProductDescription => "product description",
            Self::CaseStudy => "case study",
        };
        write!(f, "{s}")
    }
}

/// Everything needed to generate one piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRequest {
    pub topic: String,
    pub content_type: ContentType,
    pub audience: String,
    pub tone: String,
    pub purpose: String,
    #[serde(default)]
    pub research: Vec<ResearchSummary>,
    pub target_word_count: usize,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ContentRequest {
    pub fn new(topic: impl Into<String>, content_type: ContentType, target_word_count: usize) -> Self {
        Self {
            topic: topic.into(),
            content_type,
            audience: "general readers".to_string(),
            tone: "professional".to_string(),
            purpose: "inform".to_string(),
            research: Vec::new(),
            target_word_count,
            keywords: Vec::new(),
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    pub fn with_research(mut self, research: Vec<ResearchSummary>) -> Self {
        self.research = research;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.topic.trim().is_empty() {
            return Err(PipelineError::InvalidInput {
                message: "topic must not be empty".to_string(),
            });
        }
        if self.target_word_count == 0 {
            return Err(PipelineError::InvalidInput {
                message: "target_word_count must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// A generated piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub title: String,
    pub content: String,
    /// Whitespace-token count of `content`.
    pub word_count: usize,
    /// Minutes, rounded up.
    pub reading_time: usize,
    pub keywords: Vec<String>,
    pub meta_description: String,
    /// Local SEO score, 0-100.
    pub seo_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub heading: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<OutlineSection>,
}

/// How a draft came to be.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub attempts: usize,
    pub final_state: GenerationState,
    pub target_word_count: usize,
    /// Signed deviation of the final word count from the target, in percent.
    pub deviation_pct: f64,
    pub outline_used: bool,
    pub meta_from_model: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftReply {
    title: String,
    content: String,
    #[serde(default)]
    meta_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaReply {
    meta_description: String,
}

#[derive(Debug, Deserialize)]
struct OptimizedReply {
    title: String,
    content: String,
    #[serde(default)]
    meta_description: Option<String>,
    /// Self-assessed by the model; never used for the stored score.
    #[allow(dead_code)]
    seo_score: f64,
}

/// Drives the model through outline, draft and meta description calls.
pub struct ContentGenerator {
    brain: Arc<Brain>,
    config: GenerationConfig,
    seo: SeoAnalyzer,
}

impl ContentGenerator {
    pub fn new(brain: Arc<Brain>, config: GenerationConfig, seo: SeoAnalyzer) -> Self {
        Self { brain, config, seo }
    }

    /// Generate a draft for `request`.
    pub async fn generate(&self, request: &ContentRequest) -> Result<ContentDraft, PipelineError> {
        self.generate_detailed(request).await.map(|(draft, _)| draft)
    }

    /// Generate a draft and report the control decisions made along the way.
    ///
    /// Fails only on invalid input or when no attempt produced a parseable
    /// draft. A missed word-count target is returned as best effort.
    pub async fn generate_detailed(
        &self,
        request: &ContentRequest,
    ) -> Result<(ContentDraft, GenerationReport), PipelineError> {
        request.validate()?;

        let outline = if self.config.outline {
            self.outline(request).await
        } else {
            None
        };

        let controller = WordCountController::new(
            request.target_word_count,
            self.config.tolerance,
            self.config.retry_tolerance,
        );
        let controlled = controller
            .run(
                |correction| self.draft_attempt(request, outline.as_ref(), correction),
                |reply: &DraftReply| count_words(&reply.content),
            )
            .await
            .ok_or_else(|| PipelineError::GenerationFailed {
                reason: "no parseable draft after retry".to_string(),
            })?;

        let ControlledDraft {
            candidate,
            words,
            state,
            attempts,
            ..
        } = controlled;

        let title = candidate.title.trim().to_string();
        let content = candidate.content.trim().to_string();
        let (meta_description, meta_from_model) = self
            .meta_description(&title, &content, candidate.meta_description.as_deref())
            .await;
        let seo_score = self
            .seo
            .analyze(&content, &request.keywords, None)
            .seo_score;

        let report = GenerationReport {
            attempts,
            final_state: state,
            target_word_count: request.target_word_count,
            deviation_pct: controller.band().deviation_pct(words),
            outline_used: outline.is_some(),
            meta_from_model,
        };
        info!(
            words,
            target = request.target_word_count,
            attempts,
            state = %state,
            seo_score,
            "Draft generated"
        );

        let draft = ContentDraft {
            title,
            word_count: count_words(&content),
            reading_time: reading_time(words, self.config.words_per_minute),
            content,
            keywords: request.keywords.clone(),
            meta_description,
            seo_score,
        };
        Ok((draft, report))
    }

    /// Rewrite `draft` to address `analysis`.
    ///
    /// The rewrite is kept only if it parses against the SEO schema and its
    /// locally computed score is at least the original's; otherwise the
    /// original draft is returned unchanged.
    pub async fn optimize(&self, draft: &ContentDraft, analysis: &SeoAnalysis) -> ContentDraft {
        let prompt = prompts::optimize_prompt(draft, analysis);
        let text = match self
            .brain
            .ask_with_temperature(prompts::WRITER_SYSTEM_PROMPT, &prompt, self.config.temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Optimization call failed, keeping original draft");
                return draft.clone();
            }
        };

        let reply: OptimizedReply = match extract_into(&text, schemas::SEO) {
            StructuredParseResult::Ok(reply) => reply,
            other => {
                warn!(outcome = other.kind(), "Optimization reply unusable, keeping original draft");
                return draft.clone();
            }
        };

        let content = reply.content.trim().to_string();
        let rescored = self.seo.analyze(&content, &draft.keywords, None).seo_score;
        if rescored < draft.seo_score {
            info!(
                before = draft.seo_score,
                after = rescored,
                "Rewrite scored lower, keeping original draft"
            );
            return draft.clone();
        }

        let word_count = count_words(&content);
        let meta_description = reply
            .meta_description
            .map(|m| truncate_at_word_boundary(&m, self.config.meta_description_max_chars))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| draft.meta_description.clone());
        info!(before = draft.seo_score, after = rescored, word_count, "Draft optimized");

        ContentDraft {
            title: reply.title.trim().to_string(),
            reading_time: reading_time(word_count, self.config.words_per_minute),
            word_count,
            content,
            keywords: draft.keywords.clone(),
            meta_description,
            seo_score: rescored,
        }
    }

    async fn outline(&self, request: &ContentRequest) -> Option<Outline> {
        let prompt = prompts::outline_prompt(request);
        let text = match self
            .brain
            .ask_with_temperature(prompts::WRITER_SYSTEM_PROMPT, &prompt, self.config.temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Outline call failed, drafting without outline");
                return None;
            }
        };
        match extract_into::<Outline>(&text, schemas::OUTLINE) {
            StructuredParseResult::Ok(outline) if !outline.sections.is_empty() => {
                debug!(sections = outline.sections.len(), "Outline ready");
                Some(outline)
            }
            other => {
                warn!(outcome = other.kind(), "Outline unusable, drafting without outline");
                None
            }
        }
    }

    async fn draft_attempt(
        &self,
        request: &ContentRequest,
        outline: Option<&Outline>,
        correction: Option<Correction>,
    ) -> Option<DraftReply> {
        let prompt = prompts::draft_prompt(request, outline, correction);
        let text = match self
            .brain
            .ask_with_temperature(prompts::WRITER_SYSTEM_PROMPT, &prompt, self.config.temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Draft call failed");
                return None;
            }
        };
        match extract_into::<DraftReply>(&text, schemas::CONTENT) {
            StructuredParseResult::Ok(reply) => Some(reply),
            StructuredParseResult::Malformed { .. } => {
                warn!("Draft reply malformed");
                None
            }
            StructuredParseResult::InvalidSchema { missing_fields, .. } => {
                warn!(?missing_fields, "Draft reply failed validation");
                None
            }
        }
    }

    /// Meta description from a dedicated call over the final body.
    ///
    /// Falls back to the draft call's own description, then to the body's
    /// first sentence. Returns whether the model supplied it.
    async fn meta_description(
        &self,
        title: &str,
        body: &str,
        from_draft: Option<&str>,
    ) -> (String, bool) {
        let max = self.config.meta_description_max_chars;
        let prompt = prompts::meta_prompt(title, body, max);
        let dedicated = match self.brain.ask(prompts::META_SYSTEM_PROMPT, &prompt).await {
            Ok(text) => extract_into::<MetaReply>(&text, schemas::META)
                .ok()
                .map(|m| m.meta_description),
            Err(e) => {
                warn!(error = %e, "Meta description call failed");
                None
            }
        };

        if let Some(meta) = dedicated
            .as_deref()
            .or(from_draft)
            .map(|m| truncate_at_word_boundary(m, max))
            .filter(|m| !m.is_empty())
        {
            return (meta, true);
        }

        debug!("Deriving meta description from the first sentence");
        let derived = first_sentence(body)
            .map(|s| truncate_at_word_boundary(&s, max))
            .unwrap_or_default();
        (derived, false)
    }
}
