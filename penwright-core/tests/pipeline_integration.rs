//! Integration tests for the content pipeline.
//!
//! These tests drive research, generation and analysis end-to-end using
//! MockLlmProvider and StaticSearchProvider, so no network is involved.

use penwright_core::config::{GenerationConfig, PenwrightConfig};
use penwright_core::generation::{ContentRequest, ContentType, GenerationState};
use penwright_core::search::{SearchHit, StaticSearchProvider};
use penwright_core::types::CompletionRequest;
use penwright_core::{AuthorityTier, ContentPipeline, MockLlmProvider, PenwrightError, PipelineError};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const SUMMARY_REPLY: &str = r#"{"title":"Async Rust in practice","key_points":["Tokio schedules tasks cooperatively"],"expert_quotes":[],"data_points":["40% fewer threads"],"relevance_score":85,"source_authority":"high"}"#;

fn hits() -> Vec<SearchHit> {
    vec![
        SearchHit::new(
            "Async Rust explained",
            "https://www.rust-lang.org/async",
            "A long look at futures, executors and the tokio runtime in production systems today.",
        ),
        SearchHit::new("Async research", "https://nature.com/async-rust", "Study of runtimes."),
        SearchHit::new("Rust async at scale", "https://docs.rs/tokio", "Tokio API reference."),
    ]
}

fn body(words: usize) -> String {
    let mut text = String::from("## Async Rust\n");
    let filler = "Async rust keeps servers fast and simple to reason about.";
    while text.split_whitespace().count() + 10 <= words {
        text.push_str(filler);
        text.push(' ');
    }
    while text.split_whitespace().count() < words {
        text.push_str("word ");
    }
    text
}

/// Answers every call by looking at which system preamble it carries.
fn responder(draft_words: usize) -> impl Fn(&CompletionRequest) -> Option<String> + Send + Sync {
    move |req| {
        let system = req.messages.first().map(|m| m.content.clone())?;
        let user = req.last_user_text()?;
        if system.contains("research analyst") {
            return Some(SUMMARY_REPLY.to_string());
        }
        if system.contains("meta descriptions") {
            return Some(r#"{"meta_description":"A practical guide to async Rust."}"#.to_string());
        }
        if user.contains("Plan the structure") {
            return Some(
                r#"{"title":"Async Rust","sections":[{"heading":"Runtimes","key_points":["tokio"]}]}"#
                    .to_string(),
            );
        }
        Some(
            serde_json::json!({
                "title": "Async Rust Guide",
                "content": body(draft_words),
                "meta_description": "draft meta"
            })
            .to_string(),
        )
    }
}

fn pipeline(mock: Arc<MockLlmProvider>, search: Arc<StaticSearchProvider>) -> ContentPipeline {
    ContentPipeline::new(&PenwrightConfig::default(), mock, search).unwrap()
}

#[tokio::test]
async fn test_research_returns_attributed_summaries() {
    let mock = Arc::new(MockLlmProvider::with_responder(responder(300)));
    let search = Arc::new(StaticSearchProvider::new().with_default_hits(hits()));
    let pipeline = pipeline(mock, search);

    let summaries = pipeline.research("async rust", &["tokio".to_string()]).await;
    assert_eq!(summaries.len(), 3);
    for summary in &summaries {
        assert!(summary.url.starts_with("https://"));
        assert!(!summary.key_points.is_empty());
        assert!(summary.key_points.len() <= 5);
        assert!(summary.relevance_score <= 100);
        assert_eq!(summary.source_authority, AuthorityTier::High);
    }
}

#[tokio::test]
async fn test_repeat_research_within_ttl_skips_collaborators() {
    let mock = Arc::new(MockLlmProvider::with_responder(responder(300)));
    let search = Arc::new(StaticSearchProvider::new().with_default_hits(hits()));
    let pipeline = pipeline(mock.clone(), search.clone());
    let keywords = vec!["tokio".to_string(), "async".to_string()];

    let first = pipeline.research("Async Rust", &keywords).await;
    let calls = (search.call_count(), mock.call_count());
    let reordered = vec!["async".to_string(), "tokio".to_string()];
    let second = pipeline.research("  async   rust ", &reordered).await;

    assert_eq!(first, second);
    assert_eq!((search.call_count(), mock.call_count()), calls);
    let stats = pipeline.cache_stats();
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_concurrent_identical_research_computes_once() {
    let mock = Arc::new(MockLlmProvider::with_responder(responder(300)));
    let search = Arc::new(StaticSearchProvider::new().with_default_hits(hits()));
    let pipeline = Arc::new(pipeline(mock, search.clone()));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.research("async rust", &[]).await })
        })
        .collect();
    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    let planned = penwright_core::research::QueryPlanner::new(15)
        .plan("async rust", &[])
        .len();
    assert_eq!(search.call_count(), planned);
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_synthesize_end_to_end() {
    let mock = Arc::new(MockLlmProvider::with_responder(responder(500)));
    let search = Arc::new(StaticSearchProvider::new().with_default_hits(hits()));
    let pipeline = pipeline(mock, search);

    let request = ContentRequest::new("async rust", ContentType::BlogPost, 500)
        .with_keywords(vec!["async rust".to_string()]);
    let result = pipeline.synthesize(request, None).await.unwrap();

    assert_eq!(result.research.len(), 3);
    assert_eq!(result.report.final_state, GenerationState::Accepted);
    assert_eq!(result.report.attempts, 1);
    assert_eq!(result.draft.word_count, 500);
    assert_eq!(result.draft.meta_description, "A practical guide to async Rust.");
    assert_eq!(result.draft.seo_score, result.analysis.seo_score);
    assert!(result.analysis.keyword_density.contains_key("async rust"));
}

#[tokio::test]
async fn test_generate_short_draft_retries_once() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_response(
        serde_json::json!({"title": "Short", "content": body(317)}).to_string(),
    );
    mock.queue_response(
        serde_json::json!({"title": "Longer", "content": body(980)}).to_string(),
    );
    mock.queue_response(r#"{"meta_description":"Meta."}"#);

    let config = PenwrightConfig {
        generation: GenerationConfig {
            outline: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let pipeline = ContentPipeline::new(
        &config,
        mock.clone(),
        Arc::new(StaticSearchProvider::new()),
    )
    .unwrap();

    let request = ContentRequest::new("async rust", ContentType::Article, 1000);
    let (draft, report) = pipeline.generate_detailed(&request).await.unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(report.final_state, GenerationState::Accepted);
    assert_eq!(draft.title, "Longer");
    assert_eq!(draft.word_count, 980);
    let prompts = mock.prompts();
    assert!(prompts[1].contains("Your previous draft had 317 words."));
}

#[tokio::test]
async fn test_generate_rejects_empty_topic() {
    let pipeline = pipeline(
        Arc::new(MockLlmProvider::new()),
        Arc::new(StaticSearchProvider::new()),
    );
    let request = ContentRequest::new("  ", ContentType::BlogPost, 500);
    let err = pipeline.generate(&request).await.unwrap_err();
    assert!(matches!(
        err,
        PenwrightError::Pipeline(PipelineError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn test_research_with_no_results_is_empty_and_uncached() {
    let mock = Arc::new(MockLlmProvider::new());
    let pipeline = pipeline(mock.clone(), Arc::new(StaticSearchProvider::new()));

    let summaries = pipeline.research("obscure topic", &[]).await;
    assert!(summaries.is_empty());
    assert_eq!(mock.call_count(), 0);
    assert_eq!(pipeline.cache_stats().hits, 0);
}

#[tokio::test]
async fn test_research_required_reports_missing_sources() {
    let pipeline = pipeline(
        Arc::new(MockLlmProvider::new()),
        Arc::new(StaticSearchProvider::new()),
    );
    let err = pipeline
        .research_required(" obscure topic ", &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PenwrightError::Pipeline(PipelineError::NoResearch { ref topic }) if topic == "obscure topic"
    ));
}
