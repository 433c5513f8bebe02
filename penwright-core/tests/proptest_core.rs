//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use penwright_core::config::ResearchConfig;
use penwright_core::extract::{StructuredParseResult, extract, schemas};
use penwright_core::generation::{ToleranceBand, count_words};
use penwright_core::research::{CacheKey, QueryPlanner, SourceRanker, domain_authority};
use penwright_core::search::SearchHit;
use penwright_core::seo::{SeoAnalyzer, flesch_reading_ease, levenshtein_distance};

// --- Structured-output extraction properties ---

proptest! {
    #[test]
    fn extract_never_panics(raw in "\\PC{0,200}") {
        let _ = extract(&raw, schemas::CONTENT);
    }

    #[test]
    fn extract_never_panics_on_brace_soup(raw in "[{}\"\\\\:,a-z \\n]{0,120}") {
        let _ = extract(&raw, schemas::SEO);
    }

    #[test]
    fn extract_recovers_fenced_objects(title in "[A-Za-z ]{1,30}", content in "[A-Za-z .]{1,80}") {
        prop_assume!(!title.trim().is_empty() && !content.trim().is_empty());
        let raw = format!(
            "Sure!\n```json\n{}\n```",
            serde_json::json!({"title": title, "content": content})
        );
        prop_assert!(extract(&raw, schemas::CONTENT).is_ok());
    }

    #[test]
    fn extract_without_braces_is_malformed(raw in "[^{}]{0,100}") {
        let is_malformed = matches!(
            extract(&raw, schemas::CONTENT),
            StructuredParseResult::Malformed { .. }
        );
        prop_assert!(is_malformed);
    }
}

// --- Query planner properties ---

proptest! {
    #[test]
    fn plan_is_bounded_and_unique(
        topic in "[a-z]{1,10}( [a-z]{1,10}){0,4}",
        keywords in prop::collection::vec("[a-z]{1,8}", 0..8),
        max in 1usize..20,
    ) {
        let plan = QueryPlanner::new(max).plan(&topic, &keywords);
        prop_assert!(plan.len() <= max);
        prop_assert!(!plan.is_empty());
        let mut lowered: Vec<String> = plan.iter().map(|q| q.to_lowercase()).collect();
        lowered.sort();
        lowered.dedup();
        prop_assert_eq!(lowered.len(), plan.len());
    }

    #[test]
    fn plan_has_no_blank_queries(topic in "\\PC{0,40}") {
        for query in QueryPlanner::new(15).plan(&topic, &[]) {
            prop_assert!(!query.trim().is_empty());
        }
    }
}

// --- Source ranker properties ---

fn arb_hit() -> impl Strategy<Value = SearchHit> {
    (
        "[a-z]{1,10}( [a-z]{1,10}){0,3}",
        prop::sample::select(vec![
            "https://nature.com/a",
            "https://www.rust-lang.org/b",
            "https://someblog.com/c",
            "https://example.xyz/d",
            "https://cs.stanford.edu/e",
            "not a url",
        ]),
        "[a-z ]{0,150}",
    )
        .prop_map(|(title, url, snippet)| SearchHit::new(title, url, snippet))
}

proptest! {
    #[test]
    fn ranked_shortlist_is_capped_and_sorted(
        hits in prop::collection::vec(arb_hit(), 0..30),
        topic in "[a-z]{1,10}",
    ) {
        let config = ResearchConfig::default();
        let ranked = SourceRanker::new(&config).rank(hits, &topic);
        prop_assert!(ranked.len() <= config.shortlist_size);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for source in &ranked {
            prop_assert!(source.score <= 100);
            prop_assert!(source.score > config.fallback_threshold);
        }
    }

    #[test]
    fn domain_authority_is_bounded(url in "\\PC{0,60}") {
        prop_assert!(domain_authority(&url) <= 100);
    }
}

// --- Cache key properties ---

proptest! {
    #[test]
    fn cache_key_ignores_keyword_order_and_case(
        topic in "[a-zA-Z ]{1,30}",
        mut keywords in prop::collection::vec("[a-zA-Z]{1,8}", 0..6),
    ) {
        let a = CacheKey::new(&topic, &keywords);
        keywords.reverse();
        let upper: Vec<String> = keywords.iter().map(|k| k.to_uppercase()).collect();
        let b = CacheKey::new(&topic.to_uppercase(), &upper);
        prop_assert_eq!(a, b);
    }
}

// --- Generation and SEO properties ---

proptest! {
    #[test]
    fn tolerance_band_contains_target(target in 1usize..10_000, tolerance in 0.01f64..0.5) {
        let band = ToleranceBand::new(target, tolerance);
        prop_assert!(band.contains(target));
        prop_assert!(band.min() <= target && target <= band.max());
    }

    #[test]
    fn word_count_matches_whitespace_split(text in "\\PC{0,300}") {
        prop_assert_eq!(count_words(&text), text.split_whitespace().count());
    }

    #[test]
    fn flesch_is_clamped(text in "[a-z .!?]{0,400}") {
        let stats = flesch_reading_ease(&text);
        prop_assert!((0.0..=100.0).contains(&stats.flesch));
        prop_assert!(stats.score() <= 100);
    }

    #[test]
    fn levenshtein_is_symmetric_and_bounded(a in "\\PC{0,20}", b in "\\PC{0,20}") {
        let d = levenshtein_distance(&a, &b);
        prop_assert_eq!(d, levenshtein_distance(&b, &a));
        prop_assert!(d <= a.chars().count().max(b.chars().count()));
    }

    #[test]
    fn seo_score_is_bounded(
        content in "[a-zA-Z #.\\n]{0,500}",
        keywords in prop::collection::vec("[a-z]{1,8}", 0..4),
    ) {
        let analysis = SeoAnalyzer::default().analyze(&content, &keywords, None);
        prop_assert!(analysis.seo_score <= 100);
        prop_assert!(analysis.readability_score <= 100);
    }
}
