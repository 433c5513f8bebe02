//! Query planning.
//!
//! Derives a bounded list of search queries from a topic and keyword list.
//! Planning is pure and deterministic: identical input yields the same
//! queries in the same order, which keeps ranking tie-breaks reproducible.

use std::collections::HashSet;

/// Topical templates applied to every topic, in order.
const TEMPLATES: &[&str] = &[
    "{topic} trends",
    "{topic} best practices",
    "{topic} guide",
    "{topic} statistics",
    "{topic} expert insights",
    "{topic} case studies",
    "latest {topic} research",
];

/// Controlled vocabulary: a concept matched by substring adds focused variants.
const CONCEPTS: &[(&str, &[&str])] = &[
    ("health", &["clinical studies", "medical guidelines"]),
    ("medic", &["clinical studies", "medical guidelines"]),
    ("finance", &["market data", "regulation"]),
    ("invest", &["market data", "risk analysis"]),
    ("market", &["industry report", "consumer survey"]),
    ("software", &["benchmarks", "documentation"]),
    ("program", &["benchmarks", "documentation"]),
    ("ai", &["research papers", "benchmarks"]),
    ("machine learning", &["research papers", "benchmarks"]),
    ("security", &["vulnerability report", "standards"]),
    ("climate", &["scientific data", "policy"]),
    ("energy", &["scientific data", "policy"]),
    ("education", &["learning outcomes", "academic research"]),
    ("business", &["industry report", "case study"]),
    ("seo", &["ranking factors", "search data"]),
];

/// Plans search queries for a research request.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    max_queries: usize,
}

impl QueryPlanner {
    pub fn new(max_queries: usize) -> Self {
        Self { max_queries }
    }

    /// Build the query list: templates, then the topic with each keyword, then
    /// concept variants. Duplicates (case-insensitive) are skipped and the
    /// list is capped at `max_queries`.
    pub fn plan(&self, topic: &str, keywords: &[String]) -> Vec<String> {
        let topic = collapse_whitespace(topic);
        if topic.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut queries = Vec::new();
        let mut push = |query: String| {
            let query = collapse_whitespace(&query);
            if !query.is_empty() && seen.insert(query.to_lowercase()) {
                queries.push(query);
            }
        };

        for template in TEMPLATES {
            push(template.replace("{topic}", &topic));
        }

        for keyword in keywords {
            let keyword = collapse_whitespace(keyword);
            if keyword.is_empty() {
                continue;
            }
            push(format!("{topic} {keyword}"));
        }

        for hint in concept_hints(&topic) {
            push(format!("{topic} {hint}"));
        }

        queries.truncate(self.max_queries);
        queries
    }
}

/// Focus hints for every vocabulary concept the topic mentions.
///
/// Short concepts (three letters or fewer) must match a whole word so that
/// "ai" does not fire on "maintain".
pub fn concept_hints(topic: &str) -> Vec<&'static str> {
    let lower = topic.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut hints = Vec::new();
    for (concept, variants) in CONCEPTS {
        let matched = if concept.len() <= 3 {
            words.contains(concept)
        } else {
            lower.contains(concept)
        };
        if matched {
            for variant in *variants {
                if !hints.contains(variant) {
                    hints.push(*variant);
                }
            }
        }
    }
    hints
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
