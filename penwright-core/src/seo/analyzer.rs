//! SEO analysis: scores a piece of content and produces prioritized suggestions.

use super::density::keyword_density;
use super::links::{
    InternalLink, existing_links, find_link_opportunities, strip_links_and_tags,
};
use super::readability::{ReadabilityStats, flesch_reading_ease};
use crate::config::SeoConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static HTML_HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-6][\s>]").ok());

const DENSITY_PENALTY: f64 = 10.0;
const READABILITY_PENALTY_PER_POINT: f64 = 0.5;
const NO_LINKS_PENALTY: f64 = 15.0;
const FEW_LINKS_PENALTY: f64 = 5.0;
const HIGH_PRIORITY_PENALTY: f64 = 10.0;

/// Suggestion urgency. Sorts High first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    KeywordDensity,
    Readability,
    InternalLinks,
    Structure,
}

/// One optimization recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub priority: Priority,
    pub category: SuggestionCategory,
    pub message: String,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.priority, self.message)
    }
}

/// Result of analyzing one piece of content. Stateless and recomputable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoAnalysis {
    /// Keyword to density in percent.
    pub keyword_density: BTreeMap<String, f64>,
    /// Flesch Reading Ease, 0-100.
    pub readability_score: u8,
    pub readability: ReadabilityStats,
    pub internal_links: Vec<InternalLink>,
    /// Internal links already present in the content.
    pub existing_internal_links: usize,
    pub headings: usize,
    /// Rendered suggestions, High before Medium before Low.
    pub suggestions: Vec<String>,
    pub recommendations: Vec<Suggestion>,
    /// Aggregate score, 0-100.
    pub seo_score: u8,
}

impl SeoAnalysis {
    pub fn high_priority_count(&self) -> usize {
        self.recommendations
            .iter()
            .filter(|s| s.priority == Priority::High)
            .count()
    }
}

/// Deterministic SEO and readability scorer.
#[derive(Debug, Clone, Default)]
pub struct SeoAnalyzer {
    config: SeoConfig,
}

impl SeoAnalyzer {
    pub fn new(config: SeoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeoConfig {
        &self.config
    }

    /// Analyze `content` against `target_keywords`, matching internal link
    /// opportunities against `existing_internal_urls` when given.
    pub fn analyze(
        &self,
        content: &str,
        target_keywords: &[String],
        existing_internal_urls: Option<&[String]>,
    ) -> SeoAnalysis {
        let candidates = existing_internal_urls.unwrap_or(&[]);
        let plain = plain_text(content);

        let keyword_density = keyword_density(&plain, target_keywords);
        let readability = flesch_reading_ease(&plain);
        let present_links = existing_links(content);
        let internal_links = find_link_opportunities(
            &plain,
            target_keywords,
            &present_links,
            candidates,
            self.config.link_relevance_threshold,
        );
        let existing_internal_links = present_links
            .iter()
            .filter(|l| l.is_internal(candidates))
            .count();
        let headings = count_headings(content);

        let link_count = internal_links.len() + existing_internal_links;
        let mut recommendations =
            self.recommend(&keyword_density, &readability, link_count, headings);
        recommendations.sort_by_key(|s| s.priority);

        let seo_score = self.score(&keyword_density, &readability, link_count, &recommendations);

        SeoAnalysis {
            suggestions: recommendations.iter().map(ToString::to_string).collect(),
            keyword_density,
            readability_score: readability.score(),
            readability,
            internal_links,
            existing_internal_links,
            headings,
            recommendations,
            seo_score,
        }
    }

    fn in_band(&self, density: f64) -> bool {
        density >= self.config.min_density && density <= self.config.max_density
    }

    fn recommend(
        &self,
        densities: &BTreeMap<String, f64>,
        readability: &ReadabilityStats,
        link_count: usize,
        headings: usize,
    ) -> Vec<Suggestion> {
        let cfg = &self.config;
        let mut out = Vec::new();

        for (keyword, &density) in densities {
            if density < cfg.min_density {
                out.push(Suggestion {
                    priority: Priority::High,
                    category: SuggestionCategory::KeywordDensity,
                    message: format!(
                        "Use \"{keyword}\" more often: density is {density:.2}%, aim for at least {:.1}%",
                        cfg.min_density
                    ),
                });
            } else if density > cfg.max_density {
                out.push(Suggestion {
                    priority: Priority::Medium,
                    category: SuggestionCategory::KeywordDensity,
                    message: format!(
                        "Use \"{keyword}\" less often: density is {density:.2}%, keep it under {:.1}%",
                        cfg.max_density
                    ),
                });
            }
        }

        if readability.flesch < cfg.target_readability {
            out.push(Suggestion {
                priority: Priority::High,
                category: SuggestionCategory::Readability,
                message: format!(
                    "Improve readability: score {} is below the target of {:.0}. Shorten sentences and prefer simpler words",
                    readability.score(),
                    cfg.target_readability
                ),
            });
        }

        if link_count == 0 {
            out.push(Suggestion {
                priority: Priority::Medium,
                category: SuggestionCategory::InternalLinks,
                message: format!(
                    "Add internal links to related pages (aim for at least {})",
                    cfg.min_internal_links
                ),
            });
        } else if link_count < cfg.min_internal_links {
            out.push(Suggestion {
                priority: Priority::Low,
                category: SuggestionCategory::InternalLinks,
                message: format!(
                    "Add more internal links: {link_count} found, aim for at least {}",
                    cfg.min_internal_links
                ),
            });
        }

        if headings < cfg.min_headings {
            out.push(Suggestion {
                priority: Priority::Medium,
                category: SuggestionCategory::Structure,
                message: format!(
                    "Add subheadings to structure the content: {headings} found, aim for at least {}",
                    cfg.min_headings
                ),
            });
        }

        out
    }

    fn score(
        &self,
        densities: &BTreeMap<String, f64>,
        readability: &ReadabilityStats,
        link_count: usize,
        recommendations: &[Suggestion],
    ) -> u8 {
        let mut score = 100.0;

        let off_band = densities.values().filter(|d| !self.in_band(**d)).count();
        score -= DENSITY_PENALTY * off_band as f64;

        let shortfall = self.config.target_readability - readability.flesch;
        if shortfall > 0.0 {
            score -= shortfall * READABILITY_PENALTY_PER_POINT;
        }

        score -= match link_count {
            0 => NO_LINKS_PENALTY,
            1..=2 => FEW_LINKS_PENALTY,
            _ => 0.0,
        };

        let high = recommendations
            .iter()
            .filter(|s| s.priority == Priority::High)
            .count();
        score -= HIGH_PRIORITY_PENALTY * high as f64;

        score.clamp(0.0, 100.0).round() as u8
    }
}

/// Text used for density and readability: links reduced to anchor text,
/// tags removed, headings and list items terminated as sentences.
pub fn plain_text(content: &str) -> String {
    let stripped = strip_links_and_tags(content);
    stripped
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            let body = trimmed
                .trim_start_matches('#')
                .trim_start_matches(['-', '*', '+', '>'])
                .trim();
            let is_block = trimmed.starts_with(['#', '-', '*', '+', '>']);
            if is_block && !body.is_empty() && !body.ends_with(['.', '!', '?', ':']) {
                format!("{body}.")
            } else {
                body.to_string()
            }
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown `#` headings plus HTML `<h1>`-`<h6>` tags.
pub fn count_headings(content: &str) -> usize {
    let markdown = content
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            let hashes = trimmed.chars().take_while(|c| *c == '#').count();
            (1..=6).contains(&hashes)
                && trimmed[hashes..].starts_with(' ')
                && !trimmed[hashes..].trim().is_empty()
        })
        .count();
    let html = HTML_HEADING
        .as_ref()
        .map_or(0, |re| re.find_iter(content).count());
    markdown + html
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// 200 simple words in 20 short sentences, with `keyword` used `uses` times.
    fn article(keyword: &str, uses: usize) -> String {
        let mut sentences = Vec::new();
        for i in 0..20 {
            let subject = if i < uses { keyword } else { "the" };
            sentences.push(format!("{subject} cat sat on the mat and ate a big fish"));
        }
        format!(
            "# Cats\n\n## Fish\n\n{}.",
            sentences.join(". ")
        )
    }

    #[test]
    fn test_headings() {
        let content = "# One\n## Two\n#NoSpace\n####### Seven\n<h2>Three</h2>\n<H3 class=\"x\">Four</H3>";
        assert_eq!(count_headings(content), 4);
    }

    #[test]
    fn test_plain_text_terminates_headings() {
        assert_eq!(plain_text("# Title\n- item one\nBody text."), "Title.\nitem one.\nBody text.");
    }

    #[test]
    fn test_density_in_band_scores_higher() {
        let analyzer = SeoAnalyzer::default();
        let keywords = kw(&["rust"]);
        let missing = analyzer.analyze(&article("dog", 3), &keywords, None);
        let present = analyzer.analyze(&article("rust", 3), &keywords, None);

        assert_eq!(missing.keyword_density["rust"], 0.0);
        assert!(present.keyword_density["rust"] >= 0.5 && present.keyword_density["rust"] <= 2.5);
        assert_eq!(missing.readability_score, present.readability_score);
        assert!(missing.seo_score < present.seo_score);
        assert_eq!(missing.recommendations[0].priority, Priority::High);
    }

    #[test]
    fn test_case_variant_keywords_penalized_once() {
        let analyzer = SeoAnalyzer::default();
        let content = article("dog", 3);
        let single = analyzer.analyze(&content, &kw(&["rust"]), None);
        let repeated = analyzer.analyze(&content, &kw(&["rust", "Rust", "RUST"]), None);

        assert_eq!(repeated.keyword_density.len(), 1);
        assert_eq!(repeated.seo_score, single.seo_score);
        assert_eq!(repeated.suggestions, single.suggestions);
        assert_eq!(repeated.high_priority_count(), 1);
    }

    #[test]
    fn test_score_arithmetic() {
        let analyzer = SeoAnalyzer::default();
        // Simple text, two headings, keyword in band, no links.
        let analysis = analyzer.analyze(&article("rust", 3), &kw(&["rust"]), None);
        assert_eq!(analysis.headings, 2);
        assert!(analysis.readability.flesch >= 60.0);
        // Only the missing-links deduction applies.
        assert_eq!(analysis.seo_score, 85);
        assert_eq!(
            analysis.suggestions,
            vec!["[MEDIUM] Add internal links to related pages (aim for at least 3)".to_string()]
        );
    }

    #[test]
    fn test_link_opportunities_feed_score() {
        let analyzer = SeoAnalyzer::default();
        let urls = kw(&["/blog/rust", "/blog/cat", "/about"]);
        let analysis = analyzer.analyze(&article("rust", 3), &kw(&["rust", "cat"]), Some(&urls));
        assert_eq!(analysis.internal_links.len(), 2);
        // "cat" is far above the density band: -10, plus a medium suggestion.
        // Two links: -5.
        assert_eq!(analysis.seo_score, 85);
        assert!(analysis
            .recommendations
            .iter()
            .any(|s| s.category == SuggestionCategory::InternalLinks && s.priority == Priority::Low));
    }

    #[test]
    fn test_suggestions_sorted_by_priority() {
        let analyzer = SeoAnalyzer::default();
        let analysis = analyzer.analyze("One long line without headings.", &kw(&["absent"]), None);
        let priorities: Vec<Priority> = analysis.recommendations.iter().map(|s| s.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert!(analysis.suggestions[0].starts_with("[HIGH]"));
    }

    #[test]
    fn test_score_floors_at_zero() {
        let analyzer = SeoAnalyzer::default();
        let text = "Incomprehensibilities notwithstanding, organizational interdependencies \
                    necessitate multidimensional institutionalization";
        let analysis = analyzer.analyze(text, &kw(&["alpha", "beta", "gamma", "delta"]), None);
        assert_eq!(analysis.seo_score, 0);
    }
}
