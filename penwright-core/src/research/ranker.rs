//! Source ranking.
//!
//! Scores raw search hits by domain authority, recency, title relevance and
//! snippet substance, filters out weak hits and returns a capped shortlist.

use super::AuthorityTier;
use crate::config::ResearchConfig;
use crate::search::SearchHit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Curated authority scores for well-known domains.
const AUTHORITY_TABLE: &[(&str, u32)] = &[
    ("nature.com", 95),
    ("science.org", 95),
    ("nih.gov", 95),
    ("ncbi.nlm.nih.gov", 95),
    ("who.int", 95),
    ("cdc.gov", 95),
    ("ieee.org", 95),
    ("acm.org", 90),
    ("arxiv.org", 85),
    ("thelancet.com", 95),
    ("nejm.org", 95),
    ("mit.edu", 95),
    ("stanford.edu", 95),
    ("harvard.edu", 95),
    ("reuters.com", 90),
    ("apnews.com", 90),
    ("bbc.com", 85),
    ("bbc.co.uk", 85),
    ("nytimes.com", 85),
    ("theguardian.com", 80),
    ("economist.com", 85),
    ("ft.com", 85),
    ("wsj.com", 85),
    ("bloomberg.com", 85),
    ("hbr.org", 85),
    ("mckinsey.com", 80),
    ("gartner.com", 80),
    ("statista.com", 80),
    ("pewresearch.org", 90),
    ("oecd.org", 90),
    ("worldbank.org", 90),
    ("wikipedia.org", 70),
    ("britannica.com", 80),
    ("developer.mozilla.org", 90),
    ("docs.rs", 85),
    ("rust-lang.org", 90),
    ("github.com", 70),
    ("stackoverflow.com", 65),
    ("forbes.com", 70),
    ("techcrunch.com", 70),
    ("wired.com", 70),
    ("searchengineland.com", 75),
    ("moz.com", 75),
    ("ahrefs.com", 70),
    ("hubspot.com", 65),
    ("medium.com", 45),
    ("quora.com", 30),
    ("reddit.com", 35),
    ("pinterest.com", 15),
];

/// Authority for any host ending in one of these suffixes.
const SUFFIX_RULES: &[(&str, u32)] = &[
    (".gov", 90),
    (".gov.uk", 90),
    (".mil", 85),
    (".edu", 85),
    (".ac.uk", 85),
    (".int", 80),
];

/// Generic top-level domains that earn the baseline when untabulated.
const GENERIC_TLDS: &[&str] = &[
    "com", "org", "net", "io", "co", "info", "dev", "app", "biz", "news", "blog", "tech", "ai",
    "us", "uk", "ca", "au", "de", "fr", "eu", "in",
];

const GENERIC_BASELINE: u32 = 50;
const MAX_SCORE: u32 = 100;

/// A search hit with its computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSource {
    pub hit: SearchHit,
    /// Total score, 0-100.
    pub score: u32,
    /// Domain authority component, 0-100.
    pub domain_authority: u32,
    pub tier: AuthorityTier,
}

/// Authority score for the host of `url`.
///
/// Exact and parent-domain table matches win, then suffix rules, then the
/// generic-TLD baseline. Unparseable URLs and exotic TLDs score zero.
pub fn domain_authority(url: &str) -> u32 {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return 0;
    };
    let Some(host) = parsed.host_str() else {
        return 0;
    };
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut candidate = host;
    loop {
        if let Some((_, score)) = AUTHORITY_TABLE.iter().find(|(d, _)| *d == candidate) {
            return *score;
        }
        match candidate.split_once('.') {
            Some((_, parent)) if parent.contains('.') => candidate = parent,
            _ => break,
        }
    }

    if let Some((_, score)) = SUFFIX_RULES.iter().find(|(s, _)| host.ends_with(s)) {
        return *score;
    }

    match host.rsplit('.').next() {
        Some(tld) if GENERIC_TLDS.contains(&tld) => GENERIC_BASELINE,
        _ => 0,
    }
}

/// Scores, filters and shortlists search hits.
#[derive(Debug, Clone)]
pub struct SourceRanker {
    primary_threshold: u32,
    fallback_threshold: u32,
    min_survivors: usize,
    shortlist_size: usize,
}

impl SourceRanker {
    pub fn new(config: &ResearchConfig) -> Self {
        Self {
            primary_threshold: config.primary_threshold,
            fallback_threshold: config.fallback_threshold,
            min_survivors: config.min_survivors,
            shortlist_size: config.shortlist_size,
        }
    }

    /// Rank `hits` for `topic` as of now.
    pub fn rank(&self, hits: Vec<SearchHit>, topic: &str) -> Vec<RankedSource> {
        self.rank_at(hits, topic, Utc::now())
    }

    /// Rank `hits` for `topic` as of `now`.
    ///
    /// Hits above the primary threshold survive; if fewer than
    /// `min_survivors` do, the relaxed threshold is applied once instead.
    /// Ties keep discovery order.
    pub fn rank_at(
        &self,
        hits: Vec<SearchHit>,
        topic: &str,
        now: DateTime<Utc>,
    ) -> Vec<RankedSource> {
        let topic_tokens = tokenize(topic);
        let scored: Vec<RankedSource> = hits
            .into_iter()
            .map(|hit| {
                let authority = domain_authority(&hit.url);
                let score = score_hit(&hit, authority, &topic_tokens, now);
                RankedSource {
                    hit,
                    score,
                    domain_authority: authority,
                    tier: AuthorityTier::from_score(authority),
                }
            })
            .collect();

        let primary = scored
            .iter()
            .filter(|s| s.score > self.primary_threshold)
            .count();
        let threshold = if primary < self.min_survivors {
            tracing::debug!(
                primary,
                fallback = self.fallback_threshold,
                "Too few strong sources, relaxing threshold"
            );
            self.fallback_threshold
        } else {
            self.primary_threshold
        };

        let mut kept: Vec<RankedSource> =
            scored.into_iter().filter(|s| s.score > threshold).collect();
        kept.sort_by(|a, b| b.score.cmp(&a.score));
        kept.truncate(self.shortlist_size);
        kept
    }
}

fn score_hit(hit: &SearchHit, authority: u32, topic_tokens: &[String], now: DateTime<Utc>) -> u32 {
    let mut score = authority;

    if let Some(date) = hit.date {
        let age_days = (now - date).num_days();
        score += match age_days {
            ..365 => 20,
            365..730 => 10,
            _ => 0,
        };
    }

    if !topic_tokens.is_empty() {
        let title_tokens = tokenize(&hit.title);
        let overlap = topic_tokens
            .iter()
            .filter(|t| {
                title_tokens
                    .iter()
                    .any(|w| w.contains(t.as_str()) || t.contains(w.as_str()))
            })
            .count();
        let ratio = overlap as f64 / topic_tokens.len() as f64;
        if ratio >= 0.3 {
            score += 20;
        } else if ratio >= 0.1 {
            score += 10;
        }
    }

    if hit.snippet.chars().count() > 100 {
        score += 10;
    }

    score.min(MAX_SCORE)
}

/// Lowercase alphanumeric words longer than two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn ranker() -> SourceRanker {
        SourceRanker::new(&ResearchConfig::default())
    }

    #[test]
    fn test_domain_authority_lookup() {
        assert_eq!(domain_authority("https://www.nature.com/articles/x"), 95);
        assert_eq!(domain_authority("https://pubmed.ncbi.nlm.nih.gov/1"), 95);
        assert_eq!(domain_authority("https://blog.example.gov/post"), 90);
        assert_eq!(domain_authority("https://cs.university.edu/"), 85);
        assert_eq!(domain_authority("https://unknown-blog.com/a"), GENERIC_BASELINE);
        assert_eq!(domain_authority("https://site.zzz/a"), 0);
        assert_eq!(domain_authority("not a url"), 0);
    }

    #[test]
    fn test_authoritative_recent_beats_untabulated_old() {
        let snippet = "Same snippet";
        let strong = SearchHit::new("Topic overview", "https://nature.com/a", snippet)
            .with_date(now() - Duration::days(10));
        let weak = SearchHit::new("Topic overview", "https://someblog.com/a", snippet)
            .with_date(now() - Duration::days(3 * 365));
        let ranked = ranker().rank_at(vec![weak, strong], "topic overview", now());
        assert_eq!(ranked[0].hit.url, "https://nature.com/a");
        assert!(ranked[0].score > ranked[1].score);
        assert_eq!(ranked[0].tier, AuthorityTier::High);
    }

    #[test]
    fn test_score_components_and_cap() {
        let long_snippet = "x".repeat(101);
        let hit = SearchHit::new("Rust async guide", "https://someblog.com/a", long_snippet)
            .with_date(now() - Duration::days(400));
        let tokens = tokenize("rust async");
        // 50 baseline + 10 recency + 20 relevance + 10 snippet
        assert_eq!(score_hit(&hit, 50, &tokens, now()), 90);
        assert_eq!(score_hit(&hit, 95, &tokens, now()), MAX_SCORE);
    }

    #[test]
    fn test_fallback_threshold_applies_when_few_survive() {
        // Untabulated exotic TLDs: only relevance and snippet can score.
        let hits = vec![
            SearchHit::new("Quantum knitting basics", "https://a.zzz/1", "x".repeat(120)),
            SearchHit::new("Quantum knitting tips", "https://b.zzz/2", ""),
            SearchHit::new("Unrelated", "https://c.zzz/3", ""),
        ];
        let ranked = ranker().rank_at(hits, "quantum knitting", now());
        // 30 passes the primary filter alone; the relaxed pass keeps the 20.
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, 30);
        assert_eq!(ranked[1].score, 20);
    }

    #[test]
    fn test_ties_keep_discovery_order_and_cap() {
        let hits: Vec<SearchHit> = (0..12)
            .map(|i| SearchHit::new("Same", format!("https://site{i}.com/"), ""))
            .collect();
        let ranked = ranker().rank_at(hits, "zzz", now());
        assert_eq!(ranked.len(), 8);
        let urls: Vec<&str> = ranked.iter().map(|r| r.hit.url.as_str()).collect();
        assert_eq!(urls[0], "https://site0.com/");
        assert_eq!(urls[7], "https://site7.com/");
    }
}
