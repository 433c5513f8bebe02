//! Keyword density.

use std::collections::{BTreeMap, HashSet};

/// Lowercased alphanumeric tokens; apostrophes inside words are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word occurrences of `keyword` (possibly multi-word) in `tokens`.
pub fn count_occurrences(tokens: &[String], keyword: &str) -> usize {
    let needle = tokenize(keyword);
    if needle.is_empty() || needle.len() > tokens.len() {
        return 0;
    }
    tokens
        .windows(needle.len())
        .filter(|window| *window == needle.as_slice())
        .count()
}

/// Density of each keyword in percent of all tokens, rounded to two decimals.
///
/// Keys are the trimmed keywords; blank keywords are skipped. Keywords that
/// tokenize identically (e.g. "Rust" and "rust") count once, under the first
/// spelling given.
pub fn keyword_density(text: &str, keywords: &[String]) -> BTreeMap<String, f64> {
    let tokens = tokenize(text);
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(tokenize(k).join(" ")))
        .map(|keyword| {
            let density = if tokens.is_empty() {
                0.0
            } else {
                let count = count_occurrences(&tokens, keyword);
                round2(count as f64 / tokens.len() as f64 * 100.0)
            };
            (keyword.to_string(), density)
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
