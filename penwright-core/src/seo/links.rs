//! Internal link detection and matching.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use super::density::{count_occurrences, tokenize};
use regex::Regex;

/// Base used to resolve site-relative candidate URLs such as `/blog/rust`.
const RELATIVE_BASE: &str = "https://internal.invalid/";

static MARKDOWN_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(\s*([^)\s]+)[^)]*\)").ok());

static HTML_ANCHOR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).ok()
});

/// A suggested internal link for a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLink {
    /// The keyword to use as anchor text.
    pub text: String,
    pub url: String,
    /// `round(100 / (distance + 1))`.
    pub relevance: u8,
}

/// A link already present in the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingLink {
    pub anchor: String,
    pub url: String,
}

impl ExistingLink {
    /// Relative links and links into the candidate set count as internal.
    pub fn is_internal(&self, internal_urls: &[String]) -> bool {
        let url = self.url.trim();
        (!url.contains("://") && !url.starts_with("mailto:") && !url.starts_with('#'))
            || internal_urls.iter().any(|u| u.trim() == url)
    }
}

/// Markdown `[text](url)` and HTML `<a href>` links, in document order per kind.
pub fn existing_links(content: &str) -> Vec<ExistingLink> {
    let mut links = Vec::new();
    if let Some(re) = MARKDOWN_LINK.as_ref() {
        links.extend(re.captures_iter(content).map(|c| ExistingLink {
            anchor: c[1].trim().to_string(),
            url: c[2].to_string(),
        }));
    }
    if let Some(re) = HTML_ANCHOR.as_ref() {
        links.extend(re.captures_iter(content).map(|c| ExistingLink {
            anchor: strip_tags(&c[2]).trim().to_string(),
            url: c[1].to_string(),
        }));
    }
    links
}

/// Replace Markdown links with their anchor text and drop HTML tags.
pub fn strip_links_and_tags(content: &str) -> String {
    let text = match MARKDOWN_LINK.as_ref() {
        Some(re) => re.replace_all(content, "$1").into_owned(),
        None => content.to_string(),
    };
    strip_tags(&text)
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Edit distance between two strings, by characters.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Comparable path segments of `url`: lowercased, extension dropped,
/// `-` and `_` read as spaces.
pub fn path_segments(url: &str) -> Vec<String> {
    let parsed = Url::parse(url.trim()).or_else(|_| {
        Url::parse(RELATIVE_BASE).and_then(|base| base.join(url.trim()))
    });
    let Ok(parsed) = parsed else {
        return Vec::new();
    };
    parsed
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| {
                    let s = s.to_lowercase();
                    let stem = match s.rsplit_once('.') {
                        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem.to_string(),
                        _ => s,
                    };
                    stem.replace(['-', '_'], " ")
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Find the best internal URL for each keyword present in `text` and not
/// already linked.
///
/// For each keyword the candidate with the smallest edit distance between the
/// keyword and any of its path segments wins; ties go to the earlier
/// candidate. Matches with `1 / (distance + 1)` not above `threshold` are
/// dropped. Results are ordered by relevance, then keyword order.
pub fn find_link_opportunities(
    text: &str,
    keywords: &[String],
    existing: &[ExistingLink],
    candidate_urls: &[String],
    threshold: f64,
) -> Vec<InternalLink> {
    if candidate_urls.is_empty() {
        return Vec::new();
    }
    let tokens = tokenize(text);
    let candidates: Vec<(&String, Vec<String>)> = candidate_urls
        .iter()
        .map(|url| (url, path_segments(url)))
        .collect();
    let linked_anchors: Vec<String> = existing.iter().map(|l| l.anchor.to_lowercase()).collect();

    let mut seen = Vec::new();
    let mut links = Vec::new();
    for keyword in keywords {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() || seen.contains(&needle) {
            continue;
        }
        seen.push(needle.clone());

        if count_occurrences(&tokens, &needle) == 0
            || linked_anchors.iter().any(|a| a.contains(&needle))
        {
            continue;
        }

        let best = candidates
            .iter()
            .filter_map(|(url, segments)| {
                segments
                    .iter()
                    .map(|s| levenshtein_distance(&needle, s))
                    .min()
                    .map(|d| (*url, d))
            })
            .fold(None::<(&String, usize)>, |best, (url, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((url, d)),
            });

        if let Some((url, distance)) = best {
            let relevance = 1.0 / (distance as f64 + 1.0);
            if relevance > threshold {
                links.push(InternalLink {
                    text: keyword.trim().to_string(),
                    url: url.clone(),
                    relevance: (relevance * 100.0).round() as u8,
                });
            }
        }
    }

    links.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    links
}
