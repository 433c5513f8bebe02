//! Flesch Reading Ease.

use super::density::tokenize;
use serde::{Deserialize, Serialize};

/// Raw counts behind a readability score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadabilityStats {
    pub words: usize,
    pub sentences: usize,
    pub syllables: usize,
    /// Flesch Reading Ease clamped to 0-100.
    pub flesch: f64,
}

impl ReadabilityStats {
    /// Whole-number score.
    pub fn score(&self) -> u8 {
        self.flesch.round().clamp(0.0, 100.0) as u8
    }
}

/// Compute Flesch Reading Ease for plain text.
///
/// `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`.
/// Text without words scores zero.
pub fn flesch_reading_ease(text: &str) -> ReadabilityStats {
    let words = tokenize(text);
    if words.is_empty() {
        return ReadabilityStats::default();
    }
    let sentences = count_sentences(text).max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    let raw = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;

    ReadabilityStats {
        words: words.len(),
        sentences,
        syllables,
        flesch: raw.clamp(0.0, 100.0),
    }
}

/// Segments between `.`, `!` and `?` that contain at least one word.
pub fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
}

/// Heuristic syllable count, at least one per word.
///
/// Short words count as one. Otherwise a trailing silent `e`, `es` or `ed`
/// is stripped, then a leading `y`, and the remaining vowel groups (runs
/// of one or two of `aeiouy`) are counted.
pub fn count_syllables(word: &str) -> usize {
    let word: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();
    if word.len() <= 3 {
        return 1;
    }

    let mut end = word.len();
    let last = word[end - 1];
    let prev = word[end - 2];
    let before = |i: usize| i.checked_sub(1).map(|j| word[j]);
    if last == 'd' && prev == 'e' {
        end -= 2;
    } else if last == 's' && prev == 'e' && before(end - 2).is_some_and(|c| !is_le_vowel(c)) {
        end -= 2;
    } else if last == 'e' && !is_le_vowel(prev) {
        end -= 1;
    }

    let start = usize::from(word.first() == Some(&'y'));
    let stem = &word[start.min(end)..end];

    let mut groups = 0;
    let mut run = 0;
    for &c in stem {
        if is_vowel(c) {
            run += 1;
            // A run longer than two starts a new group.
            if run == 1 || run == 3 {
                groups += 1;
                if run == 3 {
                    run = 1;
                }
            }
        } else {
            run = 0;
        }
    }
    groups.max(1)
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Letters after which a final `e`/`es` is pronounced.
fn is_le_vowel(c: char) -> bool {
    c == 'l' || is_vowel(c)
}
