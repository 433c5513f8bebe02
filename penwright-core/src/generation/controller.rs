//! Word-count controller: a bounded retry state machine.
//!
//! ```text
//! Drafting -> Evaluating -> Accepted
//!                        -> Retrying -> Evaluating -> Accepted
//!                                                  -> AcceptedBestEffort
//! ```
//!
//! Word counts are always measured locally; a model-reported count is never
//! used. At most [`MAX_WORD_COUNT_RETRIES`] corrective retry is issued. When
//! the retry also misses, the original draft is kept.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

/// Number of corrective retries after a first draft misses its band.
pub const MAX_WORD_COUNT_RETRIES: usize = 1;

/// States of the word-count state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Drafting,
    Evaluating,
    Retrying,
    Accepted,
    AcceptedBestEffort,
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Drafting => "drafting",
            Self::Evaluating => "evaluating",
            Self::Retrying => "retrying",
            Self::Accepted => "accepted",
            Self::AcceptedBestEffort => "accepted_best_effort",
        };
        write!(f, "{s}")
    }
}

/// Inclusive word-count window around a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    pub target: usize,
    pub tolerance: f64,
}

impl ToleranceBand {
    pub fn new(target: usize, tolerance: f64) -> Self {
        Self { target, tolerance }
    }

    pub fn min(&self) -> usize {
        (self.target as f64 * (1.0 - self.tolerance)).round() as usize
    }

    pub fn max(&self) -> usize {
        (self.target as f64 * (1.0 + self.tolerance)).round() as usize
    }

    pub fn contains(&self, words: usize) -> bool {
        (self.min()..=self.max()).contains(&words)
    }

    /// Signed deviation from the target in percent.
    pub fn deviation_pct(&self, words: usize) -> f64 {
        if self.target == 0 {
            return 0.0;
        }
        (words as f64 - self.target as f64) / self.target as f64 * 100.0
    }
}

/// Whitespace-token word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes to read `words` at `words_per_minute`, rounded up, at least one.
pub fn reading_time(words: usize, words_per_minute: usize) -> usize {
    words.div_ceil(words_per_minute.max(1)).max(1)
}

/// Instruction handed to the retry attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    /// Word count of the previous attempt, if it could be parsed at all.
    pub previous_words: Option<usize>,
    pub target: usize,
    pub min_words: usize,
    pub max_words: usize,
}

/// Final result of a controlled generation.
#[derive(Debug, Clone)]
pub struct ControlledDraft<T> {
    pub candidate: T,
    pub words: usize,
    pub state: GenerationState,
    pub attempts: usize,
    /// Every state visited, in order.
    pub history: Vec<GenerationState>,
}

/// Drives draft attempts until one is accepted or the retry is spent.
#[derive(Debug, Clone, Copy)]
pub struct WordCountController {
    first_band: ToleranceBand,
    retry_band: ToleranceBand,
}

impl WordCountController {
    pub fn new(target: usize, tolerance: f64, retry_tolerance: f64) -> Self {
        Self {
            first_band: ToleranceBand::new(target, tolerance),
            retry_band: ToleranceBand::new(target, retry_tolerance),
        }
    }

    pub fn band(&self) -> ToleranceBand {
        self.first_band
    }

    /// Run the state machine.
    ///
    /// `generate` produces one attempt (`None` when the reply was unusable)
    /// and receives a [`Correction`] on the retry. `measure` counts the words
    /// of an attempt. Returns `None` only when no attempt was usable.
    pub async fn run<T, G, Fut, M>(&self, mut generate: G, measure: M) -> Option<ControlledDraft<T>>
    where
        G: FnMut(Option<Correction>) -> Fut,
        Fut: Future<Output = Option<T>>,
        M: Fn(&T) -> usize,
    {
        let mut state = GenerationState::Drafting;
        let mut history = vec![state];
        let mut attempts = 0;
        let mut retries = 0;
        let mut correction: Option<Correction> = None;
        let mut current: Option<T> = None;
        // First usable attempt; the best-effort answer.
        let mut original: Option<(T, usize)> = None;
        let mut accepted: Option<(T, usize)> = None;

        loop {
            state = match state {
                GenerationState::Drafting | GenerationState::Retrying => {
                    attempts += 1;
                    current = generate(correction.take()).await;
                    GenerationState::Evaluating
                }
                GenerationState::Evaluating => {
                    let band = if retries == 0 {
                        self.first_band
                    } else {
                        self.retry_band
                    };
                    let measured = current.take().map(|c| {
                        let words = measure(&c);
                        (c, words)
                    });
                    let previous_words = measured.as_ref().map(|(_, w)| *w);

                    match measured {
                        Some((candidate, words)) if band.contains(words) => {
                            debug!(words, attempts, "Draft within tolerance");
                            accepted = Some((candidate, words));
                        }
                        Some(pair) => {
                            debug!(
                                words = pair.1,
                                min = band.min(),
                                max = band.max(),
                                "Draft outside tolerance"
                            );
                            if original.is_none() {
                                original = Some(pair);
                            }
                        }
                        None => warn!(attempts, "Draft attempt unusable"),
                    }

                    if accepted.is_some() {
                        GenerationState::Accepted
                    } else if retries < MAX_WORD_COUNT_RETRIES {
                        retries += 1;
                        correction = Some(Correction {
                            previous_words,
                            target: self.first_band.target,
                            min_words: self.first_band.min(),
                            max_words: self.first_band.max(),
                        });
                        GenerationState::Retrying
                    } else {
                        GenerationState::AcceptedBestEffort
                    }
                }
                GenerationState::Accepted | GenerationState::AcceptedBestEffort => break,
            };
            history.push(state);
        }

        let (candidate, words) = match state {
            GenerationState::Accepted => accepted?,
            _ => {
                let (candidate, words) = original?;
                warn!(
                    words,
                    target = self.first_band.target,
                    deviation_pct = self.first_band.deviation_pct(words),
                    "Word count target missed after retry, keeping original draft"
                );
                (candidate, words)
            }
        };

        info!(words, attempts, final_state = %state, "Word-count control finished");
        Some(ControlledDraft {
            candidate,
            words,
            state,
            attempts,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted attempts, recording the corrections it was given.
    struct Script {
        attempts: Mutex<VecDeque<Option<usize>>>,
        corrections: Mutex<Vec<Option<Correction>>>,
    }

    impl Script {
        fn new(attempts: &[Option<usize>]) -> Self {
            Self {
                attempts: Mutex::new(attempts.iter().copied().collect()),
                corrections: Mutex::new(Vec::new()),
            }
        }

        async fn next(&self, correction: Option<Correction>) -> Option<String> {
            self.corrections.lock().unwrap().push(correction);
            let words = self.attempts.lock().unwrap().pop_front().flatten()?;
            Some(vec!["word"; words].join(" "))
        }
    }

    async fn run(script: &Script) -> Option<ControlledDraft<String>> {
        WordCountController::new(1000, 0.05, 0.10)
            .run(|c| script.next(c), |text: &String| count_words(text))
            .await
    }

    #[test]
    fn test_band_bounds() {
        let band = ToleranceBand::new(1000, 0.05);
        assert_eq!((band.min(), band.max()), (950, 1050));
        assert!(band.contains(950) && band.contains(1050));
        assert!(!band.contains(949) && !band.contains(1051));
        assert_eq!(band.deviation_pct(900), -10.0);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(0, 200), 1);
        assert_eq!(reading_time(200, 200), 1);
        assert_eq!(reading_time(201, 200), 2);
        assert_eq!(reading_time(1000, 0), 1000);
    }

    #[tokio::test]
    async fn test_first_attempt_accepted() {
        let script = Script::new(&[Some(1000)]);
        let draft = run(&script).await.unwrap();
        assert_eq!(draft.state, GenerationState::Accepted);
        assert_eq!(draft.attempts, 1);
        assert_eq!(
            draft.history,
            vec![
                GenerationState::Drafting,
                GenerationState::Evaluating,
                GenerationState::Accepted
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_in_band_wins() {
        let script = Script::new(&[Some(317), Some(980)]);
        let draft = run(&script).await.unwrap();
        assert_eq!(draft.words, 980);
        assert_eq!(draft.state, GenerationState::Accepted);
        assert_eq!(draft.attempts, 2);

        let corrections = script.corrections.lock().unwrap().clone();
        assert_eq!(corrections[0], None);
        assert_eq!(
            corrections[1],
            Some(Correction {
                previous_words: Some(317),
                target: 1000,
                min_words: 950,
                max_words: 1050,
            })
        );
    }

    #[tokio::test]
    async fn test_retry_miss_keeps_original() {
        let script = Script::new(&[Some(317), Some(317), Some(1000)]);
        let draft = run(&script).await.unwrap();
        assert_eq!(draft.words, 317);
        assert_eq!(draft.state, GenerationState::AcceptedBestEffort);
        // Exactly one retry; the third scripted attempt is never requested.
        assert_eq!(draft.attempts, 2);
        assert_eq!(script.attempts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_uses_wider_band() {
        let script = Script::new(&[Some(500), Some(920)]);
        let draft = run(&script).await.unwrap();
        assert_eq!(draft.words, 920);
        assert_eq!(draft.state, GenerationState::Accepted);
    }

    #[tokio::test]
    async fn test_unusable_first_attempt_makes_retry_the_candidate() {
        let script = Script::new(&[None, Some(600)]);
        let draft = run(&script).await.unwrap();
        assert_eq!(draft.words, 600);
        assert_eq!(draft.state, GenerationState::AcceptedBestEffort);
        let corrections = script.corrections.lock().unwrap().clone();
        assert_eq!(corrections[1].unwrap().previous_words, None);
    }

    #[tokio::test]
    async fn test_no_usable_attempt_is_none() {
        let script = Script::new(&[None, None]);
        assert!(run(&script).await.is_none());
    }
}
