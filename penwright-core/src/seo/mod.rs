//! SEO scoring.
//!
//! Keyword density, Flesch readability, internal link opportunities and an
//! aggregate 0-100 score with prioritized recommendations. Everything here is
//! pure: the same content, keywords and candidate URLs always produce the
//! same analysis.

pub mod analyzer;
pub mod density;
pub mod links;
pub mod readability;

pub use analyzer::{Priority, SeoAnalysis, SeoAnalyzer, Suggestion, SuggestionCategory};
pub use links::{InternalLink, levenshtein_distance};
pub use readability::{ReadabilityStats, flesch_reading_ease};
