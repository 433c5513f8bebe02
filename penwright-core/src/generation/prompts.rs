//! Prompt builders for outline, draft, meta description and optimization calls.
//!
//! Every caller-supplied string is escaped before it is embedded.

use super::controller::Correction;
use super::{ContentDraft, ContentRequest, Outline};
use crate::research::{ResearchSummary, SummaryOrigin};
use crate::sanitize::escape_for_llm_prompt;
use crate::seo::SeoAnalysis;
use std::fmt::Write;

pub const WRITER_SYSTEM_PROMPT: &str = "You are an expert content writer and editor. You write \
accurate, well-structured content in Markdown, attribute facts to the research you are given, \
and never invent statistics, quotes or sources. You reply with a single JSON object and nothing \
else.";

pub const META_SYSTEM_PROMPT: &str = "You write concise, compelling meta descriptions for web \
pages. You reply with a single JSON object and nothing else.";

const MAX_FIELD_CHARS: usize = 300;
const MAX_BODY_CHARS: usize = 6000;
const MAX_OPTIMIZE_BODY_CHARS: usize = 40_000;

fn esc(text: &str) -> String {
    escape_for_llm_prompt(text, MAX_FIELD_CHARS)
}

fn brief(request: &ContentRequest) -> String {
    let keywords = if request.keywords.is_empty() {
        "none".to_string()
    } else {
        esc(&request.keywords.join(", "))
    };
    format!(
        "Topic: {topic}\n\
         Content type: {content_type} ({guidance})\n\
         Audience: {audience}\n\
         Tone: {tone}\n\
         Purpose: {purpose}\n\
         Target keywords: {keywords}\n\
         Target length: {words} words",
        topic = esc(&request.topic),
        content_type = request.content_type,
        guidance = request.content_type.guidance(),
        audience = esc(&request.audience),
        tone = esc(&request.tone),
        purpose = esc(&request.purpose),
        words = request.target_word_count,
    )
}

/// Render research summaries as a numbered, attributed list.
pub fn format_research(research: &[ResearchSummary]) -> String {
    if research.is_empty() {
        return "No research is available. Write from general knowledge and do not cite \
                specific studies, statistics or sources."
            .to_string();
    }
    let mut out = String::new();
    for (i, summary) in research.iter().enumerate() {
        let attribution = match summary.origin {
            SummaryOrigin::Sourced => format!(
                "{} ({} authority)",
                escape_for_llm_prompt(&summary.url, 500),
                summary.source_authority
            ),
            SummaryOrigin::ModelFallback => "general background, not a citable source".to_string(),
        };
        let _ = writeln!(out, "[{}] {} - {}", i + 1, esc(&summary.title), attribution);
        for point in &summary.key_points {
            let _ = writeln!(out, "  - {}", esc(point));
        }
        for quote in &summary.expert_quotes {
            let _ = writeln!(out, "  - Quote: \"{}\"", esc(quote));
        }
        for data in &summary.data_points {
            let _ = writeln!(out, "  - Data: {}", esc(data));
        }
    }
    out
}

pub fn outline_prompt(request: &ContentRequest) -> String {
    format!(
        "{brief}\n\n\
         <research>\n{research}</research>\n\n\
         Plan the structure of this piece. Respond with JSON of this shape:\n\
         {{\"title\": string, \"sections\": [{{\"heading\": string, \"key_points\": [string]}}]}}",
        brief = brief(request),
        research = format_research(&request.research),
    )
}

pub fn draft_prompt(
    request: &ContentRequest,
    outline: Option<&Outline>,
    correction: Option<Correction>,
) -> String {
    let mut prompt = format!(
        "{brief}\n\n<research>\n{research}</research>\n",
        brief = brief(request),
        research = format_research(&request.research),
    );

    if let Some(outline) = outline {
        let _ = writeln!(prompt, "\nFollow this outline:\n# {}", esc(&outline.title));
        for section in &outline.sections {
            let _ = writeln!(prompt, "## {}", esc(&section.heading));
            for point in &section.key_points {
                let _ = writeln!(prompt, "- {}", esc(point));
            }
        }
    }

    if let Some(c) = correction {
        let previous = match c.previous_words {
            Some(words) => format!("Your previous draft had {words} words."),
            None => "Your previous reply could not be parsed as the required JSON.".to_string(),
        };
        let _ = write!(
            prompt,
            "\nCORRECTION: {previous} The content must be between {} and {} words \
             (target {}). Adjust the depth of each section to land inside that range.\n",
            c.min_words, c.max_words, c.target
        );
    }

    prompt.push_str(
        "\nWrite the full piece in Markdown with descriptive ## subheadings. Use the target \
         keywords naturally. Respond with JSON of this shape:\n\
         {\"title\": string, \"content\": string, \"meta_description\": string}",
    );
    prompt
}

pub fn meta_prompt(title: &str, body: &str, max_chars: usize) -> String {
    format!(
        "Title: {title}\n\n<content>\n{body}\n</content>\n\n\
         Write a meta description of at most {max_chars} characters that summarizes only the \
         content above. Respond with JSON of this shape:\n\
         {{\"meta_description\": string}}",
        title = esc(title),
        body = escape_for_llm_prompt(body, MAX_BODY_CHARS),
    )
}

pub fn optimize_prompt(draft: &ContentDraft, analysis: &SeoAnalysis) -> String {
    let mut suggestions = String::new();
    for s in &analysis.suggestions {
        let _ = writeln!(suggestions, "- {}", esc(s));
    }
    if suggestions.is_empty() {
        suggestions.push_str("- No issues found; polish wording only.\n");
    }
    let densities = analysis
        .keyword_density
        .iter()
        .map(|(k, d)| format!("{}: {d:.2}%", esc(k)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Title: {title}\n\
         Current SEO score: {score}/100\n\
         Readability (Flesch): {readability}\n\
         Keyword density: {densities}\n\n\
         Apply these recommendations:\n{suggestions}\n\
         Keep the meaning, facts and approximate length ({words} words). Do not add new facts.\n\n\
         <content>\n{body}\n</content>\n\n\
         Respond with JSON of this shape:\n\
         {{\"title\": string, \"content\": string, \"meta_description\": string, \"seo_score\": number}}",
        title = esc(&draft.title),
        score = analysis.seo_score,
        readability = analysis.readability_score,
        words = draft.word_count,
        body = escape_for_llm_prompt(&draft.content, MAX_OPTIMIZE_BODY_CHARS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ContentType;
    use crate::research::AuthorityTier;

    fn request() -> ContentRequest {
        ContentRequest::new("Rust <async>", ContentType::BlogPost, 800)
            .with_keywords(vec!["tokio".into()])
    }

    #[test]
    fn test_brief_escapes_input() {
        let prompt = outline_prompt(&request());
        assert!(prompt.contains("Topic: Rust &lt;async&gt;"));
        assert!(prompt.contains("Target length: 800 words"));
        assert!(prompt.contains("No research is available"));
    }

    #[test]
    fn test_research_attribution() {
        let research = vec![ResearchSummary {
            title: "Tokio docs".into(),
            url: "https://tokio.rs".into(),
            key_points: vec!["Runtime".into()],
            expert_quotes: vec![],
            data_points: vec!["10k tasks".into()],
            relevance_score: 90,
            source_authority: AuthorityTier::Medium,
            publication_date: None,
            origin: SummaryOrigin::Sourced,
        }];
        let text = format_research(&research);
        assert!(text.starts_with("[1] Tokio docs - https://tokio.rs (medium authority)"));
        assert!(text.contains("  - Data: 10k tasks"));
    }

    #[test]
    fn test_correction_states_count_and_window() {
        let correction = Correction {
            previous_words: Some(317),
            target: 1000,
            min_words: 950,
            max_words: 1050,
        };
        let prompt = draft_prompt(&request(), None, Some(correction));
        assert!(prompt.contains("Your previous draft had 317 words."));
        assert!(prompt.contains("between 950 and 1050 words"));
    }

    #[test]
    fn test_draft_prompt_includes_outline() {
        let outline = Outline {
            title: "Plan".into(),
            sections: vec![crate::generation::OutlineSection {
                heading: "Intro".into(),
                key_points: vec!["Why".into()],
            }],
        };
        let prompt = draft_prompt(&request(), Some(&outline), None);
        assert!(prompt.contains("## Intro\n- Why"));
        assert!(!prompt.contains("CORRECTION"));
    }
}
