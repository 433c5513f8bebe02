//! Text hygiene for untrusted input.
//!
//! Search snippets, topics and keywords come from outside the process and are
//! embedded into model prompts; model output is trimmed before it is stored
//! in a draft.

/// Escape and truncate untrusted text for inclusion in a model prompt.
///
/// - Truncates to `max_len` characters (by char count, not bytes)
/// - Replaces `<` and `>` with entities to prevent tag injection
/// - Strips control characters except `\n` and `\t`
pub fn escape_for_llm_prompt(input: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(input.len().min(max_len));
    for ch in input.chars().take(max_len) {
        match ch {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            c if c.is_control() && c != '\n' && c != '\t' => {}
            c => result.push(c),
        }
    }
    result
}

/// Cut `text` to at most `max_chars` characters, backing off to the last
/// whitespace so no word is split. A single over-long word is hard-cut.
pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let next_is_space = text
        .chars()
        .nth(max_chars)
        .is_some_and(char::is_whitespace);
    if next_is_space {
        return cut.trim_end().to_string();
    }
    match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}

/// First sentence of `text`, skipping Markdown headings.
pub fn first_sentence(text: &str) -> Option<String> {
    let body: String = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let end = body
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(body.len());
    Some(body[..end].trim().to_string())
}
