//! Resilient structured-output extraction.
//!
//! Model replies should contain a JSON object but are routinely wrapped in
//! markdown fences, surrounded by prose, sprinkled with control characters or
//! broken by unescaped quotes. [`extract`] recovers what it can and reports
//! every outcome as a [`StructuredParseResult`]; it never panics or errors.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Type constraint on a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A string with at least one non-whitespace character.
    NonEmptyString,
    /// A JSON number.
    Number,
    /// An array whose elements are all strings (may be empty).
    StringArray,
    /// Any JSON array.
    Array,
}

/// One required field of an expected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRequirement {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldRequirement {
    pub const fn non_empty_string(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::NonEmptyString,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
        }
    }

    pub const fn string_array(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::StringArray,
        }
    }

    pub const fn array(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Array,
        }
    }

    fn is_satisfied_by(&self, object: &Value) -> bool {
        let Some(value) = object.get(self.name) else {
            return false;
        };
        match self.kind {
            FieldKind::NonEmptyString => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            FieldKind::Number => value.is_number(),
            FieldKind::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldKind::Array => value.is_array(),
        }
    }
}

/// Required-field lists for every structured model call.
pub mod schemas {
    use super::FieldRequirement as F;

    /// A generated piece of content.
    pub const CONTENT: &[F] = &[F::non_empty_string("title"), F::non_empty_string("content")];

    /// A rewritten piece of content with a self-assessed SEO score.
    pub const SEO: &[F] = &[
        F::non_empty_string("title"),
        F::non_empty_string("content"),
        F::number("seo_score"),
    ];

    /// One attributed research summary.
    pub const RESEARCH_SUMMARY: &[F] = &[
        F::non_empty_string("title"),
        F::string_array("key_points"),
        F::number("relevance_score"),
        F::non_empty_string("source_authority"),
    ];

    /// A content outline.
    pub const OUTLINE: &[F] = &[F::non_empty_string("title"), F::array("sections")];

    /// A standalone meta description.
    pub const META: &[F] = &[F::non_empty_string("meta_description")];

    /// Model-authored background summaries used when research finds nothing.
    pub const FALLBACK_RESEARCH: &[F] = &[F::array("summaries")];
}

/// Tagged outcome of structured extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredParseResult<T = Value> {
    /// JSON recovered and every required field present with the right type.
    Ok(T),
    /// No valid JSON object could be recovered, even after repair.
    Malformed { raw: String },
    /// JSON parsed but required fields are absent or wrongly typed.
    InvalidSchema {
        raw: String,
        missing_fields: Vec<String>,
    },
}

impl<T> StructuredParseResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Discard failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::Malformed { .. } => "malformed",
            Self::InvalidSchema { .. } => "invalid_schema",
        }
    }
}

/// Recover a JSON object from `raw` and check it against `schema`.
///
/// The reply is first read as-is; only when no object parses there is the
/// body of a wrapping code fence tried instead. String values may carry
/// their own Markdown code blocks.
pub fn extract(raw: &str, schema: &[FieldRequirement]) -> StructuredParseResult<Value> {
    let parsed = parse_object(raw).or_else(|| strip_code_fences(raw).and_then(parse_object));
    let Some(value) = parsed else {
        return StructuredParseResult::Malformed {
            raw: raw.to_string(),
        };
    };

    let missing_fields: Vec<String> = schema
        .iter()
        .filter(|field| !field.is_satisfied_by(&value))
        .map(|field| field.name.to_string())
        .collect();

    if missing_fields.is_empty() {
        StructuredParseResult::Ok(value)
    } else {
        StructuredParseResult::InvalidSchema {
            raw: raw.to_string(),
            missing_fields,
        }
    }
}

/// Like [`extract`], then deserialize the validated object into `T`.
///
/// A deserialization failure is reported as `InvalidSchema` carrying the
/// serde error message.
pub fn extract_into<T: DeserializeOwned>(
    raw: &str,
    schema: &[FieldRequirement],
) -> StructuredParseResult<T> {
    match extract(raw, schema) {
        StructuredParseResult::Ok(value) => match serde_json::from_value(value) {
            Ok(typed) => StructuredParseResult::Ok(typed),
            Err(e) => StructuredParseResult::InvalidSchema {
                raw: raw.to_string(),
                missing_fields: vec![e.to_string()],
            },
        },
        StructuredParseResult::Malformed { raw } => StructuredParseResult::Malformed { raw },
        StructuredParseResult::InvalidSchema {
            raw,
            missing_fields,
        } => StructuredParseResult::InvalidSchema {
            raw,
            missing_fields,
        },
    }
}

/// Clean `text`, slice the outermost braces and parse, repairing quotes once.
fn parse_object(text: &str) -> Option<Value> {
    let cleaned = remove_control_chars(text);
    let candidate = slice_object(&cleaned)?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Some(value),
        Err(first) => {
            let repaired = repair_unescaped_quotes(candidate);
            let value = serde_json::from_str::<Value>(&repaired).ok()?;
            debug!(error = %first, "Recovered model JSON after quote repair");
            Some(value)
        }
    }
}

/// Body of a fenced reply: from the first fence that opens a line to the
/// last fence in the text. `None` when no fence opens a line.
fn strip_code_fences(text: &str) -> Option<&str> {
    let open = text.match_indices("```").map(|(i, _)| i).find(|&i| {
        let before = text[..i].trim_end_matches([' ', '\t']);
        before.is_empty() || before.ends_with('\n')
    })?;
    let after_open = &text[open + 3..];
    // Skip the info string ("json", "JSON", ...) up to the end of the line.
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let body = &after_open[body_start..];
    Some(match body.rfind("```") {
        Some(close) => &body[..close],
        None => body,
    })
}

/// Whitespace controls become spaces; every other control is dropped.
fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            '\u{2028}' | '\u{2029}' | '\u{FFFD}' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

fn slice_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Escape quotes that appear inside string values without a backslash.
///
/// A quote inside a string closes it only when the next non-whitespace
/// character is structural (`,` `}` `]` `:`) or the input ends.
fn repair_unescaped_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if matches!(next, None | Some(',' | '}' | ']' | ':')) {
                    in_string = false;
                    out.push(c);
                } else {
                    out.push_str("\\\"");
                }
            }
            _ => out.push(c),
        }
    }
    out
}
