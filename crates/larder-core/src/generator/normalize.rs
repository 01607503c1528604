//! Recover a JSON object from raw generator text.
//!
//! Generators wrap JSON in prose, markdown fences, or an extra layer of
//! string encoding, and sometimes leave raw newlines inside string values.
//! [`normalize`] tries each [`Strategy`] in order and returns the first
//! object it finds. Parsing is tolerant of unescaped control characters
//! inside strings.

use std::borrow::Cow;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Upper bound on the raw-text preview carried by [`NormalizeError`].
pub const PREVIEW_MAX_BYTES: usize = 500;

/// No strategy produced an object.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no JSON object found in generator output: {preview:?}")]
pub struct NormalizeError {
    /// The start of the raw text, cut at a char boundary.
    pub preview: String,
}

/// One way of locating the JSON object inside generator text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The whole text, trimmed.
    WholeText,
    /// The body of a ```` ``` ```` fenced block, optionally language-tagged.
    FencedBlock,
    /// From the first `{` to the last `}`.
    BraceSlice,
}

impl Strategy {
    /// Strategies in the order they are tried.
    pub const CHAIN: [Strategy; 3] = [Self::WholeText, Self::FencedBlock, Self::BraceSlice];

    fn attempt(self, text: &str) -> Option<Map<String, Value>> {
        match self {
            Self::WholeText => parse_object(text.trim()),
            Self::FencedBlock => fenced_blocks(text).into_iter().find_map(parse_object),
            Self::BraceSlice => brace_slice(text).and_then(parse_object),
        }
    }
}

/// Extract the first JSON object from `raw`, along with the strategy that
/// found it.
pub fn recover(raw: &str) -> Option<(Strategy, Map<String, Value>)> {
    Strategy::CHAIN
        .into_iter()
        .find_map(|strategy| strategy.attempt(raw).map(|object| (strategy, object)))
}

/// Extract a JSON object from `raw` or fail with a bounded preview.
pub fn normalize(raw: &str) -> Result<Map<String, Value>, NormalizeError> {
    match recover(raw) {
        Some((strategy, object)) => {
            debug!(?strategy, keys = object.len(), "recovered JSON object");
            Ok(object)
        }
        None => Err(NormalizeError {
            preview: preview(raw, PREVIEW_MAX_BYTES),
        }),
    }
}

/// Accept an object, or a string whose contents decode to an object.
fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match parse_tolerant(candidate)? {
        Value::Object(object) => Some(object),
        Value::String(inner) => match parse_tolerant(&inner)? {
            Value::Object(object) => Some(object),
            _ => None,
        },
        _ => None,
    }
}

fn parse_tolerant(text: &str) -> Option<Value> {
    serde_json::from_str(text)
        .ok()
        .or_else(|| match escape_raw_control_chars(text) {
            Cow::Owned(escaped) => serde_json::from_str(&escaped).ok(),
            Cow::Borrowed(_) => None,
        })
}

/// Escape control characters that appear unescaped inside JSON strings.
fn escape_raw_control_chars(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| c < '\u{20}') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
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
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\u{20}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body = &after[language_tag_len(after)..];
        let Some(close) = body.find("```") else {
            break;
        };
        blocks.push(body[..close].trim());
        rest = &body[close + 3..];
    }
    blocks
}

/// Length of a language tag directly after an opening fence. A tag only
/// counts when whitespace follows it.
fn language_tag_len(s: &str) -> usize {
    let len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(s.len());
    match s[len..].chars().next() {
        Some(c) if c.is_whitespace() => len,
        _ => 0,
    }
}

fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Truncate `s` to at most `max_bytes` without splitting a character.
fn preview(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}
