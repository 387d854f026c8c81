//! Structured-output parsing
//!
//! Models wrap JSON in prose, forget closing fences, or append commentary.
//! Candidates are extracted in a fixed order and the first one that parses
//! wins:
//!
//! 1. the first ```` ```json ```` fenced block
//! 2. the first generic fenced block
//! 3. a bracket-depth scan from each `{` in the text
//! 4. the raw trimmed text
//!
//! Bracket matching skips over string literals and escapes, so braces inside
//! quoted values never desynchronise the depth counter. A total failure is
//! an error; callers decide whether to fall back.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Extraction strategy that produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// ```` ```json ```` fenced block
    JsonFence,
    /// Any fenced block
    GenericFence,
    /// Balanced braces found in running text
    BraceScan,
    /// The whole text
    Raw,
}

/// Errors from structured-output parsing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No strategy produced valid JSON
    #[error("no valid JSON found (tried {attempts} candidates): {preview}")]
    NoJson {
        /// Number of candidates tried
        attempts: usize,
        /// Start of the offending text
        preview: String,
    },

    /// JSON was found but does not have the expected shape
    #[error("JSON does not match expected shape: {0}")]
    Shape(String),
}

const PREVIEW_CHARS: usize = 120;

/// Extract the first valid JSON value and the strategy that found it
pub fn extract_json_value(text: &str) -> Result<(Value, Strategy), ParseError> {
    let candidates = candidates(text);
    let attempts = candidates.len();
    candidates
        .into_iter()
        .find_map(|(strategy, slice)| {
            serde_json::from_str::<Value>(slice)
                .ok()
                .map(|value| (value, strategy))
        })
        .ok_or_else(|| ParseError::NoJson {
            attempts,
            preview: preview(text),
        })
}

/// Like [`extract_json_value`], preferring the first object that has `key`
///
/// Falls back to the first valid value when no candidate has the key.
pub fn extract_json_value_with_key(text: &str, key: &str) -> Result<(Value, Strategy), ParseError> {
    let keyed = candidates(text).into_iter().find_map(|(strategy, slice)| {
        serde_json::from_str::<Value>(slice)
            .ok()
            .filter(|v| v.get(key).is_some())
            .map(|value| (value, strategy))
    });
    match keyed {
        Some(found) => Ok(found),
        None => extract_json_value(text),
    }
}

/// Extract JSON and deserialize it into `T`
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let (value, _) = extract_json_value(text)?;
    serde_json::from_value(value).map_err(|e| ParseError::Shape(e.to_string()))
}

/// Candidate slices in strategy order
fn candidates(text: &str) -> Vec<(Strategy, &str)> {
    let mut out = Vec::new();

    if let Some(body) = fence_body(text, true) {
        if let Some(slice) = first_balanced(body) {
            out.push((Strategy::JsonFence, slice));
        }
    }

    if let Some(body) = fence_body(text, false) {
        match first_balanced(body) {
            Some(slice) => out.push((Strategy::GenericFence, slice)),
            None => out.push((Strategy::GenericFence, body.trim())),
        }
    }

    for (idx, _) in text.match_indices('{') {
        if let Some(slice) = balanced_from(text, idx) {
            out.push((Strategy::BraceScan, slice));
        }
    }

    out.push((Strategy::Raw, text.trim()));
    out
}

/// Body of the first fence; runs to the end of the text if unclosed
fn fence_body(text: &str, json_only: bool) -> Option<&str> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find("```") {
        let fence = search_from + rel;
        let after = &text[fence + 3..];
        let line_end = after.find('\n').unwrap_or(after.len());
        let tag = after[..line_end].trim();

        if !json_only || tag.eq_ignore_ascii_case("json") {
            let body = &after[line_end..];
            let end = body.find("```").unwrap_or(body.len());
            return Some(&body[..end]);
        }
        search_from = fence + 3 + line_end;
        if search_from >= text.len() {
            break;
        }
    }
    None
}

/// Balanced object or array starting at the first opening bracket
fn first_balanced(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    balanced_from(text, start)
}

/// Balanced slice starting at byte `start`, which must be `{` or `[`
fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: arbitrary prose around a serialized object never hides it
        #[test]
        fn test_object_survives_prose(
            key in "[a-z]{1,8}",
            value in "[ -~]{0,24}",
            prefix in "[a-zA-Z .,:]{0,40}",
            suffix in "[a-zA-Z .,:]{0,40}",
        ) {
            let mut map = serde_json::Map::new();
            map.insert(key, Value::String(value));
            let object = Value::Object(map);
            let text = format!("{}{}{}", prefix, object, suffix);
            let (parsed, _) = extract_json_value(&text).unwrap();
            prop_assert_eq!(parsed, object);
        }
    }
}
