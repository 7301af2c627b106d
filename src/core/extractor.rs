//! Turns a model's free-text reply into a JSON object.
//!
//! Models wrap JSON in code fences, add a sentence before or after it, and
//! now and then leave a trailing comma behind. [`extract`] strips the
//! wrapping, tries a strict decode, then one repair pass, and otherwise hands
//! back a [`ParseResult::Fallback`] carrying the raw text. It never fails.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::error::{PlannerError, Result};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Outcome of decoding a model reply. Callers must handle both arms.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Structured(Map<String, Value>),
    Fallback { raw_text: String, error: String },
}

impl ParseResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, ParseResult::Structured(_))
    }

    /// Structured object, or `MalformedResponse` carrying the parse error.
    pub fn into_object(self) -> Result<Map<String, Value>> {
        match self {
            ParseResult::Structured(object) => Ok(object),
            ParseResult::Fallback { error, .. } => Err(PlannerError::MalformedResponse(error)),
        }
    }

    fn fallback(raw_text: &str, error: impl Into<String>) -> Self {
        ParseResult::Fallback {
            raw_text: raw_text.to_string(),
            error: error.into(),
        }
    }
}

/// Decode the JSON object embedded in `raw_text`.
pub fn extract(raw_text: &str) -> ParseResult {
    let trimmed = strip_fences(raw_text.trim());
    if trimmed.is_empty() {
        return ParseResult::fallback(raw_text, "empty model response");
    }

    let Some(candidate) = object_span(trimmed) else {
        warn!(target: "trip_planner::extractor", "no JSON object in model response");
        return ParseResult::fallback(raw_text, "no JSON object found in model response");
    };

    let first_error = match decode_object(candidate) {
        Ok(object) => return ParseResult::Structured(object),
        Err(err) => err,
    };

    warn!(
        target: "trip_planner::extractor",
        error = %first_error,
        "model response is not valid JSON, attempting repair"
    );
    debug!(target: "trip_planner::extractor", response = %truncate(candidate, 1000));

    if let Some(repaired) = remove_trailing_commas(candidate) {
        if let Ok(object) = decode_object(&repaired) {
            info!(target: "trip_planner::extractor", "parsed model response after repair");
            return ParseResult::Structured(object);
        }
    }

    ParseResult::fallback(raw_text, first_error)
}

fn strip_fences(text: &str) -> &str {
    let mut text = text;
    if let Some(rest) = text.strip_prefix(JSON_FENCE) {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Span from the first `{` to the last `}`, inclusive.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn decode_object(candidate: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, found {}", type_label(&other))),
        Err(err) => Err(err.to_string()),
    }
}

fn trailing_comma() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r",(\s*[}\]])").ok())
        .as_ref()
}

/// Drop every comma that directly precedes a closing brace or bracket.
/// Returns `None` when there is nothing to repair.
fn remove_trailing_commas(text: &str) -> Option<String> {
    let pattern = trailing_comma()?;
    if !pattern.is_match(text) {
        return None;
    }
    Some(pattern.replace_all(text, "$1").into_owned())
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
