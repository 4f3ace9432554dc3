//! Response extractor — turns the model's free-text reply into `PromptPair`s.
//!
//! The reply *should* be JSON, but models wrap it in code fences, prefix it with
//! commentary, or return `{"prompts": [...]}` instead of a bare array. Candidate
//! payloads are tried in order and the first one with a usable shape wins:
//!
//! 1. a ```` ```json ```` fenced block
//! 2. any fenced block
//! 3. the whole reply
//! 4. the span from the first `[`/`{` to the last `]`/`}`

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::prompt::PromptPair;

/// Options longer than this are cut on a char boundary.
pub const MAX_OPTION_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply JSON is neither an array nor an object with a `prompts` array")]
    UnexpectedShape,
}

/// Never fails: any parse problem yields an empty list.
pub fn extract_prompt_pairs(text: &str) -> Vec<PromptPair> {
    match parse_prompt_pairs(text) {
        Ok(pairs) => pairs,
        Err(e) => {
            debug!("Discarding unparseable model reply: {e}");
            Vec::new()
        }
    }
}

/// Strict form of [`extract_prompt_pairs`]. Returns the error from the last
/// candidate tried when none of them parse into a supported shape.
pub fn parse_prompt_pairs(text: &str) -> Result<Vec<PromptPair>, ExtractError> {
    let mut last_error = ExtractError::UnexpectedShape;

    for candidate in candidate_payloads(text) {
        match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(value) => match candidate_items(value) {
                Some(items) => return Ok(validate_items(items)),
                None => last_error = ExtractError::UnexpectedShape,
            },
            Err(e) => last_error = ExtractError::InvalidJson(e),
        }
    }

    Err(last_error)
}

fn candidate_payloads(text: &str) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(inner) = json_fence(text) {
        candidates.push(inner);
    }
    if let Some(inner) = any_fence(text) {
        candidates.push(inner);
    }
    candidates.push(text);
    if let Some(span) = bracket_span(text) {
        candidates.push(span);
    }
    candidates
}

/// Interior of the first fence whose info string is `json` (any case).
fn json_fence(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        if after
            .get(..4)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
        {
            let body = &after[4..];
            let close = body.find("```")?;
            return Some(&body[..close]);
        }
        // Skip past this fence's closing marker before looking again.
        let close = after.find("```")?;
        rest = &after[close + 3..];
    }
    None
}

/// Interior of the first fence, minus an info-string line such as `javascript`.
fn any_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let close = after.find("```")?;
    let inner = &after[..close];

    match inner.split_once('\n') {
        Some((first, remainder)) if !first.trim_start().starts_with(['[', '{']) => Some(remainder),
        _ => Some(inner),
    }
}

fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let end = text.rfind([']', '}'])?;
    (end > start).then(|| &text[start..=end])
}

fn candidate_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("prompts") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn validate_items(items: Vec<Value>) -> Vec<PromptPair> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| {
            let option_a = coerce_option(item.get("optionA"))?;
            let option_b = coerce_option(item.get("optionB"))?;
            Some(PromptPair { option_a, option_b })
        })
        .filter(|pair| seen.insert((pair.option_a.to_lowercase(), pair.option_b.to_lowercase())))
        .collect()
}

/// Strings are trimmed; numbers and booleans are stringified; anything else is rejected.
fn coerce_option(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Some(truncate_chars(raw, MAX_OPTION_CHARS))
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text,
    }
}
