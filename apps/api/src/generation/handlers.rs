//! Axum route handler for prompt generation.
//!
//! The endpoint always answers 200 with a `GenerationResult`. Request bodies
//! are decoded leniently: a missing or malformed body behaves like `{}`.

use axum::{extract::State, Json};
use bytes::Bytes;
use serde_json::Value;

use crate::models::prompt::{GenerationRequest, GenerationResult};
use crate::state::AppState;

const DEFAULT_COUNT: usize = 5;

/// POST /generate-prompts (also mounted at /api/generate-prompts)
///
/// Body: `{ name?, description?, count?, relatedToEvent? }`.
/// Response: `{ prompts: [{optionA, optionB}], usedFallback, reason? }`.
pub async fn handle_generate_prompts(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<GenerationResult> {
    let request = decode_request(&body, state.config.max_prompt_count);
    Json(state.generator.generate(&request).await)
}

/// Builds a `GenerationRequest` from whatever the client sent.
/// `max_count` is an opt-in ceiling; `None` passes the count through untouched.
pub fn decode_request(body: &[u8], max_count: Option<usize>) -> GenerationRequest {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

    let count = field(&value, "count")
        .and_then(coerce_count)
        .unwrap_or(DEFAULT_COUNT)
        .max(1);
    let count = match max_count {
        Some(cap) => count.min(cap.max(1)),
        None => count,
    };

    GenerationRequest {
        name: field(&value, "name").map(stringify).unwrap_or_default(),
        description: field(&value, "description")
            .map(stringify)
            .unwrap_or_default(),
        count,
        related_to_event: field(&value, "relatedToEvent")
            .map(truthy)
            .unwrap_or(true),
    }
}

/// A present, non-null field of a JSON object.
fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers or numeric strings, truncated toward zero. Negatives become 0
/// and are raised to 1 by the caller.
fn coerce_count(value: &Value) -> Option<usize> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.trunc().max(0.0).min(usize::MAX as f64) as usize)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}
