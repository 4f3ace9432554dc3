//! Fallback catalog — pre-authored prompt pairs served when the model can't be used.
//!
//! Deterministic: the same `count` always yields the same list.

use crate::models::prompt::PromptPair;

const CATALOG: &[(&str, &str)] = &[
    ("Arrive 15 minutes early", "Stay 15 minutes late"),
    ("Talk to someone new first", "Stick with your crew first"),
    ("Show a project you’re proud of", "Ask someone about theirs"),
    ("Eat snacks immediately", "Save snacks for after"),
    ("Join the first activity", "Watch one round before joining"),
    ("Lead a quick demo", "Host a quick Q&A"),
    ("Stand front row", "Find a cozy back seat"),
];

/// Exactly `max(1, count)` pairs, cycling the catalog from the start.
pub fn fallback_prompts(count: usize) -> Vec<PromptPair> {
    CATALOG
        .iter()
        .cycle()
        .take(count.max(1))
        .map(|(a, b)| PromptPair::new(*a, *b))
        .collect()
}

/// Appends catalog pairs (from the start, cycling) until `prompts.len() == count`.
/// Returns how many pairs were appended.
pub fn pad_to(prompts: &mut Vec<PromptPair>, count: usize) -> usize {
    let missing = count.saturating_sub(prompts.len());
    if missing > 0 {
        prompts.extend(fallback_prompts(missing));
    }
    missing
}
