use serde::{Deserialize, Serialize};

/// One "would you rather" question: two options shown side by side.
///
/// Both options are non-empty after trimming when produced by the extractor
/// or the fallback catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPair {
    pub option_a: String,
    pub option_b: String,
}

impl PromptPair {
    pub fn new(option_a: impl Into<String>, option_b: impl Into<String>) -> Self {
        Self {
            option_a: option_a.into(),
            option_b: option_b.into(),
        }
    }
}

/// What the organizer asked for. `name` and `description` are the only theme signal.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub name: String,
    pub description: String,
    /// Exact number of pairs expected back. Values below 1 are treated as 1.
    pub count: usize,
    pub related_to_event: bool,
}

impl GenerationRequest {
    pub fn normalized_count(&self) -> usize {
        self.count.max(1)
    }
}

/// Invariant: `prompts.len() == request.normalized_count()`.
/// `reason` is diagnostic only and never carries secrets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub prompts: Vec<PromptPair>,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
