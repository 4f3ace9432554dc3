//! Prompt generation — the only public entry point of the generation pipeline.
//!
//! Flow: normalize count → (no credential? fallback) → build instructions →
//!       backoff-wrapped completion call → extract pairs → pad / truncate.
//!
//! CRITICAL: `generate` never fails. Every upstream problem degrades to a
//! result with `used_fallback = true` and a diagnostic `reason`, and the
//! returned list always holds exactly `max(1, count)` pairs.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::UpstreamSettings;
use crate::generation::extractor::extract_prompt_pairs;
use crate::generation::fallback::{fallback_prompts, pad_to};
use crate::generation::prompts::{build_user_prompt, GENERATION_SYSTEM};
use crate::llm_client::backoff::{send_with_backoff, BackoffConfig};
use crate::llm_client::{
    ChatCompletionBody, ChatCompletionRequest, ChatMessage, CompletionTransport,
};
use crate::models::prompt::{GenerationRequest, GenerationResult, PromptPair};

const REASON_MISSING_KEY: &str = "Missing OPENAI_API_KEY on server";
const REASON_NO_CONTENT: &str = "Model returned no parseable content";

/// Holds no per-request state; one instance is shared by all concurrent requests.
pub struct PromptGenerator {
    upstream: UpstreamSettings,
    backoff: BackoffConfig,
    transport: Arc<dyn CompletionTransport>,
}

impl PromptGenerator {
    pub fn new(
        upstream: UpstreamSettings,
        backoff: BackoffConfig,
        transport: Arc<dyn CompletionTransport>,
    ) -> Self {
        Self {
            upstream,
            backoff,
            transport,
        }
    }

    pub fn upstream_configured(&self) -> bool {
        self.upstream.api_key.is_some()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let span = info_span!(
            "generate_prompts",
            request_id = %Uuid::new_v4(),
            count = request.normalized_count(),
            related = request.related_to_event,
        );

        async {
            let result = self.run(request).await;
            match &result.reason {
                Some(reason) if result.used_fallback => {
                    warn!("Served fallback prompts: {reason}")
                }
                _ => info!("Served {} generated prompts", result.prompts.len()),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &GenerationRequest) -> GenerationResult {
        let count = request.normalized_count();

        let Some(api_key) = self.upstream.api_key.as_deref() else {
            return fallback_result(count, REASON_MISSING_KEY.to_string());
        };

        let completion_request = ChatCompletionRequest {
            url: self.upstream.completions_url(),
            api_key: api_key.to_string(),
            body: ChatCompletionBody {
                model: self.upstream.model.clone(),
                temperature: self.upstream.temperature,
                messages: vec![
                    ChatMessage::system(GENERATION_SYSTEM),
                    ChatMessage::user(build_user_prompt(request)),
                ],
            },
        };

        let response =
            match send_with_backoff(self.transport.as_ref(), &completion_request, &self.backoff)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    return fallback_result(
                        count,
                        self.redact(&format!("Upstream request failed: {e}")),
                    );
                }
            };

        if !response.is_success() {
            return fallback_result(count, self.redact(&response.status_summary()));
        }

        let Some(text) = response.completion_text() else {
            return fallback_result(count, REASON_NO_CONTENT.to_string());
        };

        let extracted = extract_prompt_pairs(&text);
        if extracted.is_empty() {
            return fallback_result(count, REASON_NO_CONTENT.to_string());
        }

        fit_to_count(extracted, count)
    }

    /// Scrubs the configured key out of anything that may reach the caller.
    fn redact(&self, reason: &str) -> String {
        match self.upstream.api_key.as_deref() {
            Some(key) if !key.is_empty() => reason.replace(key, "[redacted]"),
            _ => reason.to_string(),
        }
    }
}

fn fallback_result(count: usize, reason: String) -> GenerationResult {
    GenerationResult {
        prompts: fallback_prompts(count),
        used_fallback: true,
        reason: Some(reason),
    }
}

/// Truncates or pads `prompts` to exactly `count`. Any padding marks the result as fallback.
fn fit_to_count(mut prompts: Vec<PromptPair>, count: usize) -> GenerationResult {
    let produced = prompts.len();
    prompts.truncate(count);
    let padded = pad_to(&mut prompts, count);

    if padded == 0 {
        return GenerationResult {
            prompts,
            used_fallback: false,
            reason: None,
        };
    }

    GenerationResult {
        prompts,
        used_fallback: true,
        reason: Some(format!(
            "Model returned {produced} of {count} pairs; padded {padded} from fallback catalog"
        )),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
