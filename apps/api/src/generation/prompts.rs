// Instruction templates for prompt-pair generation.

use crate::models::prompt::GenerationRequest;

/// System prompt — fixes the output contract. N is supplied in the user prompt.
pub const GENERATION_SYSTEM: &str = r#"You are a creative event content generator.
Return ONLY a JSON array of objects like:
[
  { "optionA": "...", "optionB": "..." }
]

Rules:
- Produce exactly N pairs (N given by the user).
- Make them fun, punchy, and balanced; each option is at most ~80 characters.
- Inclusive, safe for general audiences; avoid sensitive or controversial topics.
- No duplicates or near-duplicates.
- Style: lively, specific, and themed when asked (avoid generic "work hard" tropes).
- If asked to relate to the event, infer the theme ONLY from the event NAME and DESCRIPTION (e.g. coding, baking, startups, design) and weave it naturally into the options.
- If not asked to relate, generate universally engaging pairs suitable for a mixed audience.
- Output JSON only, no markdown code fences, no extra commentary."#;

/// User prompt template.
/// Replace: {name}, {description}, {relate_line}, {count}
pub const GENERATION_USER_TEMPLATE: &str = r#"Event name: {name}
Event description: {description}

{relate_line}
Number of pairs to generate (N): {count}

Return JSON ONLY."#;

pub const RELATE_TO_EVENT: &str =
    "Relate the questions to the event's theme inferred ONLY from name/description.";

pub const KEEP_UNIVERSAL: &str =
    "Do NOT tailor to any theme; keep them universally appealing.";

const UNSPECIFIED: &str = "(unspecified)";

pub fn build_user_prompt(request: &GenerationRequest) -> String {
    let relate_line = if request.related_to_event {
        RELATE_TO_EVENT
    } else {
        KEEP_UNIVERSAL
    };

    // {description} and {name} are filled last so organizer text containing
    // a placeholder is never expanded.
    GENERATION_USER_TEMPLATE
        .replace("{relate_line}", relate_line)
        .replace("{count}", &request.normalized_count().to_string())
        .replace("{description}", or_unspecified(&request.description))
        .replacen("{name}", or_unspecified(&request.name), 1)
}

fn or_unspecified(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        UNSPECIFIED
    } else {
        trimmed
    }
}
