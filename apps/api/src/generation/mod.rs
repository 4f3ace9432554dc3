// Prompt generation pipeline.
// The completion call itself goes through llm_client; everything here is
// pure apart from `generator`, which drives the call.

pub mod extractor;
pub mod fallback;
pub mod generator;
pub mod handlers;
pub mod prompts;
