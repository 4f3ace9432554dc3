use std::sync::Arc;

use crate::config::Config;
use crate::generation::generator::PromptGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Stateless across calls; safe to share between concurrent requests.
    pub generator: Arc<PromptGenerator>,
}
