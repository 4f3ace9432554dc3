use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::backoff::BackoffConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.9;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Everything the orchestrator needs to talk to the completion endpoint.
/// `api_key: None` puts the service in fallback-only mode.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl UpstreamSettings {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every field has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub upstream: UpstreamSettings,
    pub backoff: BackoffConfig,
    /// Per-attempt transport timeout.
    pub request_timeout: Duration,
    /// Optional ceiling applied to `count` at the HTTP layer. Unset by default,
    /// in which case every requested count is honoured exactly.
    pub max_prompt_count: Option<usize>,
    pub port: u16,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamSettings::default(),
            backoff: BackoffConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_prompt_count: None,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        let upstream = UpstreamSettings {
            api_key: optional_env("OPENAI_API_KEY"),
            base_url: optional_env("OPENAI_BASE_URL").unwrap_or(defaults.upstream.base_url),
            model: optional_env("OPENAI_MODEL").unwrap_or(defaults.upstream.model),
            temperature: parse_env("OPENAI_TEMPERATURE", defaults.upstream.temperature)?,
        };

        let backoff = BackoffConfig {
            max_retries: parse_env("UPSTREAM_MAX_RETRIES", defaults.backoff.max_retries)?,
            base_delay: parse_millis("UPSTREAM_BASE_DELAY_MS", defaults.backoff.base_delay)?,
            min_delay: parse_millis("UPSTREAM_MIN_DELAY_MS", defaults.backoff.min_delay)?,
            max_delay: parse_millis("UPSTREAM_MAX_DELAY_MS", defaults.backoff.max_delay)?,
            jitter_ratio: defaults.backoff.jitter_ratio,
        };

        Ok(Config {
            upstream,
            backoff,
            request_timeout: Duration::from_secs(parse_env(
                "UPSTREAM_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_prompt_count: match optional_env("PROMPT_MAX_COUNT") {
                Some(_) => Some(parse_env("PROMPT_MAX_COUNT", 1usize)?.max(1)),
                None => defaults.max_prompt_count,
            },
            port: parse_env("PORT", defaults.port)?,
            rust_log: optional_env("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}

/// Reads a variable, treating unset and blank as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

fn parse_millis(key: &str, default: Duration) -> Result<Duration> {
    parse_env(key, default.as_millis() as u64).map(Duration::from_millis)
}
