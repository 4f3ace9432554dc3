//! Backoff controller — bounded retry-with-jitter around one `CompletionTransport`.
//!
//! Retries when the transport fails or the status is 429 / 5xx. Anything else,
//! including other 4xx, is handed back on the first attempt. After the budget
//! is spent the last response is returned as-is, or the last transport error
//! is propagated. Deciding to fall back is the caller's job.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::warn;

use crate::llm_client::{ChatCompletionRequest, CompletionTransport, LlmError, UpstreamResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Symmetric jitter as a fraction of the computed delay (0.3 = ±30%).
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(600),
            min_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(15),
            jitter_ratio: 0.3,
        }
    }
}

/// Per-invocation bookkeeping. Lives on the stack of one `send_with_backoff` call.
///
/// The last transport error is not stored here: it is carried by the `Err`
/// arm of the loop and returned directly once the budget is spent.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_retries.saturating_add(1),
        }
    }

    fn exhausted(&self) -> bool {
        self.attempt + 1 >= self.max_attempts
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Parses a `Retry-After` value given in (possibly fractional) seconds.
/// HTTP-date values are not honoured and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Delay before retry number `attempt` (0-based) with a random jitter draw.
pub fn compute_delay(config: &BackoffConfig, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let ratio = config.jitter_ratio.abs();
    let jitter = if ratio > 0.0 {
        rand::thread_rng().gen_range(-ratio..=ratio)
    } else {
        0.0
    };
    compute_delay_with_jitter(config, attempt, retry_after, jitter)
}

/// Pure form of [`compute_delay`]: `jitter` is the signed fraction to apply.
///
/// `Retry-After` wins over `base * 2^attempt`; the result is always clamped
/// into `[min_delay, max_delay]`.
pub fn compute_delay_with_jitter(
    config: &BackoffConfig,
    attempt: u32,
    retry_after: Option<Duration>,
    jitter: f64,
) -> Duration {
    let raw_ms = match retry_after {
        Some(delay) => delay.as_secs_f64() * 1000.0,
        None => {
            let exponent = attempt.min(30) as i32;
            config.base_delay.as_secs_f64() * 1000.0 * 2f64.powi(exponent)
        }
    };

    let jittered = (raw_ms * (1.0 + jitter)).round();
    let min_ms = config.min_delay.as_secs_f64() * 1000.0;
    let max_ms = config.max_delay.as_secs_f64() * 1000.0;
    let clamped = jittered.max(min_ms).min(max_ms).max(0.0);

    Duration::from_millis(clamped as u64)
}

/// Sends `request` through `transport`, retrying transient failures.
pub async fn send_with_backoff(
    transport: &dyn CompletionTransport,
    request: &ChatCompletionRequest,
    config: &BackoffConfig,
) -> Result<UpstreamResponse, LlmError> {
    let mut state = RetryState::new(config.max_retries);

    loop {
        let retry_after = match transport.send(request).await {
            Ok(response) if !is_retryable_status(response.status) => return Ok(response),
            Ok(response) => {
                if state.exhausted() {
                    warn!(
                        "Upstream still returning {} after {} attempts, giving up",
                        response.status, state.max_attempts
                    );
                    return Ok(response);
                }
                warn!(
                    "Upstream returned {} on attempt {}/{}",
                    response.status,
                    state.attempt + 1,
                    state.max_attempts
                );
                response.retry_after().and_then(parse_retry_after)
            }
            Err(e) => {
                if state.exhausted() {
                    warn!(
                        "Upstream transport failed after {} attempts: {}",
                        state.max_attempts, e
                    );
                    return Err(e);
                }
                warn!(
                    "Upstream transport error on attempt {}/{}: {}",
                    state.attempt + 1,
                    state.max_attempts,
                    e
                );
                None
            }
        };

        let delay = compute_delay(config, state.attempt, retry_after);
        warn!("Retrying upstream call after {}ms", delay.as_millis());
        sleep(delay).await;
        state.attempt += 1;
    }
}
