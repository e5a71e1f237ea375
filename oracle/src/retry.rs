//! HTTP retry policy with exponential backoff.
//!
//! Transport-level retries sit below the engine's attempt counting: a
//! request that succeeds on its second wire attempt still counts as one
//! oracle call upstream.
//!
//! # Policy
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 500ms, doubling per retry, capped at 8 seconds
//! - Down-jitter up to 25% (multiplier in [0.75, 1.0])
//! - `Retry-After` / `Retry-After-Ms` honored when under a minute
//! - Retryable: HTTP 408, 409, 429, 5xx, and connection errors;
//!   an `x-should-retry` response header overrides either way
//!
//! Every attempt of one logical request carries the same `Idempotency-Key`
//! so a server that saw a dropped response does not execute it twice.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries, not counting the initial request.
    pub max_retries: u32,
    /// Backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

/// Parse `Retry-After-Ms` (preferred) or `Retry-After` from a response.
///
/// A hint is accepted only when it lands strictly between zero and one
/// minute; anything else falls through, ultimately to computed backoff.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let bounded = |d: Duration| (d > Duration::ZERO && d < Duration::from_secs(60)).then_some(d);

    headers
        .get("retry-after-ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
        .and_then(bounded)
        .or_else(|| {
            headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .and_then(|secs| bounded(Duration::from_secs(secs)))
        })
}

/// Whether a response status warrants another attempt. The server's
/// `x-should-retry` header wins when present.
#[must_use]
pub fn should_retry(status: StatusCode, headers: &HeaderMap) -> bool {
    match headers.get("x-should-retry").and_then(|v| v.to_str().ok()) {
        Some(s) if s.eq_ignore_ascii_case("true") => true,
        Some(s) if s.eq_ignore_ascii_case("false") => false,
        _ => matches!(
            status.as_u16(),
            408 | 409 | 429 | 500 | 502 | 503 | 504 | 520..=599
        ),
    }
}

/// Delay before the next attempt. `backoff_step` is 0 before the first
/// retry, 1 before the second, and so on.
#[must_use]
pub fn calculate_retry_delay(
    backoff_step: u32,
    config: &RetryConfig,
    headers: Option<&HeaderMap>,
) -> Duration {
    if let Some(server_hint) = headers.and_then(parse_retry_after) {
        return server_hint;
    }

    let doubled = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = doubled.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

fn add_retry_headers(
    builder: RequestBuilder,
    retry_count: u32,
    idempotency_key: &str,
) -> RequestBuilder {
    builder
        .header("X-Gambit-Retry-Count", retry_count.to_string())
        .header("Idempotency-Key", idempotency_key)
}

#[must_use]
pub fn generate_idempotency_key() -> String {
    format!("gambit-retry-{}", Uuid::new_v4())
}

/// Outcome of a retried request.
///
/// A sum type rather than a `Result` so callers cannot accidentally treat
/// an error response as success, and so the error response body stays
/// available for inspection.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response after exhausting retries (or a non-retryable
    /// status). Carries the response for error body inspection.
    HttpError(Response),
    /// Transport failure after exhausting retries.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
    /// Transport failure on the first attempt that cannot be retried.
    NonRetryable(reqwest::Error),
}

/// Send a request with automatic retries.
///
/// `build_request` is called once per attempt; the returned builder must
/// describe the same logical request each time.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let idempotency_key = generate_idempotency_key();
    let mut attempt: u32 = 0;

    loop {
        let final_attempt = attempt == config.max_retries;
        let request = add_retry_headers(build_request(), attempt, &idempotency_key);

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                let status = response.status();
                let headers = response.headers().clone();
                if final_attempt || !should_retry(status, &headers) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = calculate_retry_delay(attempt, config, Some(&headers));
                tracing::debug!(
                    %status,
                    next_attempt = attempt + 2,
                    delay_ms = delay.as_millis(),
                    "oracle responded with a retryable status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(source) if final_attempt || !is_retryable_error(&source) => {
                if attempt == 0 {
                    return RetryOutcome::NonRetryable(source);
                }
                return RetryOutcome::ConnectionError {
                    attempts: attempt + 1,
                    source,
                };
            }
            Err(source) => {
                let delay = calculate_retry_delay(attempt, config, None);
                tracing::debug!(
                    error = %source,
                    next_attempt = attempt + 2,
                    delay_ms = delay.as_millis(),
                    "oracle connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        attempt += 1;
    }
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}
