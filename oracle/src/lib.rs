//! Reasoning-oracle clients for Gambit.
//!
//! The decision engine consults one external text-completion service - the
//! reasoning oracle - through the [`Oracle`] trait. Two implementations ship
//! here:
//!
//! - [`HttpOracle`] - client for any OpenAI-compatible chat-completions
//!   endpoint, with a hardened HTTP client and transport-level retries.
//! - [`ScriptedOracle`] - an in-memory queue of canned responses for tests
//!   and offline play.
//!
//! Oracle replies are free-form text; format adherence is never guaranteed.
//! Parsing and validation stay with the caller, which is why [`Completion`]
//! carries nothing but the raw text.

pub mod retry;

mod http;
mod scripted;

pub use http::{HttpOracle, HttpOracleConfig};
pub use scripted::{ScriptedOracle, ScriptedResponse};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 100;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Default completion budget when the caller does not specify one.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// A single-turn completion request: one prompt in, one reply out. There is
/// no conversation state; every call stands alone.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Optional system message sent ahead of the prompt.
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// The oracle's raw reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("oracle API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle returned an empty completion")]
    EmptyCompletion,
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),
    #[error("scripted oracle has no response left")]
    ScriptExhausted,
}

/// A text-completion service.
///
/// Implementations must be safe to share behind an `Arc`; the engine issues
/// calls strictly sequentially per decision, so no internal queuing is
/// required.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, OracleError>;
}

fn base_client_builder() -> reqwest::ClientBuilder {
    // No https_only: loopback endpoints (local inference servers, test
    // doubles) are legitimate oracle targets.
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder().timeout(timeout).build()
}

/// Read an error body up to a fixed cap so a misbehaving server cannot make
/// us buffer arbitrary amounts of data just to report a failure.
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Bearer credential for the oracle endpoint.
///
/// `Debug` is manually implemented to redact the value, preventing
/// accidental credential disclosure in logs or error messages.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
