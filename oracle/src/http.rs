//! OpenAI-compatible chat-completions client.
//!
//! Targets `POST {base}/v1/chat/completions`, which covers OpenAI itself
//! plus the long tail of local inference servers speaking the same
//! protocol. Non-streaming: one request, one JSON body back.

use crate::retry::{self, RetryConfig, RetryOutcome};
use crate::{
    ApiKey, Completion, CompletionRequest, Oracle, OracleError, build_http_client,
    read_capped_error_body,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Connection settings for an OpenAI-compatible completion endpoint.
#[derive(Debug, Clone)]
pub struct HttpOracleConfig {
    /// Base URL without the `/v1/chat/completions` suffix.
    pub base_url: String,
    /// Bearer credential; omit for unauthenticated local endpoints.
    pub api_key: Option<ApiKey>,
    pub model: String,
    /// Overall per-request deadline, connection time included. A request
    /// that exceeds it surfaces as [`OracleError::Timeout`].
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for HttpOracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_owned(),
            api_key: None,
            model: "gpt-4o-mini".to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

pub struct HttpOracle {
    client: reqwest::Client,
    config: HttpOracleConfig,
    endpoint: String,
}

impl HttpOracle {
    pub fn new(config: HttpOracleConfig) -> Result<Self, OracleError> {
        let client = build_http_client(config.request_timeout)?;
        let endpoint = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, OracleError> {
        let body = self.request_body(&request);

        let outcome = retry::send_with_retry(
            || {
                let mut builder = self.client.post(&self.endpoint).json(&body);
                if let Some(key) = &self.config.api_key {
                    builder = builder.bearer_auth(key.expose_secret());
                }
                builder
            },
            &self.config.retry,
        )
        .await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError(response) => {
                let status = response.status();
                let body = read_capped_error_body(response).await;
                return Err(OracleError::Api { status, body });
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                tracing::warn!(attempts, error = %source, "oracle unreachable after retries");
                return Err(self.classify_transport(source));
            }
            RetryOutcome::NonRetryable(source) => {
                return Err(self.classify_transport(source));
            }
        };

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OracleError::EmptyCompletion);
        }
        Ok(Completion { text })
    }
}

impl HttpOracle {
    fn classify_transport(&self, error: reqwest::Error) -> OracleError {
        if error.is_timeout() {
            OracleError::Timeout(self.config.request_timeout)
        } else {
            OracleError::Transport(error)
        }
    }
}
