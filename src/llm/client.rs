//! OpenAI-compatible chat-completions client

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ProviderErrorBody};
use crate::config::LlmConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::time::Duration;

/// Failures of a single completion call
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("connection to completions endpoint failed: {0}")]
    Connect(String),

    #[error("completion request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Non-2xx answer; `message` is the provider's `error.message` when present
    #[error("completions endpoint returned {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Status { status: u16, message: Option<String> },

    #[error("completion response had no content")]
    EmptyCompletion,

    #[error("completion response could not be decoded: {0}")]
    InvalidBody(String),

    #[error("completion request failed: {0}")]
    Transport(String),
}

/// A chat-completions backend, injectable for tests
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Model name requests should be built for
    fn model(&self) -> &str;

    /// Send one request and return the first choice's trimmed text
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<String, LlmError>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build completions client: {}", e)))?;

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!(
                api_key_env = %config.api_key_env,
                "No API key configured; analysis will use keyword fallbacks and generation will fail"
            );
        }

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message);
            tracing::error!(
                status = status.as_u16(),
                provider_message = message.as_deref().unwrap_or(""),
                "Completions endpoint returned an error"
            );
            return Err(LlmError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::InvalidBody(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        match content {
            Some(text) => Ok(text),
            None => {
                tracing::error!(
                    body_preview = %body.chars().take(200).collect::<String>(),
                    "Completions endpoint returned no content"
                );
                Err(LlmError::EmptyCompletion)
            }
        }
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(timeout)
    } else if err.is_connect() {
        LlmError::Connect(err.to_string())
    } else {
        LlmError::Transport(err.to_string())
    }
}
