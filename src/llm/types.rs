//! Wire types for OpenAI-compatible `/chat/completions`

use serde::{Deserialize, Serialize};

/// One message of a chat-completions request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Token budget and sampling temperature for one kind of call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallProfile {
    pub base_tokens: u32,
    pub temperature: f32,
}

impl CallProfile {
    pub const GENERATION: Self = Self {
        base_tokens: 500,
        temperature: 0.7,
    };
    pub const CLASSIFICATION: Self = Self {
        base_tokens: 20,
        temperature: 0.1,
    };
    pub const EXTRACTION: Self = Self {
        base_tokens: 10,
        temperature: 0.1,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Build a request with the token parameter shape the model family expects
    ///
    /// - `gpt-5-nano`: `max_completion_tokens` at three times the budget, no temperature
    /// - other `gpt-4` and `gpt-5` models: `max_completion_tokens`
    /// - everything else: legacy `max_tokens`
    pub fn new(model: &str, messages: Vec<ChatMessage>, profile: CallProfile) -> Self {
        let (max_tokens, max_completion_tokens, temperature) = if model.contains("gpt-5-nano") {
            (None, Some(profile.base_tokens * 3), None)
        } else if model.contains("gpt-4") || model.contains("gpt-5") {
            (None, Some(profile.base_tokens), Some(profile.temperature))
        } else {
            (Some(profile.base_tokens), None, Some(profile.temperature))
        };

        Self {
            model: model.to_string(),
            messages,
            max_tokens,
            max_completion_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: ProviderError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderError {
    #[serde(default)]
    pub message: Option<String>,
}
