//! Reply generation
//!
//! Builds the persona + history + current turn, calls the completions
//! backend, and filters the output. Every failure is converted into a
//! localized [`GenerationError`]; nothing is thrown past this boundary.

use super::client::{ChatCompletion, LlmError};
use super::prompts::{PROMPT_VERSION, system_prompt};
use super::types::{CallProfile, ChatCompletionRequest, ChatMessage};
use crate::error::AppResult;
use crate::security::{LeakageFilter, SecurityScreen, sanitize_user_input};
use crate::store::HistoryEntry;
use crate::weather::WeatherSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Marker introducing live weather data in the user turn
pub const WEATHER_DATA_MARKER: &str = "[DATOS METEOROLÓGICOS ACTUALES]";
/// Marker introducing a weather lookup failure in the user turn
pub const WEATHER_ERROR_MARKER: &str = "[ERROR SERVICIO CLIMA]";

const MISSING_KEY_MESSAGE: &str =
    "API key de OpenAI no configurada. Por favor verifica tu configuración.";
const CONNECTION_MESSAGE: &str =
    "No se pudo conectar al servicio de IA. Verifica tu conexión a internet.";
const TIMEOUT_MESSAGE: &str =
    "La consulta al servicio de IA está tardando demasiado. Intenta con un mensaje más corto.";
const QUOTA_MESSAGE: &str = "El servicio de IA ha alcanzado su límite de uso. Intenta más tarde o contacta al administrador.";
const AUTH_MESSAGE: &str = "Error de autenticación con el servicio de IA. Contacta al administrador.";
const UNSUPPORTED_MESSAGE: &str =
    "Configuración incompatible del servicio de IA. Contacta al administrador.";
const BUSY_MESSAGE: &str = "El servicio de IA está muy ocupado. Intenta nuevamente en unos segundos.";
const SERVER_MESSAGE: &str =
    "El servicio de IA está experimentando problemas técnicos. Intenta más tarde.";
const TRANSIENT_MESSAGE: &str = "Error temporal del servicio de IA. Intenta nuevamente.";
const UNAVAILABLE_MESSAGE: &str = "Servicio de IA temporalmente no disponible";
const EMPTY_MESSAGE: &str = "Respuesta vacía del servicio de IA.";

/// Everything the generator needs for one reply
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// The user's message as received; sanitized here before use
    pub message: &'a str,
    pub weather: Option<&'a WeatherSnapshot>,
    /// Localized sentence describing a failed weather lookup
    pub weather_error: Option<&'a str>,
    pub history: &'a [HistoryEntry],
    pub is_first_message: bool,
    pub user_city: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub text: String,
    /// The model output was replaced by the leakage filter
    pub leakage_blocked: bool,
}

/// Generation failure carrying the sentence shown to the user
#[derive(Debug, Clone, thiserror::Error)]
#[error("{user_message}")]
pub struct GenerationError {
    pub user_message: String,
    /// Raw cause, for logs only
    pub detail: String,
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        Self {
            user_message: user_message_for(&err).to_string(),
            detail: err.to_string(),
        }
    }
}

/// Produces the assistant's reply for one exchange
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedReply, GenerationError>;
}

pub struct LlmResponseGenerator {
    client: Arc<dyn ChatCompletion>,
    screen: Arc<SecurityScreen>,
    leakage: LeakageFilter,
    timeout: Duration,
}

impl LlmResponseGenerator {
    pub fn new(
        client: Arc<dyn ChatCompletion>,
        screen: Arc<SecurityScreen>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client,
            screen,
            leakage: LeakageFilter::new()?,
            timeout,
        })
    }

    /// Assemble the full message list sent to the backend
    pub fn build_messages(&self, request: &GenerationRequest<'_>) -> Vec<ChatMessage> {
        let sanitized = sanitize_user_input(request.message);
        let verdict = self.screen.evaluate(&sanitized.text);
        if verdict.score > 0 || verdict.matched_pattern.is_some() {
            tracing::warn!(
                score = verdict.score,
                pattern = verdict.matched_pattern.unwrap_or(""),
                "Injection phrasing present in message forwarded to the model"
            );
        }

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage::system(system_prompt(
            request.is_first_message,
            request.user_city,
        )));
        messages.extend(
            request
                .history
                .iter()
                .map(|entry| ChatMessage::new(entry.role.as_str(), entry.content.clone())),
        );
        messages.push(ChatMessage::user(user_turn(
            &sanitized.text,
            request.weather,
            request.weather_error,
        )));
        messages
    }
}

/// Current user turn with optional weather data and failure diagnostic
pub fn user_turn(
    message: &str,
    weather: Option<&WeatherSnapshot>,
    weather_error: Option<&str>,
) -> String {
    let mut content = message.to_string();
    if let Some(snapshot) = weather {
        let data = serde_json::to_string_pretty(snapshot)
            .unwrap_or_else(|_| format!("{:?}", snapshot));
        content.push_str(&format!("\n\n{}:\n{}", WEATHER_DATA_MARKER, data));
    }
    if let Some(error) = weather_error {
        content.push_str(&format!("\n\n{}: {}", WEATHER_ERROR_MARKER, error));
    }
    content
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedReply, GenerationError> {
        let messages = self.build_messages(&request);
        let completion =
            ChatCompletionRequest::new(self.client.model(), messages, CallProfile::GENERATION);

        tracing::debug!(
            model = %self.client.model(),
            prompt_version = PROMPT_VERSION,
            history_len = request.history.len(),
            has_weather = request.weather.is_some(),
            has_weather_error = request.weather_error.is_some(),
            "Requesting reply generation"
        );

        let text = self
            .client
            .complete(&completion, self.timeout)
            .await
            .map_err(|e| {
                let err = GenerationError::from(e);
                tracing::error!(detail = %err.detail, "Reply generation failed");
                err
            })?;

        let verdict = self.leakage.filter(text);
        let leakage_blocked = verdict.is_blocked();
        Ok(GeneratedReply {
            text: verdict.into_text(),
            leakage_blocked,
        })
    }
}

/// Fixed localized sentence for a backend failure
pub fn user_message_for(err: &LlmError) -> &'static str {
    match err {
        LlmError::MissingApiKey => MISSING_KEY_MESSAGE,
        LlmError::Connect(_) => CONNECTION_MESSAGE,
        LlmError::Timeout(_) => TIMEOUT_MESSAGE,
        LlmError::EmptyCompletion | LlmError::InvalidBody(_) => EMPTY_MESSAGE,
        LlmError::Transport(_) => TRANSIENT_MESSAGE,
        LlmError::Status {
            message: None, ..
        } => UNAVAILABLE_MESSAGE,
        LlmError::Status {
            status,
            message: Some(message),
        } => {
            let lowered = message.to_lowercase();
            if lowered.contains("quota") || lowered.contains("billing") {
                QUOTA_MESSAGE
            } else if lowered.contains("invalid") || lowered.contains("unauthorized") {
                AUTH_MESSAGE
            } else if lowered.contains("unsupported") || lowered.contains("not supported") {
                UNSUPPORTED_MESSAGE
            } else if *status == 429 {
                BUSY_MESSAGE
            } else if *status >= 500 {
                SERVER_MESSAGE
            } else {
                TRANSIENT_MESSAGE
            }
        }
    }
}
