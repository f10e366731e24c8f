//! Chat endpoint handler
//!
//! Handles `POST /api/chat` (and its `/api/v1/chat/message` mirror).

use crate::error::{AppError, AppResult};
use crate::handlers::{ApiResponse, AppState};
use crate::middleware::{RequestId, SessionToken};
use crate::store::{Message, MessageRole};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat request from client
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

impl ChatRequest {
    /// Reject blank or oversized messages (length counts characters)
    pub fn validate(&self, max_chars: usize) -> AppResult<()> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation(
                "El mensaje es obligatorio".to_string(),
            ));
        }

        let char_count = self.message.chars().count();
        if char_count > max_chars {
            return Err(AppError::Validation(format!(
                "El mensaje no puede superar {} caracteres",
                max_chars
            )));
        }

        if matches!(self.conversation_id, Some(id) if id <= 0) {
            return Err(AppError::Validation(
                "El identificador de conversación no es válido".to_string(),
            ));
        }

        Ok(())
    }
}

/// Wire form of a stored message
///
/// `weather_data_used` is omitted for the user side of a fresh exchange.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub content: String,
    pub role: MessageRole,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_data_used: Option<bool>,
}

impl MessageView {
    pub fn brief(message: Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            role: message.role,
            created_at: message.created_at,
            weather_data_used: None,
        }
    }

    pub fn full(message: Message) -> Self {
        let weather_data_used = Some(message.weather_data_used);
        Self {
            weather_data_used,
            ..Self::brief(message)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatData {
    pub conversation_id: i64,
    pub user_message: MessageView,
    pub assistant_message: MessageView,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Extension(session): Extension<SessionToken>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<ChatData>>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(request_id = %request_id, error = %rejection.body_text(), "Rejected chat body");
        AppError::Validation("El cuerpo de la solicitud no es válido".to_string())
    })?;
    request.validate(state.config().chat.max_message_chars)?;

    tracing::info!(
        request_id = %request_id,
        conversation_id = ?request.conversation_id,
        message_chars = request.message.chars().count(),
        "Received chat message"
    );

    let exchange = state
        .orchestrator()
        .process(session.as_str(), &request.message, request.conversation_id)
        .await?;

    Ok(Json(ApiResponse::ok(ChatData {
        conversation_id: exchange.conversation_id,
        user_message: MessageView::brief(exchange.user_message),
        assistant_message: MessageView::full(exchange.assistant_message),
    })))
}
