//! Conversation listing, detail and deletion for the caller's session

use crate::error::{AppError, AppResult};
use crate::handlers::chat::MessageView;
use crate::handlers::{ApiResponse, AppState};
use crate::middleware::SessionToken;
use crate::store::{self, ConversationSummary};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for a conversation with no stored exchange yet
pub const NO_MESSAGES_PLACEHOLDER: &str = "Sin mensajes";

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 50;

pub const DELETED_MESSAGE: &str = "Conversación eliminada exitosamente";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

impl ListParams {
    fn limit(&self) -> AppResult<u32> {
        match self.limit {
            None => Ok(DEFAULT_LIST_LIMIT),
            Some(limit) if (1..=MAX_LIST_LIMIT).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::Validation(format!(
                "El límite debe estar entre 1 y {} (recibido {})",
                MAX_LIST_LIMIT, limit
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationListItem {
    pub id: i64,
    pub title: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message: String,
    pub messages_count: i64,
}

impl From<ConversationSummary> for ConversationListItem {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            last_message_at: summary.last_message_at,
            last_message: summary
                .last_message
                .unwrap_or_else(|| NO_MESSAGES_PLACEHOLDER.to_string()),
            messages_count: summary.messages_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    pub id: i64,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

fn conversation_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    match path {
        Ok(Path(id)) if id > 0 => Ok(id),
        _ => Err(AppError::Validation(
            "El identificador de conversación no es válido".to_string(),
        )),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<ConversationListItem>>>> {
    let Query(params) = params.map_err(|rejection| {
        AppError::Validation(format!("Parámetros no válidos: {}", rejection.body_text()))
    })?;
    let limit = params.limit()?;

    let mut conn = state.pool().acquire().await?;
    let rows = store::list_conversations(&mut conn, session.as_str(), limit).await?;

    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(ConversationListItem::from).collect(),
    )))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ApiResponse<ConversationDetail>>> {
    let id = conversation_id(path)?;

    let mut conn = state.pool().acquire().await?;
    let conversation = store::find_conversation(&mut conn, id, session.as_str()).await?;
    let messages = store::conversation_messages(&mut conn, conversation.id).await?;

    Ok(Json(ApiResponse::ok(ConversationDetail {
        id: conversation.id,
        title: conversation.title,
        created_at: conversation.created_at,
        last_message_at: conversation.last_message_at,
        messages: messages.into_iter().map(MessageView::full).collect(),
    })))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(session): Extension<SessionToken>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<DeleteResponse>> {
    let id = conversation_id(path)?;

    let mut conn = state.pool().acquire().await?;
    store::delete_conversation(&mut conn, id, session.as_str()).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: DELETED_MESSAGE,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_limit_defaults_and_bounds() {
        assert_eq!(ListParams { limit: None }.limit().ok(), Some(DEFAULT_LIST_LIMIT));
        assert_eq!(ListParams { limit: Some(50) }.limit().ok(), Some(50));
        assert!(ListParams { limit: Some(0) }.limit().is_err());
        assert!(ListParams { limit: Some(51) }.limit().is_err());
    }

    #[test]
    fn test_empty_conversation_shows_placeholder() {
        let item = ConversationListItem::from(ConversationSummary {
            id: 1,
            title: None,
            last_message: None,
            last_message_at: None,
            messages_count: 0,
        });
        assert_eq!(item.last_message, NO_MESSAGES_PLACEHOLDER);
    }
}
