//! Conversation store: SQLite entities, pool setup and queries
//!
//! Query functions take `&mut SqliteConnection` so the same code runs on a
//! pooled connection or inside the orchestrator's transaction.

mod db;
mod queries;

pub use db::connect;
pub use queries::{
    claim_conversation, conversation_messages, create_conversation, delete_conversation,
    derive_title, find_conversation, history_window, insert_message, list_conversations,
    record_exchange,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation owned by one anonymous session
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    #[serde(skip_serializing)]
    pub session_token: String,
    pub title: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An append-only message row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    #[serde(skip_serializing)]
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub weather_data_used: bool,
    pub weather_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for a message about to be inserted
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: &'a str,
    pub weather_data_used: bool,
    pub weather_error: Option<&'a str>,
}

impl<'a> NewMessage<'a> {
    pub fn user(conversation_id: i64, content: &'a str) -> Self {
        Self {
            conversation_id,
            role: MessageRole::User,
            content,
            weather_data_used: false,
            weather_error: None,
        }
    }

    pub fn assistant(
        conversation_id: i64,
        content: &'a str,
        weather_data_used: bool,
        weather_error: Option<&'a str>,
    ) -> Self {
        Self {
            conversation_id,
            role: MessageRole::Assistant,
            content,
            weather_data_used,
            weather_error,
        }
    }
}

/// Listing row for a session's conversations
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ConversationSummary {
    pub id: i64,
    pub title: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub messages_count: i64,
}

/// `{role, content}` projection of a message used as model context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}
