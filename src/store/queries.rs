//! Conversation and message queries

use super::{Conversation, ConversationSummary, HistoryEntry, Message, NewMessage};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqliteConnection;

const CONVERSATION_COLUMNS: &str =
    "id, session_token, title, last_message, last_message_at, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, conversation_id, role, content, weather_data_used, weather_error, created_at";

/// Create an empty conversation owned by `session_token`
pub async fn create_conversation(
    conn: &mut SqliteConnection,
    session_token: &str,
) -> AppResult<Conversation> {
    let now = Utc::now();
    let conversation = sqlx::query_as::<_, Conversation>(&format!(
        "INSERT INTO conversations (session_token, created_at, updated_at) \
         VALUES (?, ?, ?) RETURNING {}",
        CONVERSATION_COLUMNS
    ))
    .bind(session_token)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(conversation_id = conversation.id, "Conversation created");
    Ok(conversation)
}

/// Look up a conversation owned by `session_token` and take the write lock
///
/// The no-op update makes this the transaction's first write, so concurrent
/// exchanges serialize here instead of failing at a later lock upgrade.
/// A conversation owned by another session is indistinguishable from a
/// missing one.
pub async fn claim_conversation(
    conn: &mut SqliteConnection,
    id: i64,
    session_token: &str,
) -> AppResult<Conversation> {
    sqlx::query_as::<_, Conversation>(&format!(
        "UPDATE conversations SET updated_at = updated_at \
         WHERE id = ? AND session_token = ? RETURNING {}",
        CONVERSATION_COLUMNS
    ))
    .bind(id)
    .bind(session_token)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("conversation {}", id)))
}

/// Read-only lookup scoped to the owning session
pub async fn find_conversation(
    conn: &mut SqliteConnection,
    id: i64,
    session_token: &str,
) -> AppResult<Conversation> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {} FROM conversations WHERE id = ? AND session_token = ?",
        CONVERSATION_COLUMNS
    ))
    .bind(id)
    .bind(session_token)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("conversation {}", id)))
}

/// The session's conversations, most recent activity first
pub async fn list_conversations(
    conn: &mut SqliteConnection,
    session_token: &str,
    limit: u32,
) -> AppResult<Vec<ConversationSummary>> {
    let rows = sqlx::query_as::<_, ConversationSummary>(
        "SELECT c.id, c.title, c.last_message, c.last_message_at, \
                COUNT(m.id) AS messages_count \
         FROM conversations c \
         LEFT JOIN messages m ON m.conversation_id = c.id \
         WHERE c.session_token = ? \
         GROUP BY c.id \
         ORDER BY COALESCE(c.last_message_at, c.created_at) DESC, c.id DESC \
         LIMIT ?",
    )
    .bind(session_token)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// All messages of a conversation in insertion order
pub async fn conversation_messages(
    conn: &mut SqliteConnection,
    conversation_id: i64,
) -> AppResult<Vec<Message>> {
    let rows = sqlx::query_as::<_, Message>(&format!(
        "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY id",
        MESSAGE_COLUMNS
    ))
    .bind(conversation_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Delete a conversation and, by cascade, its messages
pub async fn delete_conversation(
    conn: &mut SqliteConnection,
    id: i64,
    session_token: &str,
) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM conversations WHERE id = ? AND session_token = ?")
        .bind(id)
        .bind(session_token)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("conversation {}", id)));
    }

    tracing::info!(conversation_id = id, "Conversation deleted");
    Ok(())
}

pub async fn insert_message(
    conn: &mut SqliteConnection,
    message: NewMessage<'_>,
) -> AppResult<Message> {
    let row = sqlx::query_as::<_, Message>(&format!(
        "INSERT INTO messages \
         (conversation_id, role, content, weather_data_used, weather_error, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {}",
        MESSAGE_COLUMNS
    ))
    .bind(message.conversation_id)
    .bind(message.role)
    .bind(message.content)
    .bind(message.weather_data_used)
    .bind(message.weather_error)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Up to `limit` messages older than `before_id`, oldest first
pub async fn history_window(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    before_id: i64,
    limit: u32,
) -> AppResult<Vec<HistoryEntry>> {
    let rows = sqlx::query_as::<_, HistoryEntry>(
        "SELECT role, content FROM ( \
             SELECT id, role, content FROM messages \
             WHERE conversation_id = ? AND id < ? \
             ORDER BY id DESC LIMIT ? \
         ) ORDER BY id ASC",
    )
    .bind(conversation_id)
    .bind(before_id)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Update last-message bookkeeping; the title is written only while unset
pub async fn record_exchange(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    last_message: &str,
    title: &str,
) -> AppResult<()> {
    let now = Utc::now();
    sqlx::query(
        "UPDATE conversations \
         SET last_message = ?, last_message_at = ?, updated_at = ?, \
             title = COALESCE(title, ?) \
         WHERE id = ?",
    )
    .bind(last_message)
    .bind(now)
    .bind(now)
    .bind(title)
    .bind(conversation_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Title from a first user message: `max_chars` characters plus `...` when longer
pub fn derive_title(first_message: &str, max_chars: usize) -> String {
    let trimmed = first_message.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut title: String = trimmed.chars().take(max_chars).collect();
    title.push_str("...");
    title
}
