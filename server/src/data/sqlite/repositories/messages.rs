//! Message repository

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::data::sqlite::{SqliteError, parse_uuid};
use crate::data::types::{MessageKind, MessageRow, MessageState};
use crate::query::page::{PageDefaults, PageSpec};
use crate::query::predicate::{Predicate, SqlParams, order_by_sql};
use crate::query::schema::MESSAGES;

const MESSAGE_COLUMNS: &str = "m.id, m.chat_id, m.sender_id, m.receiver_id, m.content, \
     m.kind, m.state, m.media_path, m.created_at";
const MESSAGE_FROM: &str = "FROM messages m \
     JOIN chats c ON c.id = m.chat_id \
     JOIN users s ON s.id = c.sender_id \
     JOIN users r ON r.id = c.receiver_id";

type MessageTuple = (
    i64,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    i64,
);

fn map_message(
    (id, chat_id, sender_id, receiver_id, content, kind, state, media_path, created_at): MessageTuple,
) -> Result<MessageRow, SqliteError> {
    Ok(MessageRow {
        id,
        chat_id: parse_uuid(&chat_id)?,
        sender_id: parse_uuid(&sender_id)?,
        receiver_id: parse_uuid(&receiver_id)?,
        content,
        kind: MessageKind::parse(&kind)
            .ok_or_else(|| SqliteError::Decode(format!("unknown message kind `{kind}`")))?,
        state: MessageState::parse(&state)
            .ok_or_else(|| SqliteError::Decode(format!("unknown message state `{state}`")))?,
        media_path,
        created_at,
    })
}

/// Persist a new message in the Sent state
pub async fn create(
    pool: &SqlitePool,
    chat_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: Option<&str>,
    kind: MessageKind,
    media_path: Option<&str>,
) -> Result<MessageRow, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "INSERT INTO messages (chat_id, sender_id, receiver_id, content, kind, state, media_path, created_at)
         VALUES (?, ?, ?, ?, ?, 'SENT', ?, ?)",
    )
    .bind(chat_id.to_string())
    .bind(sender_id.to_string())
    .bind(receiver_id.to_string())
    .bind(content)
    .bind(kind.as_str())
    .bind(media_path)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(MessageRow {
        id: result.last_insert_rowid(),
        chat_id,
        sender_id,
        receiver_id,
        content: content.map(String::from),
        kind,
        state: MessageState::Sent,
        media_path: media_path.map(String::from),
        created_at: now,
    })
}

/// Paginated message history for one chat
pub async fn list_for_chat(
    pool: &SqlitePool,
    chat_id: Uuid,
    predicate: Option<&Predicate>,
    page: &PageSpec,
    defaults: &PageDefaults,
) -> Result<(Vec<MessageRow>, i64), SqliteError> {
    let mut params = SqlParams::default();
    let mut conditions = vec![format!("m.chat_id = {}", params.push(chat_id.to_string()))];
    if let Some(predicate) = predicate {
        conditions.push(predicate.to_sql(&mut params));
    }
    let where_sql = format!("WHERE {}", conditions.join(" AND "));

    let count_sql = format!("SELECT COUNT(*) {MESSAGE_FROM} {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &params.values {
        count_query = count_query.bind(value);
    }
    let total = count_query.fetch_one(pool).await?;

    let rows_sql = format!(
        "SELECT {MESSAGE_COLUMNS} {MESSAGE_FROM} {where_sql} {} LIMIT ? OFFSET ?",
        order_by_sql(&MESSAGES, page, defaults)
    );
    let mut rows_query = sqlx::query_as::<_, MessageTuple>(&rows_sql);
    for value in &params.values {
        rows_query = rows_query.bind(value);
    }
    let rows = rows_query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(map_message)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total))
}

/// Mark every Sent message addressed to `receiver_id` in the chat as Seen.
/// Returns the number of rows transitioned.
pub async fn mark_seen(
    pool: &SqlitePool,
    chat_id: Uuid,
    receiver_id: Uuid,
) -> Result<u64, SqliteError> {
    let result = sqlx::query(
        "UPDATE messages SET state = 'SEEN'
         WHERE chat_id = ? AND receiver_id = ? AND state = 'SENT'",
    )
    .bind(chat_id.to_string())
    .bind(receiver_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
