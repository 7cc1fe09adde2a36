//! Chat repository
//!
//! A chat is one row per user pair. Creation is idempotent: asking for a
//! chat that already exists in either orientation returns the existing row.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::data::sqlite::{SqliteError, parse_uuid};
use crate::data::types::{ChatRow, ChatSummary};
use crate::query::page::{PageDefaults, PageSpec};
use crate::query::predicate::{Predicate, SqlParams, order_by_sql};
use crate::query::schema::CHATS;

const CHAT_FROM: &str = "FROM chats c \
     JOIN users s ON s.id = c.sender_id \
     JOIN users r ON r.id = c.receiver_id";

type ChatTuple = (String, String, String, i64);
type SummaryTuple = (
    String,
    String,
    String,
    i64,
    String,
    i64,
    Option<String>,
    Option<i64>,
);

fn map_chat((id, sender_id, receiver_id, created_at): ChatTuple) -> Result<ChatRow, SqliteError> {
    Ok(ChatRow {
        id: parse_uuid(&id)?,
        sender_id: parse_uuid(&sender_id)?,
        receiver_id: parse_uuid(&receiver_id)?,
        created_at,
    })
}

fn map_summary(
    (id, sender_id, receiver_id, created_at, name, unread_count, last_message, last_message_at): SummaryTuple,
) -> Result<ChatSummary, SqliteError> {
    Ok(ChatSummary {
        id: parse_uuid(&id)?,
        sender_id: parse_uuid(&sender_id)?,
        receiver_id: parse_uuid(&receiver_id)?,
        created_at,
        name,
        unread_count,
        last_message,
        last_message_at,
    })
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<ChatRow>, SqliteError> {
    let row = sqlx::query_as::<_, ChatTuple>(
        "SELECT id, sender_id, receiver_id, created_at FROM chats WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.map(map_chat).transpose()
}

/// Find the chat between two users, in either orientation
pub async fn find_between(
    pool: &SqlitePool,
    a: Uuid,
    b: Uuid,
) -> Result<Option<ChatRow>, SqliteError> {
    let row = sqlx::query_as::<_, ChatTuple>(
        "SELECT id, sender_id, receiver_id, created_at FROM chats
         WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)",
    )
    .bind(a.to_string())
    .bind(b.to_string())
    .bind(b.to_string())
    .bind(a.to_string())
    .fetch_optional(pool)
    .await?;
    row.map(map_chat).transpose()
}

/// Return the existing chat between the pair or create a new one.
///
/// The boolean is true when a row was created. A concurrent create of the
/// reversed orientation can slip past the lookup; the unique constraint
/// only guards the exact orientation, so the loser re-reads.
pub async fn get_or_create(
    pool: &SqlitePool,
    sender_id: Uuid,
    receiver_id: Uuid,
) -> Result<(ChatRow, bool), SqliteError> {
    if let Some(existing) = find_between(pool, sender_id, receiver_id).await? {
        return Ok((existing, false));
    }

    let id = Uuid::new_v4();
    let now = chrono::Utc::now().timestamp();
    let inserted = sqlx::query(
        "INSERT INTO chats (id, sender_id, receiver_id, created_at)
         SELECT ?, ?, ?, ?
         WHERE NOT EXISTS (
             SELECT 1 FROM chats
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
         )",
    )
    .bind(id.to_string())
    .bind(sender_id.to_string())
    .bind(receiver_id.to_string())
    .bind(now)
    .bind(sender_id.to_string())
    .bind(receiver_id.to_string())
    .bind(receiver_id.to_string())
    .bind(sender_id.to_string())
    .execute(pool)
    .await?;

    if inserted.rows_affected() == 0 {
        let existing = find_between(pool, sender_id, receiver_id)
            .await?
            .ok_or_else(|| SqliteError::Decode("chat vanished during creation".to_string()))?;
        return Ok((existing, false));
    }

    Ok((
        ChatRow {
            id,
            sender_id,
            receiver_id,
            created_at: now,
        },
        true,
    ))
}

/// List the caller's chats with caller-relative name, unread count and
/// last-message preview
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    predicate: Option<&Predicate>,
    page: &PageSpec,
    defaults: &PageDefaults,
) -> Result<(Vec<ChatSummary>, i64), SqliteError> {
    let mut params = SqlParams::default();
    let mut conditions = vec![format!(
        "(c.sender_id = {} OR c.receiver_id = {})",
        params.push(user_id.to_string()),
        params.push(user_id.to_string())
    )];
    if let Some(predicate) = predicate {
        conditions.push(predicate.to_sql(&mut params));
    }
    let where_sql = format!("WHERE {}", conditions.join(" AND "));

    let count_sql = format!("SELECT COUNT(*) {CHAT_FROM} {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &params.values {
        count_query = count_query.bind(value);
    }
    let total = count_query.fetch_one(pool).await?;

    let rows_sql = format!(
        "SELECT c.id, c.sender_id, c.receiver_id, c.created_at,
                CASE WHEN c.sender_id = ? THEN TRIM(r.first_name || ' ' || r.last_name)
                     ELSE TRIM(s.first_name || ' ' || s.last_name) END,
                (SELECT COUNT(*) FROM messages mu
                  WHERE mu.chat_id = c.id AND mu.receiver_id = ? AND mu.state = 'SENT'),
                (SELECT CASE WHEN ml.kind = 'TEXT' THEN ml.content ELSE 'Attachment' END
                   FROM messages ml WHERE ml.chat_id = c.id
                  ORDER BY ml.created_at DESC, ml.id DESC LIMIT 1),
                (SELECT ml.created_at FROM messages ml WHERE ml.chat_id = c.id
                  ORDER BY ml.created_at DESC, ml.id DESC LIMIT 1)
         {CHAT_FROM} {where_sql} {} LIMIT ? OFFSET ?",
        order_by_sql(&CHATS, page, defaults)
    );
    let mut rows_query = sqlx::query_as::<_, SummaryTuple>(&rows_sql)
        .bind(user_id.to_string())
        .bind(user_id.to_string());
    for value in &params.values {
        rows_query = rows_query.bind(value);
    }
    let rows = rows_query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(map_summary)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::{messages, users};
    use crate::data::sqlite::test_pool;
    use crate::data::types::MessageKind;

    async fn seed_user(pool: &SqlitePool, first: &str, last: &str) -> Uuid {
        let id = Uuid::new_v4();
        users::upsert(pool, id, None, first, last).await.unwrap();
        id
    }

    #[tokio::test]
    async fn creation_is_idempotent_across_orientations() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "Alice", "A").await;
        let bob = seed_user(&pool, "Bob", "B").await;

        let (chat, created) = get_or_create(&pool, alice, bob).await.unwrap();
        assert!(created);
        let (again, created) = get_or_create(&pool, alice, bob).await.unwrap();
        assert!(!created);
        assert_eq!(chat.id, again.id);
        let (reversed, created) = get_or_create(&pool, bob, alice).await.unwrap();
        assert!(!created);
        assert_eq!(chat.id, reversed.id);
    }

    #[tokio::test]
    async fn list_shows_counterparty_name_and_unread_count() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "Alice", "Archer").await;
        let bob = seed_user(&pool, "Bob", "Baker").await;
        let (chat, _) = get_or_create(&pool, alice, bob).await.unwrap();

        messages::create(&pool, chat.id, alice, bob, Some("hi"), MessageKind::Text, None)
            .await
            .unwrap();
        messages::create(&pool, chat.id, alice, bob, Some("there"), MessageKind::Text, None)
            .await
            .unwrap();

        let (rows, total) = list_for_user(
            &pool,
            bob,
            None,
            &PageSpec::default(),
            &PageDefaults::ID_ASC,
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].name, "Alice Archer");
        assert_eq!(rows[0].unread_count, 2);
        assert_eq!(rows[0].last_message.as_deref(), Some("there"));

        // The sender has nothing unread and sees the other side's name.
        let (rows, _) = list_for_user(
            &pool,
            alice,
            None,
            &PageSpec::default(),
            &PageDefaults::ID_ASC,
        )
        .await
        .unwrap();
        assert_eq!(rows[0].name, "Bob Baker");
        assert_eq!(rows[0].unread_count, 0);
    }

    #[tokio::test]
    async fn non_text_preview_reads_attachment() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "Alice", "A").await;
        let bob = seed_user(&pool, "Bob", "B").await;
        let (chat, _) = get_or_create(&pool, alice, bob).await.unwrap();

        messages::create(
            &pool,
            chat.id,
            alice,
            bob,
            None,
            MessageKind::Image,
            Some("user/x/y.png"),
        )
        .await
        .unwrap();

        let (rows, _) = list_for_user(
            &pool,
            bob,
            None,
            &PageSpec::default(),
            &PageDefaults::ID_ASC,
        )
        .await
        .unwrap();
        assert_eq!(rows[0].last_message.as_deref(), Some("Attachment"));
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_caller() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "Alice", "A").await;
        let bob = seed_user(&pool, "Bob", "B").await;
        let carol = seed_user(&pool, "Carol", "C").await;
        get_or_create(&pool, alice, bob).await.unwrap();
        get_or_create(&pool, bob, carol).await.unwrap();

        let (rows, total) = list_for_user(
            &pool,
            alice,
            None,
            &PageSpec::default(),
            &PageDefaults::ID_ASC,
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows.len(), 1);

        let (_, total) = list_for_user(
            &pool,
            bob,
            None,
            &PageSpec::default(),
            &PageDefaults::ID_ASC,
        )
        .await
        .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn nested_filter_on_counterparty_email() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "Alice", "A").await;
        let bob = Uuid::new_v4();
        users::upsert(&pool, bob, Some("bob@chat.dev"), "Bob", "B")
            .await
            .unwrap();
        let carol = Uuid::new_v4();
        users::upsert(&pool, carol, Some("carol@chat.dev"), "Carol", "C")
            .await
            .unwrap();
        get_or_create(&pool, alice, bob).await.unwrap();
        get_or_create(&pool, alice, carol).await.unwrap();

        let criteria = crate::query::parse_filters(&[(
            "filter.receiver.email:like".to_string(),
            "bob".to_string(),
        )]);
        let predicate = crate::query::predicate::build_predicate(&CHATS, &criteria).unwrap();

        let (rows, total) = list_for_user(
            &pool,
            alice,
            predicate.as_ref(),
            &PageSpec::default(),
            &PageDefaults::ID_ASC,
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].receiver_id, bob);
    }
}
