//! User repository

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::data::sqlite::{SqliteError, parse_uuid};
use crate::data::types::UserRow;
use crate::query::page::{PageDefaults, PageSpec};
use crate::query::predicate::{Predicate, SqlParams, order_by_sql};
use crate::query::schema::USERS;

const USER_COLUMNS: &str = "u.id, u.email, u.first_name, u.last_name, u.created_at, u.last_seen_at";
const USER_FROM: &str = "FROM users u";

type UserTuple = (String, Option<String>, String, String, i64, i64);

fn map_user(
    (id, email, first_name, last_name, created_at, last_seen_at): UserTuple,
) -> Result<UserRow, SqliteError> {
    Ok(UserRow {
        id: parse_uuid(&id)?,
        email,
        first_name,
        last_name,
        created_at,
        last_seen_at,
    })
}

/// Insert or refresh a user row from validated token claims
pub async fn upsert(
    pool: &SqlitePool,
    id: Uuid,
    email: Option<&str>,
    first_name: &str,
    last_name: &str,
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO users (id, email, first_name, last_name, created_at, last_seen_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             email = excluded.email,
             first_name = excluded.first_name,
             last_name = excluded.last_name,
             last_seen_at = excluded.last_seen_at",
    )
    .bind(id.to_string())
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<UserRow>, SqliteError> {
    let row = sqlx::query_as::<_, UserTuple>(&format!(
        "SELECT {USER_COLUMNS} {USER_FROM} WHERE u.id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.map(map_user).transpose()
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64, SqliteError> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?)
}

/// List every user except `exclude`, filtered and paged
pub async fn list(
    pool: &SqlitePool,
    exclude: Uuid,
    predicate: Option<&Predicate>,
    page: &PageSpec,
    defaults: &PageDefaults,
) -> Result<(Vec<UserRow>, i64), SqliteError> {
    let mut params = SqlParams::default();
    let mut conditions = vec![format!("u.id != {}", params.push(exclude.to_string()))];
    if let Some(predicate) = predicate {
        conditions.push(predicate.to_sql(&mut params));
    }
    let where_sql = format!("WHERE {}", conditions.join(" AND "));

    let count_sql = format!("SELECT COUNT(*) {USER_FROM} {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for value in &params.values {
        count_query = count_query.bind(value);
    }
    let total = count_query.fetch_one(pool).await?;

    let rows_sql = format!(
        "SELECT {USER_COLUMNS} {USER_FROM} {where_sql} {} LIMIT ? OFFSET ?",
        order_by_sql(&USERS, page, defaults)
    );
    let mut rows_query = sqlx::query_as::<_, UserTuple>(&rows_sql);
    for value in &params.values {
        rows_query = rows_query.bind(value);
    }
    let rows = rows_query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(map_user)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total))
}
