//! Per-request user synchronization
//!
//! Tokens come from an external issuer, so the local user table is a
//! projection of whoever has shown up with a valid token. Every
//! authenticated request upserts the caller's row and bumps their
//! last-seen timestamp.

use sqlx::SqlitePool;

use super::context::Principal;
use crate::data::sqlite::{SqliteError, users};

pub async fn synchronize_user(
    pool: &SqlitePool,
    principal: &Principal,
) -> Result<(), SqliteError> {
    users::upsert(
        pool,
        principal.user_id,
        principal.email.as_deref(),
        &principal.first_name,
        &principal.last_name,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;
    use uuid::Uuid;

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: Some("sync@chat.dev".to_string()),
            first_name: "Sync".to_string(),
            last_name: "Test".to_string(),
        }
    }

    #[tokio::test]
    async fn repeated_synchronization_is_idempotent() {
        let pool = test_pool().await;
        let p = principal();
        synchronize_user(&pool, &p).await.unwrap();
        synchronize_user(&pool, &p).await.unwrap();
        let row = users::find_by_id(&pool, p.user_id).await.unwrap().unwrap();
        assert_eq!(row.email.as_deref(), Some("sync@chat.dev"));
        let count = users::count_all(&pool).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn profile_changes_overwrite_the_row() {
        let pool = test_pool().await;
        let mut p = principal();
        synchronize_user(&pool, &p).await.unwrap();
        p.first_name = "Renamed".to_string();
        synchronize_user(&pool, &p).await.unwrap();
        let row = users::find_by_id(&pool, p.user_id).await.unwrap().unwrap();
        assert_eq!(row.first_name, "Renamed");
    }
}
