//! User API endpoints
//!
//! Users are provisioned by the auth middleware from token claims; these
//! endpoints only read.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::bind::{BindTarget, Bound, FieldDescriptor};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::data::sqlite::{SqlitePool, users};
use crate::data::types::UserRow;
use crate::query::schema::USERS;
use crate::query::{FilterCriterion, PageDefaults, PageSpec, build_predicate};

/// Shared state for Users API endpoints
#[derive(Clone)]
pub struct UsersApiState {
    pub pool: SqlitePool,
}

/// Build Users API routes
pub fn routes(pool: SqlitePool) -> Router<()> {
    let state = UsersApiState { pool };

    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user))
        .with_state(state)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub last_seen_at: i64,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        let full_name = row.full_name();
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            full_name,
            last_seen_at: row.last_seen_at,
        }
    }
}

/// Bound request for user listing: pagination, filters, caller
#[derive(Debug, Default)]
pub struct UserRequest {
    pub page: PageSpec,
    pub filters: Vec<FilterCriterion>,
    pub caller: Option<Uuid>,
}

impl BindTarget for UserRequest {
    const FIELDS: &'static [FieldDescriptor<Self>] = &[];

    fn apply_page(&mut self, page: PageSpec) {
        self.page = page;
    }

    fn apply_filters(&mut self, filters: Vec<FilterCriterion>) {
        self.filters = filters;
    }

    fn apply_principal(&mut self, principal: &crate::api::auth::Principal) {
        self.caller = Some(principal.user_id);
    }
}

/// List every user except the caller
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Paginated users", body = [UserDto])
    )
)]
pub async fn list_users(
    State(state): State<UsersApiState>,
    Bound(request): Bound<UserRequest>,
) -> Result<Json<PaginatedResponse<UserDto>>, ApiError> {
    let caller = request
        .caller
        .ok_or_else(|| ApiError::unauthorized("AUTH_REQUIRED", "Authentication required"))?;

    let predicate = build_predicate(&USERS, &request.filters).map_err(ApiError::from_query)?;
    let (rows, total) = users::list(
        &state.pool,
        caller,
        predicate.as_ref(),
        &request.page,
        &PageDefaults::ID_ASC,
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    let data = rows.into_iter().map(UserDto::from).collect();
    Ok(Json(PaginatedResponse::new(data, &request.page, total)))
}

/// Get one user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<UsersApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    let user = users::find_by_id(&state.pool, id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;
    Ok(Json(UserDto::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::test_pool;

    async fn seed(pool: &SqlitePool, first: &str) -> Uuid {
        let id = Uuid::new_v4();
        users::upsert(pool, id, None, first, "Tester").await.unwrap();
        id
    }

    #[tokio::test]
    async fn listing_excludes_the_caller() {
        let pool = test_pool().await;
        let caller = seed(&pool, "Caller").await;
        seed(&pool, "Other").await;
        let state = UsersApiState { pool };

        let Json(listed) = list_users(
            State(state),
            Bound(UserRequest {
                caller: Some(caller),
                ..UserRequest::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(listed.meta.total_items, 1);
        assert!(listed.data.iter().all(|u| u.id != caller));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let pool = test_pool().await;
        let state = UsersApiState { pool };

        let err = get_user(State(state), Path(Uuid::new_v4()))
            .await
            .err()
            .expect("missing user should 404");
        assert!(matches!(err, ApiError::NotFound { .. }));
    }
}
