//! Chat API endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::Principal;
use crate::api::bind::{BindTarget, Bound, FieldDescriptor};
use crate::api::types::{ApiError, PaginatedResponse};
use crate::bind_fields;
use crate::data::sqlite::{SqlitePool, chats, users};
use crate::data::types::ChatSummary;
use crate::query::page::SortDirection;
use crate::query::schema::CHATS;
use crate::query::{FilterCriterion, PageDefaults, PageSpec, build_predicate};

/// Newest chats first unless the request names a sort
const CHAT_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    sort_field: "created_at",
    direction: SortDirection::Desc,
};

/// Shared state for Chats API endpoints
#[derive(Clone)]
pub struct ChatsApiState {
    pub pool: SqlitePool,
}

/// Build Chats API routes
pub fn routes(pool: SqlitePool) -> Router<()> {
    let state = ChatsApiState { pool };

    Router::new()
        .route("/", get(list_chats).post(create_chat))
        .with_state(state)
}

/// Bound request covering chat creation and listing
#[derive(Debug, Default)]
pub struct ChatRequest {
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub page: PageSpec,
    pub filters: Vec<FilterCriterion>,
    pub caller: Option<Uuid>,
}

impl BindTarget for ChatRequest {
    const FIELDS: &'static [FieldDescriptor<Self>] = bind_fields!(ChatRequest {
        "sender_id" => sender_id: Option<Uuid>,
        "receiver_id" => receiver_id: Option<Uuid>,
    });

    fn page_defaults() -> PageDefaults {
        CHAT_PAGE_DEFAULTS
    }

    fn apply_page(&mut self, page: PageSpec) {
        self.page = page;
    }

    fn apply_filters(&mut self, filters: Vec<FilterCriterion>) {
        self.filters = filters;
    }

    fn apply_principal(&mut self, principal: &Principal) {
        self.caller = Some(principal.user_id);
    }
}

impl ChatRequest {
    fn caller(&self) -> Result<Uuid, ApiError> {
        self.caller
            .ok_or_else(|| ApiError::unauthorized("AUTH_REQUIRED", "Authentication required"))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub created_at: i64,
    /// Counterparty's name as seen by the caller
    pub name: String,
    pub unread_count: i64,
    pub last_message: Option<String>,
    pub last_message_at: Option<i64>,
}

impl From<ChatSummary> for ChatDto {
    fn from(row: ChatSummary) -> Self {
        Self {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            created_at: row.created_at,
            name: row.name,
            unread_count: row.unread_count,
            last_message: row.last_message,
            last_message_at: row.last_message_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatIdResponse {
    pub id: Uuid,
}

/// Create a chat between two users, or return the existing one.
///
/// A chat between the same pair in either orientation is the same chat.
#[utoipa::path(
    post,
    path = "/api/v1/chats",
    tag = "chats",
    params(
        ("sender_id" = Option<Uuid>, Query, description = "Chat initiator; defaults to the caller"),
        ("receiver_id" = Uuid, Query, description = "Chat counterparty")
    ),
    responses(
        (status = 201, description = "Chat created", body = ChatIdResponse),
        (status = 200, description = "Chat already existed", body = ChatIdResponse),
        (status = 404, description = "Unknown user id")
    )
)]
pub async fn create_chat(
    State(state): State<ChatsApiState>,
    Bound(request): Bound<ChatRequest>,
) -> Result<(StatusCode, Json<ChatIdResponse>), ApiError> {
    let caller = request.caller()?;
    let sender_id = request.sender_id.unwrap_or(caller);
    let receiver_id = request.receiver_id.ok_or_else(|| {
        ApiError::bad_request("RECEIVER_REQUIRED", "receiver_id is required")
    })?;

    for id in [sender_id, receiver_id] {
        if users::find_by_id(&state.pool, id)
            .await
            .map_err(ApiError::from_sqlite)?
            .is_none()
        {
            return Err(ApiError::not_found(
                "USER_NOT_FOUND",
                format!("No user with id {id}"),
            ));
        }
    }

    let (chat, created) = chats::get_or_create(&state.pool, sender_id, receiver_id)
        .await
        .map_err(ApiError::from_sqlite)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ChatIdResponse { id: chat.id })))
}

/// List the caller's chats with unread counts and last-message previews
#[utoipa::path(
    get,
    path = "/api/v1/chats",
    tag = "chats",
    responses(
        (status = 200, description = "Paginated chats", body = [ChatDto])
    )
)]
pub async fn list_chats(
    State(state): State<ChatsApiState>,
    Bound(request): Bound<ChatRequest>,
) -> Result<Json<PaginatedResponse<ChatDto>>, ApiError> {
    let caller = request.caller()?;

    let predicate = build_predicate(&CHATS, &request.filters).map_err(ApiError::from_query)?;
    let (rows, total) = chats::list_for_user(
        &state.pool,
        caller,
        predicate.as_ref(),
        &request.page,
        &CHAT_PAGE_DEFAULTS,
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    let data = rows.into_iter().map(ChatDto::from).collect();
    Ok(Json(PaginatedResponse::new(data, &request.page, total)))
}
