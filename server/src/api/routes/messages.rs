//! Message API endpoints
//!
//! Sending, history, seen-state transitions and media upload. Every write
//! pushes a notification to the counterparty's channel.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::Principal;
use crate::api::bind::{BindTarget, Bound, FieldDescriptor};
use crate::api::extractors::ValidatedQuery;
use crate::api::types::{ApiError, PaginatedResponse};
use crate::bind_fields;
use crate::core::constants::MEDIA_MAX_BYTES;
use crate::data::files::FileService;
use crate::data::push::PushService;
use crate::data::sqlite::{SqlitePool, chats, messages, users};
use crate::data::types::{
    ChatRow, MessageKind, MessageRow, MessageState, Notification, NotificationKind,
};
use crate::query::page::SortDirection;
use crate::query::schema::MESSAGES;
use crate::query::{FilterCriterion, PageDefaults, PageSpec, build_predicate};

/// Newest messages first unless the request names a sort
const MESSAGE_PAGE_DEFAULTS: PageDefaults = PageDefaults {
    sort_field: "created_at",
    direction: SortDirection::Desc,
};

/// Shared state for Messages API endpoints
#[derive(Clone)]
pub struct MessagesApiState {
    pub pool: SqlitePool,
    pub push: Arc<PushService>,
    pub files: FileService,
}

/// Build Messages API routes
pub fn routes(pool: SqlitePool, push: Arc<PushService>, files: FileService) -> Router<()> {
    let state = MessagesApiState { pool, push, files };

    Router::new()
        .route("/", post(send_message).patch(mark_seen))
        .route("/chats/{chat_id}", get(list_messages))
        .route("/upload-media", post(upload_media))
        .with_state(state)
}

/// Bound request covering message sending and history
#[derive(Debug, Default)]
pub struct MessageRequest {
    pub chat_id: Option<Uuid>,
    pub content: Option<String>,
    pub kind: Option<String>,
    pub page: PageSpec,
    pub filters: Vec<FilterCriterion>,
    pub caller: Option<Uuid>,
}

impl BindTarget for MessageRequest {
    const FIELDS: &'static [FieldDescriptor<Self>] = bind_fields!(MessageRequest {
        "chat_id" => chat_id: Option<Uuid>,
        "content" => content: Option<String>,
        "kind" => kind: Option<String>,
    });

    fn page_defaults() -> PageDefaults {
        MESSAGE_PAGE_DEFAULTS
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

impl MessageRequest {
    fn caller(&self) -> Result<Uuid, ApiError> {
        self.caller
            .ok_or_else(|| ApiError::unauthorized("AUTH_REQUIRED", "Authentication required"))
    }

    fn chat_id(&self) -> Result<Uuid, ApiError> {
        self.chat_id
            .ok_or_else(|| ApiError::bad_request("CHAT_REQUIRED", "chat_id is required"))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageDto {
    pub id: i64,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: Option<String>,
    pub kind: MessageKind,
    pub state: MessageState,
    pub created_at: i64,
    /// Base64 media bytes for non-text messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl MessageDto {
    fn from_row(row: MessageRow, media: Option<String>) -> Self {
        Self {
            id: row.id,
            chat_id: row.chat_id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            kind: row.kind,
            state: row.state,
            created_at: row.created_at,
            media,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeenResponse {
    pub updated: u64,
}

/// Resolve the chat, confirm membership and return the counterparty
async fn chat_counterparty(
    pool: &SqlitePool,
    chat_id: Uuid,
    caller: Uuid,
) -> Result<(ChatRow, Uuid), ApiError> {
    let chat = chats::find_by_id(pool, chat_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("CHAT_NOT_FOUND", "Chat not found"))?;

    let counterparty = if chat.sender_id == caller {
        chat.receiver_id
    } else if chat.receiver_id == caller {
        chat.sender_id
    } else {
        return Err(ApiError::forbidden(
            "NOT_A_MEMBER",
            "Caller is not a member of this chat",
        ));
    };
    Ok((chat, counterparty))
}

async fn sender_name(pool: &SqlitePool, sender_id: Uuid) -> Option<String> {
    match users::find_by_id(pool, sender_id).await {
        Ok(user) => user.map(|u| u.full_name()),
        Err(err) => {
            tracing::warn!(%sender_id, %err, "sender lookup for notification failed");
            None
        }
    }
}

/// Send a text message into a chat
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "messages",
    responses(
        (status = 201, description = "Message persisted", body = MessageDto),
        (status = 403, description = "Caller is not a chat member"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn send_message(
    State(state): State<MessagesApiState>,
    Bound(request): Bound<MessageRequest>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let caller = request.caller()?;
    let chat_id = request.chat_id()?;
    let (_, receiver_id) = chat_counterparty(&state.pool, chat_id, caller).await?;

    let content = request
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("CONTENT_REQUIRED", "content is required"))?;

    let kind = request
        .kind
        .as_deref()
        .map(|raw| {
            MessageKind::parse(raw).ok_or_else(|| {
                ApiError::bad_request("INVALID_KIND", format!("Unknown message kind '{raw}'"))
            })
        })
        .transpose()?
        .unwrap_or(MessageKind::Text);

    let row = messages::create(
        &state.pool,
        chat_id,
        caller,
        receiver_id,
        Some(content),
        kind,
        None,
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    state.push.send(
        receiver_id,
        Notification {
            kind: NotificationKind::NewMessage,
            chat_id,
            sender_id: caller,
            receiver_id,
            chat_name: sender_name(&state.pool, caller).await,
            content: Some(content.to_string()),
            message_kind: Some(kind),
            media: None,
        },
    );

    Ok((StatusCode::CREATED, Json(MessageDto::from_row(row, None))))
}

/// Paginated message history for a chat, newest first by default
#[utoipa::path(
    get,
    path = "/api/v1/messages/chats/{chat_id}",
    tag = "messages",
    params(("chat_id" = Uuid, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Paginated messages", body = [MessageDto]),
        (status = 403, description = "Caller is not a chat member"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn list_messages(
    State(state): State<MessagesApiState>,
    Bound(request): Bound<MessageRequest>,
) -> Result<Json<PaginatedResponse<MessageDto>>, ApiError> {
    let caller = request.caller()?;
    let chat_id = request.chat_id()?;
    chat_counterparty(&state.pool, chat_id, caller).await?;

    let predicate = build_predicate(&MESSAGES, &request.filters).map_err(ApiError::from_query)?;
    let (rows, total) = messages::list_for_chat(
        &state.pool,
        chat_id,
        predicate.as_ref(),
        &request.page,
        &MESSAGE_PAGE_DEFAULTS,
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        let media = load_media(&state.files, &row).await;
        data.push(MessageDto::from_row(row, media));
    }
    Ok(Json(PaginatedResponse::new(data, &request.page, total)))
}

/// Media bytes travel inline; a missing file degrades to a text-only row
async fn load_media(files: &FileService, row: &MessageRow) -> Option<String> {
    let path = row.media_path.as_deref()?;
    match files.read(path).await {
        Ok(bytes) => Some(BASE64.encode(bytes)),
        Err(err) => {
            tracing::warn!(message_id = row.id, %err, "media read failed");
            None
        }
    }
}

/// Mark every message addressed to the caller in a chat as seen
#[utoipa::path(
    patch,
    path = "/api/v1/messages",
    tag = "messages",
    params(("chat_id" = Uuid, Query, description = "Chat id")),
    responses(
        (status = 200, description = "Messages transitioned", body = SeenResponse),
        (status = 403, description = "Caller is not a chat member"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn mark_seen(
    State(state): State<MessagesApiState>,
    Bound(request): Bound<MessageRequest>,
) -> Result<Json<SeenResponse>, ApiError> {
    let caller = request.caller()?;
    let chat_id = request.chat_id()?;
    let (_, counterparty) = chat_counterparty(&state.pool, chat_id, caller).await?;

    let updated = messages::mark_seen(&state.pool, chat_id, caller)
        .await
        .map_err(ApiError::from_sqlite)?;

    state.push.send(
        counterparty,
        Notification {
            kind: NotificationKind::Seen,
            chat_id,
            sender_id: caller,
            receiver_id: counterparty,
            chat_name: None,
            content: None,
            message_kind: None,
            media: None,
        },
    );

    Ok(Json(SeenResponse { updated }))
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct MediaQuery {
    pub chat_id: Uuid,
}

/// Upload a media file into a chat as an image message
#[utoipa::path(
    post,
    path = "/api/v1/messages/upload-media",
    tag = "messages",
    params(("chat_id" = Uuid, Query, description = "Chat id")),
    responses(
        (status = 201, description = "Media message persisted", body = MessageDto),
        (status = 400, description = "No file, oversized, or not an image"),
        (status = 403, description = "Caller is not a chat member"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn upload_media(
    State(state): State<MessagesApiState>,
    Extension(principal): Extension<Principal>,
    ValidatedQuery(query): ValidatedQuery<MediaQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let caller = principal.user_id;
    let (_, receiver_id) = chat_counterparty(&state.pool, query.chat_id, caller).await?;

    let field = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request("MEDIA_UNREADABLE", err.to_string()))?
        .ok_or_else(|| ApiError::bad_request("MEDIA_REQUIRED", "multipart file is required"))?;

    let file_name = field.file_name().map(str::to_string).unwrap_or_default();
    let bytes = field
        .bytes()
        .await
        .map_err(|err| ApiError::bad_request("MEDIA_UNREADABLE", err.to_string()))?;

    if bytes.is_empty() {
        return Err(ApiError::bad_request("MEDIA_REQUIRED", "file is empty"));
    }
    if bytes.len() > MEDIA_MAX_BYTES {
        return Err(ApiError::bad_request(
            "MEDIA_TOO_LARGE",
            format!("file exceeds {} bytes", MEDIA_MAX_BYTES),
        ));
    }
    if let Some(mime) = mime_guess::from_path(&file_name).first()
        && mime.type_() != mime_guess::mime::IMAGE
    {
        return Err(ApiError::bad_request(
            "MEDIA_NOT_IMAGE",
            format!("'{file_name}' is not an image"),
        ));
    }

    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext);
    let media_path = state
        .files
        .save(&bytes, extension, caller)
        .await
        .map_err(ApiError::from_files)?;

    let row = messages::create(
        &state.pool,
        query.chat_id,
        caller,
        receiver_id,
        None,
        MessageKind::Image,
        Some(&media_path),
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    let encoded = BASE64.encode(&bytes);
    state.push.send(
        receiver_id,
        Notification {
            kind: NotificationKind::NewImage,
            chat_id: query.chat_id,
            sender_id: caller,
            receiver_id,
            chat_name: sender_name(&state.pool, caller).await,
            content: None,
            message_kind: Some(MessageKind::Image),
            media: Some(encoded.clone()),
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageDto::from_row(row, Some(encoded))),
    ))
}
