//! Shared API types
//!
//! Error responses and the paginated envelope used by every list endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::files::FileError;
use crate::data::sqlite::SqliteError;
use crate::query::{PageSpec, QueryError};

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_sqlite(e: SqliteError) -> Self {
        tracing::error!(error = %e, "SQLite error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }

    pub fn from_files(e: FileError) -> Self {
        match e {
            FileError::NotFound(path) => {
                Self::not_found("MEDIA_NOT_FOUND", format!("No media at '{path}'"))
            }
            other => {
                tracing::error!(error = %other, "file storage error");
                Self::Internal {
                    message: "Media storage operation failed".to_string(),
                }
            }
        }
    }

    /// Fatal predicate construction errors surface as 400 naming the
    /// offending field or operator.
    pub fn from_query(e: QueryError) -> Self {
        let code = match &e {
            QueryError::UnknownField { .. } => "UNKNOWN_FILTER_FIELD",
            QueryError::Conversion { .. } => "INVALID_FILTER_VALUE",
            QueryError::BetweenArity { .. } => "INVALID_FILTER_RANGE",
            QueryError::NotComparable { .. } => "INVALID_FILTER_OPERATOR",
        };
        Self::bad_request(code, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message)
            }
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Pagination metadata in response
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u32, size: u32, total_items: u64) -> Self {
        Self {
            page,
            size,
            total_items,
            total_pages: total_items.div_ceil(u64::from(size.max(1))),
        }
    }
}

/// Generic paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: &PageSpec, total_items: i64) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(page.page, page.size, total_items.max(0) as u64),
        }
    }
}
