//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sqlx::SqlitePool;

use super::context::Principal;
use super::jwt::JwtError;
use super::manager::AuthManager;
use super::sync::synchronize_user;

/// Authentication error response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn required() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "AUTH_REQUIRED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn expired() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_EXPIRED",
            message: "Access token has expired".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_INVALID",
            message: "Invalid access token".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub auth_manager: Arc<AuthManager>,
    pub pool: SqlitePool,
}

/// Bearer-token authentication middleware.
///
/// Validates the `Authorization: Bearer` token, upserts the caller's user
/// row from its claims, and stores the [`Principal`] in request extensions
/// for the binding layer.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&request).ok_or_else(AuthError::required)?;

    let claims = state.auth_manager.validate(token).map_err(|e| match e {
        JwtError::Expired => AuthError::expired(),
        JwtError::InvalidSignature | JwtError::Invalid(_) => AuthError::invalid(),
    })?;

    let principal = Principal::from_claims(&claims).ok_or_else(AuthError::invalid)?;

    if let Err(err) = synchronize_user(&state.pool, &principal).await {
        // The request can proceed on a stale profile; the next one retries.
        tracing::warn!(user_id = %principal.user_id, %err, "user synchronization failed");
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn extracts_bearer_token() {
        let req = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_non_bearer_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(&request_with_auth("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&request_with_auth("Bearer ")), None);
        let no_header = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&no_header), None);
    }
}
