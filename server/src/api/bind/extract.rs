//! Axum extractor feeding [`bind`] from the live request

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request};
use axum::http::header::CONTENT_TYPE;
use tracing::warn;

use crate::api::auth::context::Principal;
use crate::api::bind::{BindSources, BindTarget, bind};

/// Extractor wrapper: `Bound<T>` gathers every input channel and binds `T`.
///
/// Extraction never rejects. Unreadable or non-JSON bodies and malformed
/// query strings degrade to empty channels with a warning, mirroring the
/// skip-and-continue behavior of the binder itself.
#[derive(Debug)]
pub struct Bound<T>(pub T);

impl<S, T> FromRequest<S> for Bound<T>
where
    S: Send + Sync,
    T: BindTarget,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path = match RawPathParams::from_request_parts(&mut parts, state).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => Vec::new(),
        };

        let query = match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
            Ok(Query(pairs)) => pairs,
            Err(err) => {
                warn!(%err, "unparseable query string, binding without it");
                Vec::new()
            }
        };

        let principal = parts.extensions.get::<Principal>().cloned();

        let body = read_json_body(Request::from_parts(parts, body), state).await;

        Ok(Self(bind(BindSources {
            body,
            path,
            query,
            principal,
        })))
    }
}

async fn read_json_body<S: Send + Sync>(req: Request, state: &S) -> Option<serde_json::Value> {
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return None;
    }
    let bytes = match Bytes::from_request(req, state).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "unreadable request body, binding without it");
            return None;
        }
    };
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%err, "request body is not valid JSON, binding without it");
            None
        }
    }
}
