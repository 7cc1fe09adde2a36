//! SSE endpoint for real-time push notifications
//!
//! Each connection subscribes to the caller's broadcast channel. Slow
//! consumers lag and drop rather than backpressure senders.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Extension, Router};
use futures::stream::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

use crate::api::auth::Principal;
use crate::core::constants::SSE_KEEPALIVE_SECS;
use crate::data::push::PushService;

/// Shared state for the notifications stream
#[derive(Clone)]
pub struct NotificationsApiState {
    pub push: Arc<PushService>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Build Notifications API routes
pub fn routes(push: Arc<PushService>, shutdown_rx: watch::Receiver<bool>) -> Router<()> {
    let state = NotificationsApiState { push, shutdown_rx };

    Router::new().route("/sse", get(sse)).with_state(state)
}

/// Stream the caller's push notifications as server-sent events
#[utoipa::path(
    get,
    path = "/api/v1/notifications/sse",
    tag = "notifications",
    responses(
        (status = 200, description = "SSE stream of notification events")
    )
)]
pub async fn sse(
    State(state): State<NotificationsApiState>,
    Extension(principal): Extension<Principal>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = principal.user_id;
    let mut receiver = state.push.subscribe(user_id);
    let mut shutdown_rx = state.shutdown_rx.clone();

    tracing::debug!(%user_id, "notification stream opened");

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                biased;
                // Check for shutdown signal first
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        // Notify client before closing so it can reconnect immediately
                        yield Ok(Event::default().event("terminate").data("shutdown"));
                        break;
                    }
                }
                result = receiver.recv() => {
                    match result {
                        Ok(notification) => {
                            match serde_json::to_string(&notification) {
                                Ok(data) => {
                                    yield Ok(Event::default()
                                        .event("notification")
                                        .data(data));
                                }
                                Err(e) => {
                                    tracing::error!(error = %e, "failed to serialize notification");
                                }
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(%user_id, lagged = n, "notification subscriber lagged behind");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
        tracing::debug!(%user_id, "notification stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}
