//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;

use super::auth::{AuthManager, AuthState, require_auth};
use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::{chats, health, messages, notifications, users};
use crate::app::CoreApp;
use crate::core::constants::{MAX_JSON_BODY_BYTES, MEDIA_MAX_BYTES};

pub struct ApiServer {
    app: CoreApp,
    auth_manager: Arc<AuthManager>,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let auth_manager = app.auth.clone();
        let allowed_origins = AllowedOrigins::new(
            &app.config.server.host,
            app.config.server.port,
            &app.config.cors_origins,
        );

        Self {
            app,
            auth_manager,
            allowed_origins,
        }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            auth_manager,
            allowed_origins,
        } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let pool = app.database.pool().clone();
        let auth_state = AuthState {
            auth_manager,
            pool: pool.clone(),
        };

        let chats_routes = chats::routes(pool.clone()).layer(
            axum::middleware::from_fn_with_state(auth_state.clone(), require_auth),
        );

        let messages_routes =
            messages::routes(pool.clone(), app.push.clone(), app.files.clone())
                // Multipart uploads need headroom beyond the JSON limit
                .layer(DefaultBodyLimit::max(MEDIA_MAX_BYTES + 64 * 1024))
                .layer(axum::middleware::from_fn_with_state(
                    auth_state.clone(),
                    require_auth,
                ));

        let users_routes = users::routes(pool.clone()).layer(
            axum::middleware::from_fn_with_state(auth_state.clone(), require_auth),
        );

        let notifications_routes =
            notifications::routes(app.push.clone(), shutdown.subscribe()).layer(
                axum::middleware::from_fn_with_state(auth_state, require_auth),
            );

        let router = Router::new()
            .route("/api/v1/health", get(health::health).with_state(pool.clone()))
            .route("/api/openapi.json", get(openapi_json))
            .route("/api/docs", get(swagger_ui_html))
            .route("/api/docs/", get(swagger_ui_html))
            .nest("/api/v1/chats", chats_routes)
            .nest("/api/v1/messages", messages_routes)
            .nest("/api/v1/users", users_routes)
            .nest("/api/v1/notifications", notifications_routes)
            .fallback(middleware::handle_404)
            .layer(middleware::cors(&allowed_origins))
            .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES));

        tracing::info!("Listening on http://{addr}");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
