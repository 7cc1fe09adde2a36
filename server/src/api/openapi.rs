//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{chats, health, messages, notifications, users};
use crate::api::types::PaginationMeta;
use crate::data::types::{MessageKind, MessageState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WhatsUp API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Messaging backend"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "users", description = "User directory"),
        (name = "chats", description = "One-to-one chats"),
        (name = "messages", description = "Messages and media"),
        (name = "notifications", description = "Real-time push stream")
    ),
    paths(
        health::health,
        users::list_users,
        users::get_user,
        chats::create_chat,
        chats::list_chats,
        messages::send_message,
        messages::list_messages,
        messages::mark_seen,
        messages::upload_media,
        notifications::sse,
    ),
    components(schemas(
        PaginationMeta,
        health::HealthResponse,
        users::UserDto,
        chats::ChatDto,
        chats::ChatIdResponse,
        messages::MessageDto,
        messages::SeenResponse,
        MessageKind,
        MessageState,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>WhatsUp API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
                deepLinking: true,
                showExtensions: true,
                showCommonExtensions: true
            });
        };
    </script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/v1/messages/upload-media"));
        assert!(json.contains("/api/v1/notifications/sse"));
    }
}
