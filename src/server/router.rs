use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::settings::ServerSettings;
use crate::server::handlers::{chat, config, documents, health, ui};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Creates the application router with all routes and middleware.
///
/// - `/` serves the chat page
/// - `/api/chat` and `/api/messages` drive the conversation
/// - `/api/documents/*` feeds the document store
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server);
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/config", get(config::get_config))
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/messages",
            get(chat::get_messages).delete(chat::clear_messages),
        )
        .route("/api/documents/text", post(documents::add_text))
        .route(
            "/api/documents/pdf",
            post(documents::upload_pdf).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/documents/reindex", post(documents::reindex))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(server: &ServerSettings) -> CorsLayer {
    let origins = resolve_allowed_origins(server)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(server: &ServerSettings) -> Vec<String> {
    let origins = server
        .cors_allowed_origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins(server.port);
    }

    origins
}

fn default_local_origins(port: u16) -> Vec<String> {
    vec![
        format!("http://localhost:{}", port),
        format!("http://127.0.0.1:{}", port),
    ]
}
