use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let reply = state.agent.query(message).await?;
    Ok(Json(reply))
}

pub async fn get_messages(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let messages = state.agent.history().await?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.agent.clear_conversation().await?;
    Ok(Json(json!({ "status": "success", "removed": removed })))
}
