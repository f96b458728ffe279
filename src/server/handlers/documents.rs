use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::rag::Metadata;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TextPayload {
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

async fn indexed_response(state: &AppState) -> Result<Json<Value>, ApiError> {
    let chunks = state.agent.documents().count().await?;
    Ok(Json(json!({
        "success": true,
        "document_chunks": chunks,
        "offline": state.agent.is_offline(),
    })))
}

pub async fn add_text(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TextPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }

    let metadata = payload
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|source| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), Value::String(source));
            metadata
        });

    if !state.agent.add_document_text(&payload.text, metadata).await {
        return Err(ApiError::Internal("Failed to add document text".to_string()));
    }
    indexed_response(&state).await
}

/// Multipart upload; the PDF is expected in a field named `file`.
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }

        state.agent.ingest_pdf(bytes.to_vec(), &file_name).await?;
        return indexed_response(&state).await;
    }

    Err(ApiError::BadRequest("missing multipart field 'file'".to_string()))
}

pub async fn reindex(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    if !state.agent.index_existing().await {
        return Err(ApiError::Internal("Failed to index existing documents".to_string()));
    }
    indexed_response(&state).await
}
