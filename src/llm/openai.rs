use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::provider::{Embedder, LlmProvider};
use super::types::ChatRequest;
use crate::core::config::settings::OpenAiSettings;
use crate::core::errors::ApiError;

const QUOTA_CODE: &str = "insufficient_quota";

/// OpenAI-compatible HTTP provider for chat completions and embeddings.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    temperature: f64,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(settings: &OpenAiSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            temperature: settings.temperature,
            client,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(classify_failure(status, &text));
        }

        res.json().await.map_err(ApiError::upstream)
    }
}

fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = &payload["error"];
    let message = error["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    let quota_flagged = [&error["code"], &error["type"]]
        .iter()
        .any(|v| v.as_str() == Some(QUOTA_CODE));

    if quota_flagged || status == StatusCode::TOO_MANY_REQUESTS {
        ApiError::QuotaExceeded(format!("OpenAI {}: {}", status, message))
    } else {
        ApiError::Upstream(format!("OpenAI {}: {}", status, message))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
            if let Some(s) = request.stop { obj.insert("stop".to_string(), json!(s)); }
        }

        let payload = self.post_json("/chat/completions", &body).await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Upstream("OpenAI response had no message content".to_string()))
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    fn model_id(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let payload = self.post_json("/embeddings", &body).await?;

        let mut indexed: Vec<(usize, Vec<f32>)> = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for (position, item) in data.iter().enumerate() {
                let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect();
                    indexed.push((index, vec));
                }
            }
        }
        indexed.sort_by_key(|(index, _)| *index);

        if indexed.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "OpenAI returned {} embeddings for {} inputs",
                indexed.len(),
                inputs.len()
            )));
        }

        Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
    }
}
