use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::provider::Embedder;
use crate::core::errors::ApiError;

pub const HASH_EMBEDDING_DIM: usize = 256;

/// Offline embedder: feature-hashed bag of words.
///
/// Deterministic across runs, so chunks stored in mock mode stay searchable
/// after a restart.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_dim(HASH_EMBEDDING_DIM)
    }

    pub fn with_dim(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            model_id: format!("hash-bow-{}", dim.max(1)),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}
