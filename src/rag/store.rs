//! Storage seam for embedded document chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::document::{Document, Metadata};
use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub collection: String,
    pub content: String,
    pub source: String,
    pub metadata: Metadata,
}

impl StoredChunk {
    /// Build a chunk whose id is stable for the same collection, model,
    /// source, page and content, so re-indexing a file replaces its rows.
    pub fn from_document(collection: &str, embedding_model: &str, doc: &Document) -> Self {
        let source = doc.source().to_string();
        let page = doc
            .metadata
            .get("page")
            .map(|page| page.to_string())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        for part in [
            collection,
            embedding_model,
            source.as_str(),
            page.as_str(),
            doc.content.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }

        Self {
            chunk_id: hex::encode(hasher.finalize()),
            collection: collection.to_string(),
            content: doc.content.clone(),
            source,
            metadata: doc.metadata.clone(),
        }
    }

    pub fn to_document(&self) -> Document {
        Document::new(self.content.clone(), self.metadata.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity, higher is better.
    pub score: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert or replace chunks embedded with `embedding_model`.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
        embedding_model: &str,
    ) -> Result<usize, ApiError>;

    /// Top `limit` chunks of `collection` embedded with the same model.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        embedding_model: &str,
    ) -> Result<Vec<ChunkSearchResult>, ApiError>;

    async fn count(&self, collection: &str) -> Result<usize, ApiError>;

    async fn clear(&self, collection: &str) -> Result<usize, ApiError>;
}
