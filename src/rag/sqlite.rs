//! SQLite-backed chunk store.
//!
//! Embeddings are kept as little-endian `f32` blobs and searched by
//! brute-force cosine similarity.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::document::Metadata;
use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::errors::ApiError;

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteRagStore {
    /// Open `<vector_db_dir>/<collection>.db`.
    pub async fn open(vector_db_dir: &Path, collection: &str) -> Result<Self, ApiError> {
        Self::with_path(vector_db_dir.join(format!("{}.db", collection))).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding_model TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_rag_collection_model
             ON rag_chunks(collection, embedding_model)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Metadata>(&metadata_str).unwrap_or_default();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            collection: row.get("collection"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
        embedding_model: &str,
    ) -> Result<usize, ApiError> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str =
                serde_json::to_string(&chunk.metadata).unwrap_or_else(|_| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks
                 (chunk_id, collection, content, source, metadata, embedding_model, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.collection)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(embedding_model)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        // repeated ids in one batch replace each other
        let written: HashSet<&str> = items.iter().map(|(chunk, _)| chunk.chunk_id.as_str()).collect();
        Ok(written.len())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        embedding_model: &str,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        if query_embedding.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, collection, content, source, metadata, embedding
             FROM rag_chunks
             WHERE collection = ?1 AND embedding_model = ?2
             ORDER BY created_at ASC",
        )
        .bind(collection)
        .bind(embedding_model)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                if stored.len() != query_embedding.len() {
                    return None;
                }

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score: Self::cosine_similarity(query_embedding, &stored),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as usize)
    }

    async fn clear(&self, collection: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM rag_chunks WHERE collection = ?1")
            .bind(collection)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::document::Document;

    const MODEL: &str = "test-model";

    async fn temp_store() -> (tempfile::TempDir, SqliteRagStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::open(dir.path(), "pdf_documents").await.unwrap();
        (dir, store)
    }

    fn chunk(content: &str) -> StoredChunk {
        StoredChunk::from_document("pdf_documents", MODEL, &Document::with_source(content, "a.txt"))
    }

    #[test]
    fn embedding_blob_roundtrip() {
        let original = vec![1.0_f32, -2.5, 0.125];
        let bytes = SqliteRagStore::serialize_embedding(&original);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteRagStore::deserialize_embedding(&bytes), original);
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let (_dir, store) = temp_store().await;
        store
            .insert_batch(
                vec![
                    (chunk("east"), vec![1.0, 0.0]),
                    (chunk("north"), vec![0.0, 1.0]),
                    (chunk("north-east"), vec![0.7, 0.7]),
                ],
                MODEL,
            )
            .await
            .unwrap();

        let results = store
            .search("pdf_documents", &[1.0, 0.1], 2, MODEL)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "east");
        assert_eq!(results[1].chunk.content, "north-east");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn reinserting_same_chunk_replaces_row() {
        let (_dir, store) = temp_store().await;
        store.insert_batch(vec![(chunk("same"), vec![1.0])], MODEL).await.unwrap();
        store.insert_batch(vec![(chunk("same"), vec![1.0])], MODEL).await.unwrap();

        assert_eq!(store.count("pdf_documents").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_batch_counts_distinct_rows() {
        let (_dir, store) = temp_store().await;
        let written = store
            .insert_batch(
                vec![
                    (chunk("same"), vec![1.0]),
                    (chunk("same"), vec![1.0]),
                    (chunk("other"), vec![0.5]),
                ],
                MODEL,
            )
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.count("pdf_documents").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_ignores_other_models_and_dimensions() {
        let (_dir, store) = temp_store().await;
        store.insert_batch(vec![(chunk("two-d"), vec![1.0, 0.0])], MODEL).await.unwrap();
        store
            .insert_batch(vec![(chunk("three-d"), vec![1.0, 0.0, 0.0])], MODEL)
            .await
            .unwrap();
        store
            .insert_batch(vec![(chunk("other"), vec![1.0, 0.0])], "other-model")
            .await
            .unwrap();

        let results = store
            .search("pdf_documents", &[1.0, 0.0], 10, MODEL)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "two-d");
    }

    #[tokio::test]
    async fn clear_removes_collection_rows() {
        let (_dir, store) = temp_store().await;
        store
            .insert_batch(vec![(chunk("a"), vec![1.0]), (chunk("b"), vec![0.5])], MODEL)
            .await
            .unwrap();

        assert_eq!(store.clear("pdf_documents").await.unwrap(), 2);
        assert_eq!(store.count("pdf_documents").await.unwrap(), 0);
        assert!(store.db_path().ends_with("pdf_documents.db"));
    }
}
