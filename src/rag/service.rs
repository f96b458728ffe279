use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::document::{Document, Metadata};
use super::loader;
use super::splitter::RecursiveCharacterSplitter;
use super::store::{RagStore, StoredChunk};
use crate::core::config::settings::RagSettings;
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, Embedder, LlmProvider};

pub const NO_DOCUMENTS_MESSAGE: &str =
    "No documents have been uploaded yet. Please upload a document first.";

const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions using the \
provided document excerpts. Answer only from the context. If the context does not contain the \
answer, say that you don't know.";

/// Chunking, embedding, storage and retrieval for one collection.
pub struct DocumentService {
    store: Arc<dyn RagStore>,
    splitter: RecursiveCharacterSplitter,
    collection: String,
    top_k: usize,
    paths: Arc<AppPaths>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn RagStore>, settings: &RagSettings, paths: Arc<AppPaths>) -> Self {
        Self {
            store,
            splitter: RecursiveCharacterSplitter::new(settings.chunk_size, settings.chunk_overlap),
            collection: settings.collection.clone(),
            top_k: settings.top_k,
            paths,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        self.store.count(&self.collection).await
    }

    pub async fn clear(&self) -> Result<usize, ApiError> {
        self.store.clear(&self.collection).await
    }

    /// Chunk free text. Metadata defaults to `{"source": "user_input"}`.
    pub fn process_text(&self, text: &str, metadata: Option<Metadata>) -> Vec<Document> {
        let metadata = metadata.unwrap_or_else(|| {
            let mut m = Metadata::new();
            m.insert("source".to_string(), Value::String("user_input".to_string()));
            m
        });
        self.splitter
            .split_documents(&[Document::new(text, metadata)])
    }

    /// Parse an uploaded PDF, then save it under `pdfs/` and return its chunks.
    /// Uploads that fail to parse are not written.
    pub async fn upload_pdf(&self, bytes: Vec<u8>, file_name: &str) -> Result<Vec<Document>, ApiError> {
        let target = self.pdf_target(file_name)?;
        let pages = loader::load_pdf_bytes(bytes.clone(), &target.to_string_lossy()).await?;

        tokio::fs::write(&target, &bytes).await?;
        tracing::info!("Saved PDF upload to {}", target.display());
        Ok(self.splitter.split_documents(&pages))
    }

    /// Chunks of a PDF already on disk.
    pub async fn load_pdf(&self, path: &Path) -> Result<Vec<Document>, ApiError> {
        let pages = loader::load_pdf(path).await?;
        Ok(self.splitter.split_documents(&pages))
    }

    /// Chunks of every PDF and text file in the data directories.
    pub async fn load_all_documents(&self) -> Vec<Document> {
        let documents = loader::load_all_documents(&self.paths).await;
        self.splitter.split_documents(&documents)
    }

    fn pdf_target(&self, file_name: &str) -> Result<PathBuf, ApiError> {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid file name: {}", file_name)))?;

        let name = if name.to_lowercase().ends_with(".pdf") {
            name.to_string()
        } else {
            format!("{}.pdf", name)
        };
        Ok(self.paths.pdf_dir.join(name))
    }

    /// Embed and store chunks. `None` indexes everything in the data directories.
    pub async fn store_documents(
        &self,
        chunks: Option<Vec<Document>>,
        embedder: &dyn Embedder,
    ) -> Result<usize, ApiError> {
        let chunks = match chunks {
            Some(chunks) => chunks,
            None => self.load_all_documents().await,
        };
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ApiError::Internal(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let model = embedder.model_id();
        let items = chunks
            .iter()
            .map(|doc| StoredChunk::from_document(&self.collection, model, doc))
            .zip(embeddings)
            .collect();

        let stored = self.store.insert_batch(items, model).await?;
        tracing::info!(
            "Stored {} chunks in '{}' with {}",
            stored,
            self.collection,
            model
        );
        Ok(stored)
    }

    /// Top-k chunks for `query`.
    pub async fn retrieve(&self, query: &str, embedder: &dyn Embedder) -> Result<Vec<Document>, ApiError> {
        let embedding = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let results = self
            .store
            .search(&self.collection, &embedding, self.top_k, embedder.model_id())
            .await?;

        tracing::debug!("Retrieved {} chunks for query", results.len());
        Ok(results.iter().map(|r| r.chunk.to_document()).collect())
    }

    /// Answer from the collection. Without an LLM the reply is a canned
    /// summary of the retrieved context.
    pub async fn answer(
        &self,
        query: &str,
        llm: Option<&dyn LlmProvider>,
        embedder: &dyn Embedder,
    ) -> Result<String, ApiError> {
        let Some(llm) = llm else {
            let mut context = self.retrieve(query, embedder).await?;
            if context.is_empty() {
                context = sample_documents();
            }
            return Ok(mock_answer(query, &context));
        };

        // chunks from another embedding model are not searchable
        let context = self.retrieve(query, embedder).await?;
        if context.is_empty() {
            return Ok(NO_DOCUMENTS_MESSAGE.to_string());
        }
        llm.chat(rag_request(query, &context)).await
    }
}

pub fn sample_documents() -> Vec<Document> {
    (1..=3)
        .map(|i| Document::with_source(format!("Sample document {}", i), format!("sample{}", i)))
        .collect()
}

pub fn mock_answer(query: &str, context: &[Document]) -> String {
    let context = context
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!("Mock answer to '{}' based on context: {}", query, context)
}

fn rag_request(query: &str, context: &[Document]) -> ChatRequest {
    let context = context
        .iter()
        .map(|doc| format!("[{}]\n{}", doc.source(), doc.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    ChatRequest::new(vec![
        ChatMessage::system(RAG_SYSTEM_PROMPT),
        ChatMessage::user(format!("Context:\n{}\n\nQuestion: {}", context, query)),
    ])
}
