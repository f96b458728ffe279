//! Document retrieval: loading, chunking, embedding storage and answering.

pub mod document;
pub mod loader;
pub mod service;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use document::{Document, Metadata};
pub use service::DocumentService;
pub use splitter::RecursiveCharacterSplitter;
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};
