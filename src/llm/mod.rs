pub mod embedder;
pub mod openai;
pub mod provider;
pub mod types;

pub use embedder::HashEmbedder;
pub use openai::OpenAiProvider;
pub use provider::{Embedder, LlmProvider};
pub use types::{ChatMessage, ChatRequest};
