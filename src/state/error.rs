use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to prepare data directories: {0}")]
    Directories(#[source] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize history store: {0}")]
    History(#[source] anyhow::Error),

    #[error("Failed to initialize RAG store: {0}")]
    Rag(#[source] anyhow::Error),

    #[error("Failed to initialize OpenAI client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize weather client: {0}")]
    Weather(#[source] anyhow::Error),

    #[error("Failed to build agent graph: {0}")]
    Graph(#[source] anyhow::Error),
}
