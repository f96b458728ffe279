use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::json;

use super::fallback::{fallback_city, is_weather_query};
use crate::core::errors::ApiError;
use crate::graph::{build_agent_graph, AgentState, Decision, GraphError, GraphRuntime, NodeContext};
use crate::history::{HistoryMessage, HistoryStore, DEFAULT_SESSION};
use crate::llm::{ChatMessage, Embedder, HashEmbedder, LlmProvider};
use crate::rag::{Document, DocumentService, Metadata};
use crate::weather::{get_weather, MockWeather, WeatherProvider};

/// Services the agent is assembled from. Absent providers mean mock mode
/// for that concern.
pub struct AgentComponents {
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub weather: Option<Arc<dyn WeatherProvider>>,
    pub documents: DocumentService,
    pub history: HistoryStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyRoute {
    Graph,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub response: String,
    pub decision: Decision,
    pub city: Option<String>,
    pub route: ReplyRoute,
    pub offline: bool,
    pub trace: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub offline: bool,
    pub offline_reason: Option<String>,
    pub llm_provider: String,
    pub weather_provider: String,
    pub embedding_model: String,
    pub collection: String,
    pub document_chunks: usize,
    pub messages: i64,
}

pub struct Agent {
    llm: Option<Arc<dyn LlmProvider>>,
    embedder: Option<Arc<dyn Embedder>>,
    weather: Option<Arc<dyn WeatherProvider>>,
    offline_embedder: HashEmbedder,
    mock_weather: MockWeather,
    documents: DocumentService,
    history: HistoryStore,
    graph: GraphRuntime,
    session_id: String,
    offline: AtomicBool,
    offline_reason: RwLock<Option<String>>,
}

impl Agent {
    pub fn new(
        components: AgentComponents,
        graph_step_limit: usize,
        force_offline: bool,
    ) -> Result<Self, GraphError> {
        let graph = build_agent_graph(graph_step_limit)?;

        let reason = if force_offline {
            Some("mock mode requested by configuration".to_string())
        } else if components.llm.is_none() || components.embedder.is_none() {
            Some("no OpenAI API key configured".to_string())
        } else {
            None
        };

        Ok(Self {
            llm: components.llm,
            embedder: components.embedder,
            weather: components.weather,
            offline_embedder: HashEmbedder::new(),
            mock_weather: MockWeather,
            documents: components.documents,
            history: components.history,
            graph,
            session_id: DEFAULT_SESSION.to_string(),
            offline: AtomicBool::new(reason.is_some()),
            offline_reason: RwLock::new(reason),
        })
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Switch to mock mode for the rest of the process lifetime.
    pub fn go_offline(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.offline.swap(true, Ordering::SeqCst) {
            tracing::warn!("Switching to mock mode: {}", reason);
            if let Ok(mut slot) = self.offline_reason.write() {
                *slot = Some(reason);
            }
        }
    }

    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    fn active_llm(&self) -> Option<&dyn LlmProvider> {
        if self.is_offline() {
            None
        } else {
            self.llm.as_deref()
        }
    }

    fn active_embedder(&self) -> &dyn Embedder {
        match (&self.embedder, self.is_offline()) {
            (Some(embedder), false) => embedder.as_ref(),
            _ => &self.offline_embedder,
        }
    }

    fn active_weather(&self) -> &dyn WeatherProvider {
        match (&self.weather, self.is_offline()) {
            (Some(weather), false) => weather.as_ref(),
            _ => &self.mock_weather,
        }
    }

    /// Answer one user query and record both sides in the history.
    pub async fn query(&self, user_input: &str) -> Result<AgentReply, ApiError> {
        let mut messages: Vec<ChatMessage> = self
            .history
            .list(&self.session_id, 0)
            .await?
            .iter()
            .map(HistoryMessage::to_chat_message)
            .collect();
        self.history
            .append(&self.session_id, "user", user_input, None)
            .await?;
        messages.push(ChatMessage::user(user_input));

        let mut state = AgentState::new(user_input, messages);
        let outcome = {
            let ctx = NodeContext {
                llm: self.active_llm(),
                embedder: self.active_embedder(),
                weather: self.active_weather(),
                documents: &self.documents,
            };
            self.graph.run(&mut state, &ctx).await
        };

        let reply = match outcome {
            Ok(trace) => AgentReply {
                response: state.final_response.clone(),
                decision: state.decision,
                city: Some(state.weather_city.clone()).filter(|c| !c.is_empty()),
                route: ReplyRoute::Graph,
                offline: self.is_offline(),
                trace,
            },
            Err(err) => {
                tracing::error!("Graph processing failed: {}", err);
                if err.is_quota_exceeded() {
                    self.go_offline(err.message.clone());
                }
                self.fallback(user_input, err.execution_trace).await
            }
        };

        let metadata = json!({
            "decision": reply.decision,
            "city": reply.city,
            "route": reply.route,
            "offline": reply.offline,
        });
        self.history
            .append(&self.session_id, "assistant", &reply.response, Some(metadata))
            .await?;

        Ok(reply)
    }

    async fn fallback(&self, user_input: &str, trace: Vec<String>) -> AgentReply {
        if is_weather_query(user_input) {
            let city = fallback_city(user_input);
            let data = get_weather(self.active_weather(), &city).await;
            let response = format!("Weather information for {}:\n\n{}", city, data);
            return AgentReply {
                response,
                decision: Decision::Weather,
                city: Some(city),
                route: ReplyRoute::Fallback,
                offline: self.is_offline(),
                trace,
            };
        }

        let response = match self
            .documents
            .answer(user_input, self.active_llm(), self.active_embedder())
            .await
        {
            Ok(answer) => answer,
            Err(err) => format!("Error processing document query: {}", err),
        };

        AgentReply {
            response,
            decision: Decision::Document,
            city: None,
            route: ReplyRoute::Fallback,
            offline: self.is_offline(),
            trace,
        }
    }

    /// Embed and store chunks, retrying offline when the embedding quota is gone.
    async fn store_chunks(&self, chunks: Vec<Document>) -> Result<usize, ApiError> {
        match self
            .documents
            .store_documents(Some(chunks.clone()), self.active_embedder())
            .await
        {
            Err(err) if err.is_quota_exceeded() => {
                self.go_offline(err.to_string());
                self.documents
                    .store_documents(Some(chunks), self.active_embedder())
                    .await
            }
            other => other,
        }
    }

    pub async fn add_document_text(&self, text: &str, metadata: Option<Metadata>) -> bool {
        let chunks = self.documents.process_text(text, metadata);
        match self.store_chunks(chunks).await {
            Ok(stored) => {
                tracing::info!("Added text document ({} chunks)", stored);
                true
            }
            Err(err) => {
                tracing::error!("Error adding document text: {}", err);
                false
            }
        }
    }

    /// Save, chunk and index an uploaded PDF. Returns the stored chunk count.
    pub async fn ingest_pdf(&self, bytes: Vec<u8>, file_name: &str) -> Result<usize, ApiError> {
        let chunks = self.documents.upload_pdf(bytes, file_name).await?;
        let stored = self.store_chunks(chunks).await?;
        tracing::info!("Indexed PDF {} ({} chunks)", file_name, stored);
        Ok(stored)
    }

    pub async fn upload_pdf(&self, bytes: Vec<u8>, file_name: &str) -> bool {
        match self.ingest_pdf(bytes, file_name).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("Error uploading PDF {}: {}", file_name, err);
                false
            }
        }
    }

    /// Index every document already in the data directories.
    pub async fn index_existing(&self) -> bool {
        let chunks = self.documents.load_all_documents().await;
        if chunks.is_empty() {
            tracing::info!("No documents found in the data directories");
            return true;
        }

        match self.store_chunks(chunks).await {
            Ok(stored) => {
                tracing::info!("Indexed {} chunks from the data directories", stored);
                true
            }
            Err(err) => {
                tracing::error!("Error indexing existing documents: {}", err);
                false
            }
        }
    }

    pub async fn clear_conversation(&self) -> Result<u64, ApiError> {
        self.history.clear(&self.session_id).await
    }

    pub async fn history(&self) -> Result<Vec<HistoryMessage>, ApiError> {
        self.history.list(&self.session_id, 0).await
    }

    pub async fn status(&self) -> Result<AgentStatus, ApiError> {
        let offline_reason = self
            .offline_reason
            .read()
            .ok()
            .and_then(|reason| reason.clone());

        Ok(AgentStatus {
            offline: self.is_offline(),
            offline_reason,
            llm_provider: self
                .active_llm()
                .map(|llm| llm.name().to_string())
                .unwrap_or_else(|| "mock".to_string()),
            weather_provider: self.active_weather().name().to_string(),
            embedding_model: self.active_embedder().model_id().to_string(),
            collection: self.documents.collection().to_string(),
            document_chunks: self.documents.count().await?,
            messages: self.history.count(&self.session_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::RagSettings;
    use crate::core::config::AppPaths;
    use crate::graph::testing::ScriptedLlm;
    use crate::rag::SqliteRagStore;
    use async_trait::async_trait;

    struct QuotaEmbedder;

    #[async_trait]
    impl Embedder for QuotaEmbedder {
        fn model_id(&self) -> &str {
            "text-embedding-ada-002"
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::QuotaExceeded("insufficient_quota".to_string()))
        }
    }

    struct RejectingWeather;

    #[async_trait]
    impl WeatherProvider for RejectingWeather {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn current_weather(&self, _city: &str) -> Result<String, ApiError> {
            Err(ApiError::Upstream("401 Invalid API key".to_string()))
        }
    }

    async fn agent_with(
        llm: Option<Arc<dyn LlmProvider>>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> (tempfile::TempDir, Agent) {
        agent_with_weather(llm, embedder, None).await
    }

    async fn agent_with_weather(
        llm: Option<Arc<dyn LlmProvider>>,
        embedder: Option<Arc<dyn Embedder>>,
        weather: Option<Arc<dyn WeatherProvider>>,
    ) -> (tempfile::TempDir, Agent) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_layout(
            dir.path().to_path_buf(),
            dir.path().join("data"),
        ));
        paths.ensure_directories().unwrap();
        let store = SqliteRagStore::open(&paths.vector_db_dir, "pdf_documents")
            .await
            .unwrap();
        let history = HistoryStore::new(&paths.history_db_path).await.unwrap();

        let components = AgentComponents {
            llm,
            embedder,
            weather,
            documents: DocumentService::new(Arc::new(store), &RagSettings::default(), paths),
            history,
        };
        (dir, Agent::new(components, 10, false).unwrap())
    }

    #[tokio::test]
    async fn offline_weather_query_uses_mock_data() {
        let (_dir, agent) = agent_with(None, None).await;

        let reply = agent.query("What's the weather in London?").await.unwrap();

        assert!(reply.offline);
        assert_eq!(reply.route, ReplyRoute::Graph);
        assert_eq!(reply.decision, Decision::Weather);
        assert_eq!(reply.city.as_deref(), Some("London"));
        assert!(reply.response.contains("Mock weather data for London"));
    }

    #[tokio::test]
    async fn conversation_is_recorded_and_cleared() {
        let (_dir, agent) = agent_with(None, None).await;
        agent.query("Tell me about the report").await.unwrap();

        let history = agent.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].metadata.as_ref().unwrap()["decision"], "document");

        assert_eq!(agent.clear_conversation().await.unwrap(), 2);
        assert!(agent.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn quota_error_switches_offline_and_falls_back() {
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm::quota_exceeded());
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        let (_dir, agent) = agent_with(Some(llm), Some(embedder)).await;
        assert!(!agent.is_offline());

        let reply = agent.query("What is the temperature in Paris?").await.unwrap();

        assert!(agent.is_offline());
        assert_eq!(reply.route, ReplyRoute::Fallback);
        assert_eq!(reply.trace, Vec::<String>::new());
        assert!(reply
            .response
            .starts_with("Weather information for Paris:\n\nMock weather data for Paris:"));
    }

    #[tokio::test]
    async fn fallback_weather_error_is_rendered_as_data() {
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm::failing("bad gateway"));
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        let weather: Arc<dyn WeatherProvider> = Arc::new(RejectingWeather);
        let (_dir, agent) = agent_with_weather(Some(llm), Some(embedder), Some(weather)).await;

        let reply = agent.query("What is the weather in Paris?").await.unwrap();

        assert_eq!(reply.route, ReplyRoute::Fallback);
        assert_eq!(reply.city.as_deref(), Some("Paris"));
        assert_eq!(
            reply.response,
            "Weather information for Paris:\n\n\
             Error fetching weather data: upstream error: 401 Invalid API key"
        );
    }

    #[tokio::test]
    async fn fallback_document_query_answers_offline() {
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm::quota_exceeded());
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        let (_dir, agent) = agent_with(Some(llm), Some(embedder)).await;

        let reply = agent.query("Summarize chapter one").await.unwrap();

        assert_eq!(reply.decision, Decision::Document);
        assert!(reply
            .response
            .starts_with("Mock answer to 'Summarize chapter one' based on context:"));
    }

    #[tokio::test]
    async fn non_quota_graph_failure_keeps_online_mode() {
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm::failing("bad gateway"));
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        let (_dir, agent) = agent_with(Some(llm), Some(embedder)).await;

        let reply = agent.query("Summarize chapter one").await.unwrap();

        assert!(!agent.is_offline());
        assert_eq!(reply.route, ReplyRoute::Fallback);
        assert_eq!(
            reply.response,
            "No documents have been uploaded yet. Please upload a document first."
        );
    }

    #[tokio::test]
    async fn embedding_quota_retries_with_offline_embedder() {
        let llm: Arc<dyn LlmProvider> = Arc::new(ScriptedLlm::replies(&[]));
        let embedder: Arc<dyn Embedder> = Arc::new(QuotaEmbedder);
        let (_dir, agent) = agent_with(Some(llm), Some(embedder)).await;

        assert!(agent.add_document_text("Sea levels are rising.", None).await);

        let status = agent.status().await.unwrap();
        assert!(status.offline);
        assert_eq!(status.document_chunks, 1);
        assert_eq!(status.embedding_model, "hash-bow-256");
        assert_eq!(status.llm_provider, "mock");
    }

    #[tokio::test]
    async fn rejected_pdf_upload_leaves_no_file() {
        let (dir, agent) = agent_with(None, None).await;

        assert!(!agent.upload_pdf(b"not a pdf at all".to_vec(), "report.pdf").await);
        let err = agent
            .ingest_pdf(b"not a pdf at all".to_vec(), "report.pdf")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(!dir.path().join("data/pdfs/report.pdf").exists());
        assert!(agent.index_existing().await);
    }

    #[tokio::test]
    async fn index_existing_reads_documents_dir() {
        let (dir, agent) = agent_with(None, None).await;
        std::fs::write(
            dir.path().join("data/documents/sample.txt"),
            "Photosynthesis converts light into chemical energy.",
        )
        .unwrap();

        assert!(agent.index_existing().await);
        assert_eq!(agent.status().await.unwrap().document_chunks, 1);
    }
}
