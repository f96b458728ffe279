use std::sync::Arc;

use crate::agent::{Agent, AgentComponents};
use crate::core::config::settings::Settings;
use crate::core::config::validation::validate_settings;
use crate::core::config::{AppPaths, ConfigService};
use crate::history::HistoryStore;
use crate::llm::{Embedder, LlmProvider, OpenAiProvider};
use crate::rag::{DocumentService, SqliteRagStore};
use crate::weather::{OpenWeatherClient, WeatherProvider};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub agent: Arc<Agent>,
}

impl AppState {
    /// Builds the agent from validated settings.
    ///
    /// 1. Create and verify the data directories
    /// 2. Open the history and vector stores
    /// 3. Wire OpenAI and OpenWeatherMap clients when their keys are set
    /// 4. Build the decision graph
    pub async fn initialize(
        config: ConfigService,
        settings: Settings,
    ) -> Result<Arc<Self>, InitializationError> {
        validate_settings(&settings).map_err(|e| InitializationError::Config(e.into()))?;

        let paths = Arc::new(config.paths().clone());
        paths
            .ensure_directories()
            .map_err(|e| InitializationError::Directories(e.into()))?;

        let history = HistoryStore::new(&paths.history_db_path)
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let store = SqliteRagStore::open(&paths.vector_db_dir, &settings.rag.collection)
            .await
            .map_err(|e| InitializationError::Rag(e.into()))?;
        let documents = DocumentService::new(Arc::new(store), &settings.rag, paths.clone());

        let mock_mode = settings.use_mockups();
        let (llm, embedder) = if settings.openai.api_key.trim().is_empty() {
            (None, None)
        } else {
            let openai = Arc::new(
                OpenAiProvider::new(&settings.openai)
                    .map_err(|e| InitializationError::Llm(e.into()))?,
            );
            (
                Some(openai.clone() as Arc<dyn LlmProvider>),
                Some(openai as Arc<dyn Embedder>),
            )
        };

        let weather = if settings.has_weather_key() {
            let client = OpenWeatherClient::new(&settings.weather)
                .map_err(|e| InitializationError::Weather(e.into()))?;
            Some(Arc::new(client) as Arc<dyn WeatherProvider>)
        } else {
            tracing::info!("OPENWEATHER_API_KEY not set; using mock weather data");
            None
        };

        let components = AgentComponents {
            llm,
            embedder,
            weather,
            documents,
            history,
        };
        let agent = Agent::new(components, settings.app.graph_step_limit, mock_mode)
            .map_err(|e| InitializationError::Graph(e.into()))?;

        if agent.is_offline() {
            tracing::warn!("Using mockups: OpenAI features run offline");
        }

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            agent: Arc::new(agent),
        }))
    }
}
