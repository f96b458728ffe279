use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const QUOTA_MARKER: &str = "insufficient_quota";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openai: OpenAiSettings,
    pub weather: WeatherSettings,
    pub rag: RagSettings,
    pub server: ServerSettings,
    pub app: AppSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    /// Mirrors `OPENAI_ERROR`; a value containing `insufficient_quota` forces mock mode.
    pub error: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            error: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub api_key: String,
    pub base_url: String,
    pub units: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            units: "metric".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub collection: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            top_k: 3,
            collection: "pdf_documents".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Empty means localhost origins on the configured port.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub offline: bool,
    pub project: String,
    pub graph_step_limit: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            offline: false,
            project: "weather-rag-agent".to_string(),
            graph_step_limit: 10,
        }
    }
}

impl Settings {
    /// Mock mode: no OpenAI key, a recorded quota failure, or an explicit offline flag.
    pub fn use_mockups(&self) -> bool {
        self.app.offline
            || self.openai.api_key.trim().is_empty()
            || self.openai.error.contains(QUOTA_MARKER)
    }

    pub fn has_weather_key(&self) -> bool {
        !self.weather.api_key.trim().is_empty()
    }
}
