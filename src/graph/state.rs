// Graph State
// Per-query state threaded through the decision graph

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// Which pipeline answers a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Weather,
    #[default]
    Document,
}

impl Decision {
    /// Only an exact `weather` (any case) selects the weather pipeline.
    pub fn from_str(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("weather") {
            Decision::Weather
        } else {
            Decision::Document
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Weather => "weather",
            Decision::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    /// Conversation so far, ending with the current user message.
    pub messages: Vec<ChatMessage>,
    pub query: String,
    pub decision: Decision,
    /// Empty when no city was identified.
    pub weather_city: String,
    pub weather_result: String,
    pub document_result: String,
    pub final_response: String,
    pub reasoning: String,
}

impl AgentState {
    pub fn new(query: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            query: query.into(),
            ..Self::default()
        }
    }
}
