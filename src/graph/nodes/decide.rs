// Decide Node
// Chooses the weather or document pipeline for a query

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{AgentState, Decision};
use crate::graph::router;
use crate::llm::{ChatMessage, ChatRequest};

const DECISION_PROMPT: &str = "You are a decision-making assistant that determines how to handle user queries.

Based on the user's input, decide whether:
1. The query is asking for weather information (choose \"weather\")
2. The query is asking for information from documents (choose \"document\")

If it's a weather query, also extract the name of the city or location.

Respond in the following format:
Decision: [weather/document]
City: [city name if applicable, otherwise \"none\"]
Reasoning: [brief explanation of your decision]";

const WEATHER_KEYWORDS: [&str; 3] = ["weather", "temperature", "forecast"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedDecision {
    pub decision: Decision,
    pub city: String,
    pub reasoning: String,
}

/// Parse `Decision:` / `City:` / `Reasoning:` lines. Anything missing keeps
/// its default: document, no city. Prefixes must start the line; only the
/// reply as a whole is trimmed.
pub fn parse_decision(text: &str) -> ParsedDecision {
    let mut parsed = ParsedDecision::default();

    for line in text.trim().lines() {
        if let Some(value) = line.strip_prefix("Decision:") {
            parsed.decision = Decision::from_str(value);
        } else if let Some(value) = line.strip_prefix("City:") {
            let city = value.trim();
            parsed.city = if city.eq_ignore_ascii_case("none") {
                String::new()
            } else {
                city.to_string()
            };
        } else if let Some(value) = line.strip_prefix("Reasoning:") {
            parsed.reasoning = value.trim().to_string();
        }
    }

    parsed
}

fn city_pattern() -> Option<&'static Regex> {
    static CITY: OnceLock<Option<Regex>> = OnceLock::new();
    CITY.get_or_init(|| Regex::new(r"in\s+([A-Za-z\s]+)(?:\?|$)").ok())
        .as_ref()
}

/// City named after `in`, up to a question mark or the end of the query.
pub fn extract_city(query: &str) -> Option<String> {
    city_pattern()?
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|city| !city.is_empty())
}

pub fn mentions_weather(query: &str) -> bool {
    let lowered = query.to_lowercase();
    WEATHER_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Keyword routing used when no language model is available.
pub fn heuristic_decision(query: &str) -> ParsedDecision {
    if mentions_weather(query) {
        ParsedDecision {
            decision: Decision::Weather,
            city: extract_city(query).unwrap_or_default(),
            reasoning: "Query mentions weather keywords".to_string(),
        }
    } else {
        ParsedDecision {
            decision: Decision::Document,
            city: String::new(),
            reasoning: "No weather keywords; searching documents".to_string(),
        }
    }
}

pub struct DecideNode;

impl DecideNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DecideNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for DecideNode {
    fn id(&self) -> &'static str {
        "decide"
    }

    fn name(&self) -> &'static str {
        "Decision"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let parsed = match ctx.llm {
            Some(llm) => {
                let request = ChatRequest::new(vec![
                    ChatMessage::system(DECISION_PROMPT),
                    ChatMessage::user(state.query.clone()),
                ])
                .with_temperature(0.0);
                let reply = llm
                    .chat(request)
                    .await
                    .map_err(|e| GraphError::from_api(self.id(), e))?;
                parse_decision(&reply)
            }
            None => heuristic_decision(&state.query),
        };

        state.decision = parsed.decision;
        state.weather_city = parsed.city;
        state.reasoning = parsed.reasoning;

        tracing::info!(
            "Decide: routing to {} (city: {:?})",
            state.decision.as_str(),
            state.weather_city
        );

        Ok(NodeOutput::Branch(router(state).to_string()))
    }
}
