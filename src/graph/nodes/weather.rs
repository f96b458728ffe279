// Weather Node

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::AgentState;
use crate::llm::{ChatMessage, ChatRequest};

pub const MISSING_CITY_MESSAGE: &str = "I need a city name to provide weather information.";

const WEATHER_PROMPT: &str = "You are a helpful weather assistant. Use the weather data below to \
answer the user's question in a friendly, concise way. Only use the data provided.";

pub struct WeatherNode;

impl WeatherNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for WeatherNode {
    fn id(&self) -> &'static str {
        "weather"
    }

    fn name(&self) -> &'static str {
        "Weather Lookup"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let city = state.weather_city.trim().to_string();
        if city.is_empty() {
            state.weather_result = MISSING_CITY_MESSAGE.to_string();
            return Ok(NodeOutput::Continue(None));
        }

        let data = match ctx.weather.current_weather(&city).await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!("Weather lookup for {} failed: {}", city, err);
                state.weather_result =
                    format!("I couldn't get weather information for {}. Error: {}", city, err);
                return Ok(NodeOutput::Continue(None));
            }
        };

        state.weather_result = match ctx.llm {
            None => data,
            Some(llm) => {
                let request = ChatRequest::new(vec![
                    ChatMessage::system(WEATHER_PROMPT),
                    ChatMessage::user(format!(
                        "Weather data:\n{}\n\nQuestion: {}",
                        data, state.query
                    )),
                ]);
                match llm.chat(request).await {
                    Ok(answer) => answer,
                    Err(err) if err.is_quota_exceeded() => {
                        return Err(GraphError::from_api(self.id(), err));
                    }
                    Err(err) => {
                        format!("I couldn't get weather information for {}. Error: {}", city, err)
                    }
                }
            }
        };

        Ok(NodeOutput::Continue(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::graph::testing::{Fixture, ScriptedLlm};
    use crate::weather::WeatherProvider;

    struct BrokenWeather;

    #[async_trait]
    impl WeatherProvider for BrokenWeather {
        fn name(&self) -> &str {
            "broken"
        }

        async fn current_weather(&self, _city: &str) -> Result<String, ApiError> {
            Err(ApiError::NotFound("city not found: Atlantis".to_string()))
        }
    }

    fn state_for(city: &str) -> AgentState {
        let mut state = AgentState::new("How warm is it?", Vec::new());
        state.weather_city = city.to_string();
        state
    }

    #[tokio::test]
    async fn missing_city_asks_for_one() {
        let fixture = Fixture::new().await;
        let mut state = state_for("  ");

        WeatherNode::new().execute(&mut state, &fixture.context()).await.unwrap();

        assert_eq!(state.weather_result, MISSING_CITY_MESSAGE);
    }

    #[tokio::test]
    async fn offline_returns_raw_weather_data() {
        let fixture = Fixture::new().await;
        let mut state = state_for("Paris");

        WeatherNode::new().execute(&mut state, &fixture.context()).await.unwrap();

        assert!(state.weather_result.starts_with("Mock weather data for Paris:"));
    }

    #[tokio::test]
    async fn provider_errors_are_reported_to_user() {
        let fixture = Fixture::new().await;
        let mut ctx = fixture.context();
        ctx.weather = &BrokenWeather;
        let mut state = state_for("Atlantis");

        WeatherNode::new().execute(&mut state, &ctx).await.unwrap();

        assert_eq!(
            state.weather_result,
            "I couldn't get weather information for Atlantis. Error: not found: city not found: Atlantis"
        );
    }

    #[tokio::test]
    async fn online_passes_data_through_llm() {
        let llm = ScriptedLlm::replies(&["It is a mild 22°C in Paris."]);
        let fixture = Fixture::with_llm(llm).await;
        let mut state = state_for("Paris");

        WeatherNode::new().execute(&mut state, &fixture.context()).await.unwrap();

        assert_eq!(state.weather_result, "It is a mild 22°C in Paris.");
        let prompts = fixture.prompts();
        assert!(prompts[0].contains("Mock weather data for Paris"));
        assert!(prompts[0].contains("Question: How warm is it?"));
    }
}
