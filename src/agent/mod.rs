//! Conversation agent: routes each query through the decision graph and
//! keeps the chat history.

mod fallback;
mod runtime;

pub use fallback::{fallback_city, is_weather_query, UNKNOWN_LOCATION};
pub use runtime::{Agent, AgentComponents, AgentReply, AgentStatus, ReplyRoute};
