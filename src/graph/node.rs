// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::{Embedder, LlmProvider};
use crate::rag::DocumentService;
use crate::weather::WeatherProvider;

use super::state::AgentState;

/// Services available to nodes during one run.
pub struct NodeContext<'a> {
    /// `None` in mock mode; nodes answer without a language model.
    pub llm: Option<&'a dyn LlmProvider>,
    pub embedder: &'a dyn Embedder,
    pub weather: &'a dyn WeatherProvider,
    pub documents: &'a DocumentService,
}

impl NodeContext<'_> {
    pub fn is_offline(&self) -> bool {
        self.llm.is_none()
    }
}

/// Output from a node execution
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Continue to the specified next node (None = use default edge)
    Continue(Option<String>),
    /// Follow the outgoing edge labelled with this condition
    Branch(String),
    /// Graph execution complete
    Final,
    Error(String),
}

/// Graph execution error
///
/// `execution_trace` lists the node IDs visited before the failure, most
/// recent last. `cause` keeps the service error that stopped the node, if any.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub execution_trace: Vec<String>,
    pub cause: Option<ApiError>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
            cause: None,
        }
    }

    pub fn from_api(node_id: impl Into<String>, err: ApiError) -> Self {
        Self {
            message: err.to_string(),
            cause: Some(err),
            ..Self::new(node_id, String::new())
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.cause.as_ref().is_some_and(ApiError::is_quota_exceeded)
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        if let Some(cause) = err.cause {
            return cause;
        }
        ApiError::internal(err)
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str {
        self.id()
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
