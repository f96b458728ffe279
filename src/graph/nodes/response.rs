// Response Node
// Copies the chosen pipeline's result into the final response

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{AgentState, Decision};

pub struct ResponseNode;

impl ResponseNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResponseNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ResponseNode {
    fn id(&self) -> &'static str {
        "response"
    }

    fn name(&self) -> &'static str {
        "Response"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        _ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.final_response = match state.decision {
            Decision::Weather => state.weather_result.clone(),
            Decision::Document => state.document_result.clone(),
        };
        Ok(NodeOutput::Final)
    }
}
