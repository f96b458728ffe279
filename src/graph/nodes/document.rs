// Document Node
// Answers from the uploaded documents

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::AgentState;

pub struct DocumentNode;

impl DocumentNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for DocumentNode {
    fn id(&self) -> &'static str {
        "document"
    }

    fn name(&self) -> &'static str {
        "Document Search"
    }

    async fn execute(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.document_result = match ctx
            .documents
            .answer(&state.query, ctx.llm, ctx.embedder)
            .await
        {
            Ok(answer) => answer,
            Err(err) if err.is_quota_exceeded() => {
                return Err(GraphError::from_api(self.id(), err));
            }
            Err(err) => {
                tracing::error!("Document query failed: {}", err);
                format!("Error processing document query: {}", err)
            }
        };

        Ok(NodeOutput::Continue(None))
    }
}
