// Decision Graph Module
// StateGraph that routes each query to the weather or document pipeline

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;

pub use builder::build_agent_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::{AgentState, Decision};

/// Conditional edge label for the decide node.
pub fn router(state: &AgentState) -> &'static str {
    state.decision.as_str()
}
