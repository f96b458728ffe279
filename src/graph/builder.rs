// Graph Builder
// START -> decide -> {weather | document} -> response -> END

use super::node::GraphError;
use super::nodes::{DecideNode, DocumentNode, ResponseNode, WeatherNode};
use super::runtime::{GraphBuilder, GraphRuntime};

pub fn build_agent_graph(max_steps: usize) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("decide")
        .max_steps(max_steps)
        .node(Box::new(DecideNode::new()))
        .node(Box::new(WeatherNode::new()))
        .node(Box::new(DocumentNode::new()))
        .node(Box::new(ResponseNode::new()))
        .conditional_edge("decide", "weather", "weather")
        .conditional_edge("decide", "document", "document")
        .edge("weather", "response")
        .edge("document", "response")
        .build()
}
