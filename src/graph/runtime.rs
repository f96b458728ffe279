// Graph Runtime - petgraph based
// StateGraph execution engine for the decision agent

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::AgentState;

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge)
    Always,
    /// Follow this edge when the node branches with this condition
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Maximum execution steps (recursion limit)
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 10,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    pub fn add_conditional_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::new(from, format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::new(to, format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, condition);
        Ok(())
    }

    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.node_indices.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Run from the entry node until a node returns `Final`.
    ///
    /// Returns the IDs of the executed nodes in order.
    pub async fn run(
        &self,
        state: &mut AgentState,
        ctx: &NodeContext<'_>,
    ) -> Result<Vec<String>, GraphError> {
        if self.entry_node_id.is_empty() {
            return Err(GraphError::new("runtime", "No entry node set"));
        }

        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::new(
                "runtime",
                format!("Entry node not found: {}", self.entry_node_id),
            )
        })?;

        let mut trace: Vec<String> = Vec::new();

        loop {
            if trace.len() >= self.max_steps {
                return Err(GraphError::new(
                    "runtime",
                    format!("Maximum steps ({}) exceeded", self.max_steps),
                )
                .with_trace(trace));
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "Node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!("Executing node: {} (step {})", node_id, trace.len());

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };
            trace.push(node_id.to_string());

            let next = match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(trace);
                }
                NodeOutput::Error(msg) => Err(GraphError::new(node_id, msg)),
                NodeOutput::Continue(explicit_next) => {
                    self.resolve_next_node(current_idx, None, explicit_next.as_deref())
                }
                NodeOutput::Branch(condition) => {
                    self.resolve_next_node(current_idx, Some(&condition), None)
                }
            };

            current_idx = match next {
                Ok(idx) => idx,
                Err(err) => return Err(err.with_trace(trace)),
            };
        }
    }

    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        if let Some(next_id) = explicit {
            return self.node_indices.get(next_id).copied().ok_or_else(|| {
                GraphError::new(current_id, format!("Explicit target node not found: {}", next_id))
            });
        }

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
            .collect();

        if edges.is_empty() {
            return Err(GraphError::new(
                current_id,
                format!("No outgoing edges from node: {}", current_id),
            ));
        }

        if let Some((target, _)) = edges.iter().find(|(_, weight)| weight.matches(condition)) {
            return Ok(*target);
        }

        // Unmatched branch conditions fall back to the default edge
        if let Some((target, _)) = edges
            .iter()
            .find(|(_, weight)| **weight == EdgeCondition::Always)
        {
            tracing::warn!(
                "Condition '{}' not matched for node '{}', using default edge",
                condition.unwrap_or(""),
                current_id
            );
            return Ok(*target);
        }

        Err(GraphError::new(
            current_id,
            format!(
                "No matching edge for condition: {:?}",
                condition.unwrap_or("(none)")
            ),
        ))
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to, condition) in self.pending_edges {
            self.runtime.add_conditional_edge(&from, &to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::Fixture;
    use async_trait::async_trait;

    struct Step {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for Step {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            state: &mut AgentState,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            state.reasoning.push_str(self.id);
            Ok(self.output.clone())
        }
    }

    fn step(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(Step { id, output })
    }

    #[test]
    fn test_edge_condition_matching() {
        assert!(EdgeCondition::Always.matches(None));
        assert!(!EdgeCondition::Always.matches(Some("weather")));

        assert!(EdgeCondition::on("weather").matches(Some("weather")));
        assert!(!EdgeCondition::on("weather").matches(Some("document")));
        assert!(!EdgeCondition::on("weather").matches(None));
    }

    #[tokio::test]
    async fn branch_follows_matching_edge() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Branch("right".to_string())))
            .node(step("left", NodeOutput::Final))
            .node(step("right", NodeOutput::Final))
            .conditional_edge("a", "left", "left")
            .conditional_edge("a", "right", "right")
            .build()
            .unwrap();

        let mut state = AgentState::default();
        let trace = graph.run(&mut state, &fixture.context()).await.unwrap();

        assert_eq!(trace, vec!["a", "right"]);
        assert_eq!(state.reasoning, "aright");
    }

    #[tokio::test]
    async fn unmatched_branch_uses_default_edge() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Branch("missing".to_string())))
            .node(step("b", NodeOutput::Final))
            .edge("a", "b")
            .build()
            .unwrap();

        let trace = graph
            .run(&mut AgentState::default(), &fixture.context())
            .await
            .unwrap();
        assert_eq!(trace, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn step_limit_stops_cycles() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .max_steps(3)
            .node(step("a", NodeOutput::Continue(None)))
            .node(step("b", NodeOutput::Continue(None)))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();

        assert!(graph.has_cycle());
        let err = graph
            .run(&mut AgentState::default(), &fixture.context())
            .await
            .unwrap_err();

        assert!(err.message.contains("Maximum steps (3)"));
        assert_eq!(err.execution_trace, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn dead_end_reports_node_and_trace() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue(None)))
            .build()
            .unwrap();

        let err = graph
            .run(&mut AgentState::default(), &fixture.context())
            .await
            .unwrap_err();

        assert_eq!(err.node_id, "a");
        assert_eq!(err.execution_trace, vec!["a"]);
    }

    #[test]
    fn edges_to_unknown_nodes_fail_to_build() {
        let result = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .edge("a", "nowhere")
            .build();
        assert!(result.is_err());
    }
}
