//! Fluent builder for constructing graphs programmatically
//!
//! The builder records nodes and connections and replays them through the
//! real mutation API on `build()`, so everything it produces has passed the
//! same validation as interactive edits.

use std::sync::Arc;

use crate::error::Result;
use crate::events::EventSink;
use crate::graph::Graph;
use crate::node::NodeBehavior;
use crate::types::PortRef;

/// Fluent builder for dataflow graphs
///
/// # Example
///
/// ```ignore
/// let graph = GraphBuilder::new()
///     .add_node("source-1", DataSource::new().with_dataset(dataset))
///     .add_node("filter-1", RangeFilter::new().with_column(0))
///     .connect("source-1", "out", "filter-1", "in")
///     .build()?;
/// ```
pub struct GraphBuilder {
    sink: Option<Arc<dyn EventSink>>,
    nodes: Vec<(String, Box<dyn NodeBehavior>)>,
    edges: Vec<(PortRef, PortRef)>,
}

impl GraphBuilder {
    /// Create a new graph builder
    pub fn new() -> Self {
        Self {
            sink: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Report events from the built graph to the given sink
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Add a node with the given id and behavior
    pub fn add_node(mut self, id: impl Into<String>, behavior: impl NodeBehavior) -> Self {
        self.nodes.push((id.into(), Box::new(behavior)));
        self
    }

    /// Connect an output port to an input port
    pub fn connect(
        mut self,
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        self.edges.push((
            PortRef::new(from_node, from_port),
            PortRef::new(to_node, to_port),
        ));
        self
    }

    /// Build the graph, validating every node and connection
    pub fn build(self) -> Result<Graph> {
        let mut graph = match self.sink {
            Some(sink) => Graph::with_event_sink(sink),
            None => Graph::new(),
        };
        for (id, behavior) in self.nodes {
            graph.add_node(id, behavior)?;
        }
        for (output, input) in self.edges {
            graph.connect(output, input)?;
        }
        Ok(graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
