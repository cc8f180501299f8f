//! Diagram snapshots: the serialization contract for whole graphs
//!
//! A `Diagram` is the persistent form of a graph: one chain-folded save
//! record per node (carrying the `type` discriminator) plus the edge list by
//! node-id/port-id pairs. Loading is all-or-nothing: nodes are constructed
//! through the registry, each node's deserialization chain runs, and every
//! edge passes the connectivity check before registration. Any failure
//! aborts the whole load with a single reported reason, leaving the
//! caller's previous graph untouched.

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::graph::Graph;
use crate::registry::NodeRegistry;
use crate::types::{NodeId, PortId, PortRef};

/// Persistent form of an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSave {
    /// Source node id
    pub from_node: NodeId,
    /// Output port id on the source node
    pub from_port: PortId,
    /// Target node id
    pub to_node: NodeId,
    /// Input port id on the target node
    pub to_port: PortId,
}

/// A serialized graph snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    /// Human-readable diagram name
    #[serde(default)]
    pub name: String,
    /// Node save records in creation order; each carries `id` and `type`
    pub nodes: Vec<serde_json::Value>,
    /// Edges by node-id/port-id pairs
    pub edges: Vec<EdgeSave>,
}

impl Diagram {
    /// Parse a diagram from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the diagram as a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Graph {
    /// Snapshot this graph into a diagram.
    ///
    /// Nodes are saved in creation order by folding each node's
    /// serialization chain; edges in registration order. Packages are not
    /// persisted: the first propagation pass after a load rebuilds them.
    pub fn to_diagram(&self) -> Diagram {
        Diagram {
            name: String::new(),
            nodes: self.nodes().map(|node| node.serialize()).collect(),
            edges: self
                .edges()
                .map(|edge| EdgeSave {
                    from_node: edge.source.node.clone(),
                    from_port: edge.source.port.clone(),
                    to_node: edge.target.node.clone(),
                    to_port: edge.target.port.clone(),
                })
                .collect(),
        }
    }

    /// Reconstruct a graph from a diagram snapshot.
    ///
    /// Node construction goes through the registry's type mapping; every
    /// edge is validated with the connectivity check before registration. A
    /// corrupt snapshot fails the whole load, never yielding a partial
    /// graph. After a successful load every connected node is dirty, so the
    /// caller's next propagation pass recomputes all packages.
    pub fn from_diagram(diagram: &Diagram, registry: &NodeRegistry) -> Result<Graph> {
        let mut graph = Graph::new();

        for save in &diagram.nodes {
            let record = save
                .as_object()
                .ok_or_else(|| FlowError::malformed("node save is not an object"))?;
            let id = record
                .get("id")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| FlowError::malformed("node save is missing 'id'"))?;
            let node_type = record
                .get("type")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| FlowError::malformed(format!("node '{}' is missing 'type'", id)))?;

            let behavior = registry
                .create(node_type)
                .ok_or_else(|| FlowError::UnknownNodeType(node_type.to_string()))?;
            graph.add_node(id, behavior)?;
            if let Some(node) = graph.node_mut(id) {
                node.deserialize(save)?;
            }
        }

        for edge in &diagram.edges {
            graph.connect(
                PortRef::new(edge.from_node.clone(), edge.from_port.clone()),
                PortRef::new(edge.to_node.clone(), edge.to_port.clone()),
            )?;
        }

        Ok(graph)
    }
}
