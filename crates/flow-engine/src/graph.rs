//! The authoritative node and edge registry
//!
//! `Graph` owns every node and edge and is the only place graph structure is
//! mutated. Mutations validate first and never partially apply; a rejected
//! connect or remove leaves the graph exactly as it was. There is no ambient
//! global registry: a `Graph` instance is passed explicitly to whoever needs
//! to query or mutate it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connectivity::check_connectivity;
use crate::error::{FlowError, Result};
use crate::events::{EventSink, FlowEvent, NullEventSink};
use crate::node::{Node, NodeBehavior};
use crate::port::Port;
use crate::types::{EdgeId, NodeId, PortRef};

/// A directed connection from one output port to one input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// The producing output port
    pub source: PortRef,
    /// The consuming input port
    pub target: PortRef,
}

/// The dataflow graph: node registry, edge registry, event sink
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    /// Node ids in creation order; drives scheduling ties and serialization.
    order: Vec<NodeId>,
    edges: HashMap<EdgeId, Edge>,
    edge_order: Vec<EdgeId>,
    next_seq: u64,
    next_edge: u64,
    top_layer: i64,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("order", &self.order)
            .field("edge_order", &self.edge_order)
            .field("next_seq", &self.next_seq)
            .field("next_edge", &self.next_edge)
            .field("top_layer", &self.top_layer)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Create an empty graph with a no-op event sink
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            edge_order: Vec::new(),
            next_seq: 0,
            next_edge: 0,
            top_layer: 0,
            sink: Arc::new(NullEventSink),
        }
    }

    /// Create an empty graph reporting to the given sink
    pub fn with_event_sink(sink: Arc<dyn EventSink>) -> Self {
        let mut graph = Self::new();
        graph.sink = sink;
        graph
    }

    /// Replace the event sink
    pub fn set_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    pub(crate) fn emit(&self, event: FlowEvent) {
        self.sink.send(event);
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Register a new node built from the given behavior
    pub fn add_node(&mut self, id: impl Into<String>, behavior: Box<dyn NodeBehavior>) -> Result<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(FlowError::DuplicateNode(id));
        }
        let mut node = Node::new(id.clone(), behavior);
        self.next_seq += 1;
        node.set_seq(self.next_seq);
        self.nodes.insert(id.clone(), node);
        self.order.push(id);
        Ok(())
    }

    /// Remove a node that has no incident edges.
    ///
    /// Fails with `NodeHasConnections` while edges are attached; use
    /// `remove_node_with_edges` to disconnect and remove atomically.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(FlowError::UnknownNode(id.to_string()));
        }
        let incident = self.incident_edges(id);
        if !incident.is_empty() {
            return Err(FlowError::NodeHasConnections {
                node_id: id.to_string(),
                edges: incident.len(),
            });
        }
        self.nodes.remove(id);
        self.order.retain(|n| n != id);
        Ok(())
    }

    /// Disconnect all incident edges, then remove the node
    pub fn remove_node_with_edges(&mut self, id: &str) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(FlowError::UnknownNode(id.to_string()));
        }
        for edge_id in self.incident_edges(id) {
            self.disconnect(&edge_id)?;
        }
        self.remove_node(id)
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node by id, mutably
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn require_node(&self, id: &str) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| FlowError::UnknownNode(id.to_string()))
    }

    /// Number of registered nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in creation order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|id| id.as_str())
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Mark a node dirty after a direct data edit, so the next propagation
    /// pass starting from it recomputes its outputs
    pub fn touch(&mut self, id: &str) -> Result<()> {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.mark_dirty();
                Ok(())
            }
            None => Err(FlowError::UnknownNode(id.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Create an edge from an output port to an input port.
    ///
    /// The connectivity check runs first; a rejected edge is never partially
    /// applied. On success the input port's owning node becomes dirty via its
    /// connection-updated flag.
    pub fn connect(&mut self, output: PortRef, input: PortRef) -> Result<EdgeId> {
        check_connectivity(self, &output, &input)?.into_result()?;

        self.next_edge += 1;
        let id = format!("edge-{}", self.next_edge);

        if let Some(port) = self
            .nodes
            .get_mut(&output.node)
            .and_then(|n| n.output_port_mut(&output.port))
        {
            port.attach(id.clone());
        }
        if let Some(port) = self
            .nodes
            .get_mut(&input.node)
            .and_then(|n| n.input_port_mut(&input.port))
        {
            port.attach(id.clone());
        }

        self.edges.insert(
            id.clone(),
            Edge {
                id: id.clone(),
                source: output,
                target: input,
            },
        );
        self.edge_order.push(id.clone());
        Ok(id)
    }

    /// Remove an edge.
    ///
    /// Detaches both endpoints; the package the edge had delivered to the
    /// input port is dropped, marking the consumer dirty.
    pub fn disconnect(&mut self, edge_id: &str) -> Result<()> {
        let edge = self
            .edges
            .remove(edge_id)
            .ok_or_else(|| FlowError::UnknownEdge(edge_id.to_string()))?;
        self.edge_order.retain(|e| e != edge_id);

        if let Some(port) = self
            .nodes
            .get_mut(&edge.source.node)
            .and_then(|n| n.output_port_mut(&edge.source.port))
        {
            port.detach(edge_id);
        }
        if let Some(port) = self
            .nodes
            .get_mut(&edge.target.node)
            .and_then(|n| n.input_port_mut(&edge.target.port))
        {
            port.detach(edge_id);
        }
        Ok(())
    }

    /// Look up an edge by id
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Edges in registration order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edge_order.iter().filter_map(|id| self.edges.get(id))
    }

    /// Number of registered edges
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Ids of all edges incident to a node, in registration order
    pub fn incident_edges(&self, node_id: &str) -> Vec<EdgeId> {
        self.edge_order
            .iter()
            .filter(|id| {
                self.edges
                    .get(*id)
                    .is_some_and(|e| e.source.node == node_id || e.target.node == node_id)
            })
            .cloned()
            .collect()
    }

    /// All edges incident to a node
    pub fn all_edges_of(&self, node_id: &str) -> Vec<&Edge> {
        self.incident_edges(node_id)
            .iter()
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    /// Distinct nodes fed by this node's output ports, in edge order
    pub fn downstream_of(&self, node_id: &str) -> Vec<NodeId> {
        let mut seen = Vec::new();
        for edge in self.edges() {
            if edge.source.node == node_id && !seen.contains(&edge.target.node) {
                seen.push(edge.target.node.clone());
            }
        }
        seen
    }

    pub(crate) fn resolve_output_port(&self, port: &PortRef) -> Result<&Port> {
        let node = self.require_node(&port.node)?;
        node.output_ports()
            .iter()
            .find(|p| p.id() == port.port)
            .ok_or_else(|| FlowError::UnknownPort {
                node_id: port.node.clone(),
                port_id: port.port.clone(),
            })
    }

    pub(crate) fn resolve_input_port(&self, port: &PortRef) -> Result<&Port> {
        let node = self.require_node(&port.node)?;
        node.input_ports()
            .iter()
            .find(|p| p.id() == port.port)
            .ok_or_else(|| FlowError::UnknownPort {
                node_id: port.node.clone(),
                port_id: port.port.clone(),
            })
    }

    /// Find the first port on `node_id` that could legally connect to `from`.
    ///
    /// Ports are tried in declaration order and the first connectable one
    /// wins; the search direction follows the given port (an input searches
    /// the node's outputs and vice versa). Deterministic by design: callers
    /// rely on this when dropping a dragged port onto a node.
    pub fn find_connectable_port(&self, node_id: &str, from: &PortRef) -> Option<PortRef> {
        let from_node = self.nodes.get(&from.node)?;
        let target = self.nodes.get(node_id)?;
        let from_is_input = from_node.input_ports().iter().any(|p| p.id() == from.port);

        if from_is_input {
            for port in target.output_ports() {
                let candidate = PortRef::new(node_id, port.id());
                if let Ok(conn) = check_connectivity(self, &candidate, from) {
                    if conn.connectable {
                        return Some(candidate);
                    }
                }
            }
        } else {
            for port in target.input_ports() {
                let candidate = PortRef::new(node_id, port.id());
                if let Ok(conn) = check_connectivity(self, from, &candidate) {
                    if conn.connectable {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Selection and z-order
    // -----------------------------------------------------------------------

    /// Add a node to the current selection
    pub fn select_node(&mut self, id: &str) -> Result<()> {
        self.set_node_selected(id, true)
    }

    /// Remove a node from the current selection
    pub fn deselect_node(&mut self, id: &str) -> Result<()> {
        self.set_node_selected(id, false)
    }

    fn set_node_selected(&mut self, id: &str, selected: bool) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_string()))?;
        if node.is_selected() != selected {
            node.set_selected(selected);
            self.emit(FlowEvent::SelectionChanged {
                node_id: id.to_string(),
                selected,
            });
        }
        Ok(())
    }

    /// Focus a node and raise it above all others
    pub fn activate_node(&mut self, id: &str) -> Result<()> {
        let top_layer = self.top_layer + 1;
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_string()))?;
        node.set_active(true);
        node.set_layer(top_layer);
        self.top_layer = top_layer;
        self.emit(FlowEvent::LayerChanged {
            node_id: id.to_string(),
            layer: top_layer,
        });
        Ok(())
    }

    /// Unfocus a node
    pub fn deactivate_node(&mut self, id: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_string()))?;
        node.set_active(false);
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
