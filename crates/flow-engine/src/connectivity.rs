//! Edge connectivity validation
//!
//! `check_connectivity` is the single predicate consulted before any edge is
//! created: by `Graph::connect`, by `Graph::find_connectable_port` (the
//! deterministic first-match search), and by the diagram loader when
//! validating a snapshot's edge list.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::graph::Graph;
use crate::types::{NodeId, PortId, PortRef, PortType};

/// Reason a candidate connection is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConnectivityViolation {
    /// Both endpoints belong to the same node
    #[error("both ports belong to node '{node_id}'")]
    SameNode { node_id: NodeId },

    /// An edge between these two ports already exists
    #[error("ports are already connected")]
    AlreadyConnected,

    /// The output port's type cannot feed the input port's type
    #[error("incompatible port types: {source_type:?} cannot feed {target:?}")]
    IncompatibleTypes {
        #[serde(rename = "source")]
        source_type: PortType,
        target: PortType,
    },

    /// The input port is single-arity and already connected
    #[error("input port '{port_id}' on node '{node_id}' does not accept further connections")]
    ArityExceeded { node_id: NodeId, port_id: PortId },

    /// The edge would close a cycle in the node graph
    #[error("connection would close a cycle")]
    CycleRejected,
}

/// Result of a connectivity check
#[derive(Debug, Clone, PartialEq)]
pub struct Connectivity {
    /// Whether the edge may be created
    pub connectable: bool,
    /// Reason code when not connectable
    pub reason: Option<ConnectivityViolation>,
}

impl Connectivity {
    fn connectable() -> Self {
        Self {
            connectable: true,
            reason: None,
        }
    }

    fn rejected(reason: ConnectivityViolation) -> Self {
        Self {
            connectable: false,
            reason: Some(reason),
        }
    }

    /// Convert into a `Result`, surfacing the rejection reason as an error
    pub fn into_result(self) -> Result<()> {
        match self.reason {
            None => Ok(()),
            Some(reason) => Err(reason.into()),
        }
    }
}

/// Check whether an edge from `output` to `input` may be created.
///
/// Checks run in a fixed order and the first failure wins: same owning node,
/// duplicate edge, type compatibility, input arity, cycle. Resolving either
/// endpoint fails with `UnknownNode`/`UnknownPort` — that is a caller error,
/// not a connectivity verdict.
pub fn check_connectivity(graph: &Graph, output: &PortRef, input: &PortRef) -> Result<Connectivity> {
    let source_port = graph.resolve_output_port(output)?;
    let target_port = graph.resolve_input_port(input)?;

    if output.node == input.node {
        return Ok(Connectivity::rejected(ConnectivityViolation::SameNode {
            node_id: output.node.clone(),
        }));
    }

    // The same edge id appears on both endpoints when already connected.
    let target_edges: HashSet<&String> = target_port.edges().iter().collect();
    if source_port.edges().iter().any(|e| target_edges.contains(e)) {
        return Ok(Connectivity::rejected(ConnectivityViolation::AlreadyConnected));
    }

    if !source_port.port_type().is_compatible_with(&target_port.port_type()) {
        return Ok(Connectivity::rejected(ConnectivityViolation::IncompatibleTypes {
            source_type: source_port.port_type(),
            target: target_port.port_type(),
        }));
    }

    if !target_port.has_capacity() {
        return Ok(Connectivity::rejected(ConnectivityViolation::ArityExceeded {
            node_id: input.node.clone(),
            port_id: input.port.clone(),
        }));
    }

    if reaches(graph, &input.node, &output.node) {
        return Ok(Connectivity::rejected(ConnectivityViolation::CycleRejected));
    }

    Ok(Connectivity::connectable())
}

/// Whether `to` is forward-reachable from `from` along existing edges
fn reaches(graph: &Graph, from: &str, to: &str) -> bool {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(from.to_string());

    while let Some(current) = queue.pop_front() {
        if current == to {
            return true;
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        for next in graph.downstream_of(&current) {
            queue.push_back(next);
        }
    }
    false
}
