//! Error types for the dataflow engine

use thiserror::Error;

use crate::connectivity::ConnectivityViolation;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur in the dataflow engine
#[derive(Debug, Error)]
pub enum FlowError {
    /// An attempted connection was rejected by the connectivity check
    #[error("connection rejected: {0}")]
    ConnectionRejected(#[from] ConnectivityViolation),

    /// A node cannot be removed while edges are attached to it
    #[error("node '{node_id}' still has {edges} connected edge(s)")]
    NodeHasConnections { node_id: String, edges: usize },

    /// A node with this id is already registered
    #[error("a node with id '{0}' already exists")]
    DuplicateNode(String),

    /// Lookup of a node id that is not registered
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// Lookup of an edge id that is not registered
    #[error("unknown edge '{0}'")]
    UnknownEdge(String),

    /// A port id does not exist on the referenced node
    #[error("port '{port_id}' does not exist on node '{node_id}'")]
    UnknownPort { node_id: String, port_id: String },

    /// A node type string has no registry entry
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A node's update routine failed; isolated per node by the scheduler
    #[error("update of node '{node_id}' failed: {reason}")]
    UpdateFailed { node_id: String, reason: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A diagram snapshot could not be loaded
    #[error("malformed diagram: {0}")]
    MalformedDiagram(String),

    /// Snapshot compression error
    #[error("compression error: {0}")]
    Compression(String),
}

impl FlowError {
    /// Create an update-failed error for the given node
    pub fn failed(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpdateFailed {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-diagram error with a message
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedDiagram(reason.into())
    }
}
