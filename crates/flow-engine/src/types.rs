//! Core types for dataflow graphs
//!
//! These types define the vocabulary of the graph: node, edge and port
//! identifiers, port typing and arity, and port endpoint references.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Unique identifier for a port (unique within its owning node)
pub type PortId = String;

/// The data type carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    /// A subset of data items with optional per-item visual attributes
    Subset,
    /// A subset that represents interactive selection state
    Selection,
    /// Accepts or produces any type
    Any,
}

impl PortType {
    /// Check whether a port producing `self` can feed a port accepting `other`.
    ///
    /// `Any` is compatible with everything. A `Selection` output may feed a
    /// `Subset` input (a selection is itself a row subset); the reverse
    /// coercion is not allowed. All other pairs require an exact match.
    pub fn is_compatible_with(&self, other: &PortType) -> bool {
        // Any type is compatible with everything
        if matches!(self, PortType::Any) || matches!(other, PortType::Any) {
            return true;
        }

        // A selection can be consumed as a plain subset
        if matches!(self, PortType::Selection) && matches!(other, PortType::Subset) {
            return true;
        }

        // Exact type match
        self == other
    }
}

/// How many connections a port accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortArity {
    /// At most one connected edge
    Single,
    /// Any number of connected edges
    Multiple,
}

/// Declaration of a port (input or output)
///
/// Node behaviors declare their ports as specs; the concrete ports are built
/// from these at node construction and never resized afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Unique identifier for this port
    pub id: PortId,
    /// Human-readable label
    pub label: String,
    /// Data type of the port
    pub port_type: PortType,
    /// Connection arity
    pub arity: PortArity,
}

impl PortSpec {
    /// Create a single-connection port
    pub fn single(id: impl Into<String>, label: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            port_type,
            arity: PortArity::Single,
        }
    }

    /// Create a multiple-connection port
    pub fn multiple(id: impl Into<String>, label: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            port_type,
            arity: PortArity::Multiple,
        }
    }
}

/// Address of a port: owning node id plus port id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    /// The owning node
    pub node: NodeId,
    /// The port on that node
    pub port: PortId,
}

impl PortRef {
    /// Create a new port reference
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

/// Category of a node, used for UI palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Data source nodes
    Source,
    /// Filter nodes (subset reduction)
    Filter,
    /// Editor nodes (attribute assignment)
    Editor,
    /// Visualization nodes
    Visualization,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_type_compatibility() {
        assert!(PortType::Any.is_compatible_with(&PortType::Subset));
        assert!(PortType::Subset.is_compatible_with(&PortType::Any));
        assert!(PortType::Subset.is_compatible_with(&PortType::Subset));
        assert!(PortType::Selection.is_compatible_with(&PortType::Subset));
        assert!(!PortType::Subset.is_compatible_with(&PortType::Selection));
    }

    #[test]
    fn test_port_spec_constructors() {
        let input = PortSpec::single("in", "Input", PortType::Subset);
        assert_eq!(input.id, "in");
        assert_eq!(input.arity, PortArity::Single);

        let output = PortSpec::multiple("out", "Output", PortType::Subset);
        assert_eq!(output.arity, PortArity::Multiple);
    }

    #[test]
    fn test_port_ref_display() {
        let port = PortRef::new("filter-1", "out");
        assert_eq!(port.to_string(), "filter-1:out");
    }
}
