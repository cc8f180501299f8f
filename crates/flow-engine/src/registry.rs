//! Node type registry for diagram loading and UI palettes
//!
//! The registry is the open mapping from type-name to constructor the
//! diagram loader uses, plus the metadata a host needs to render a node
//! palette. Registries can be merged, so plugin node kinds compose with the
//! built-in ones.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::NodeBehavior;
use crate::types::NodeCategory;

/// Descriptive metadata for a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Unique type identifier (e.g. "range-filter")
    pub node_type: String,
    /// Category for UI grouping
    pub category: NodeCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the node does
    pub description: String,
}

impl NodeMetadata {
    /// Create node metadata
    pub fn new(
        node_type: impl Into<String>,
        category: NodeCategory,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            category,
            label: label.into(),
            description: description.into(),
        }
    }
}

type BehaviorFactory = Box<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

struct RegistryEntry {
    metadata: NodeMetadata,
    factory: BehaviorFactory,
}

/// Registry of node types with their metadata and constructors
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry preloaded with the built-in node kinds
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register a node type with metadata and a constructor
    pub fn register(
        &mut self,
        metadata: NodeMetadata,
        factory: impl Fn() -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    ) {
        self.entries.insert(
            metadata.node_type.clone(),
            RegistryEntry {
                metadata,
                factory: Box::new(factory),
            },
        );
    }

    /// Construct a fresh behavior for a node type
    pub fn create(&self, node_type: &str) -> Option<Box<dyn NodeBehavior>> {
        self.entries.get(node_type).map(|e| (e.factory)())
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<&NodeMetadata> {
        self.entries.get(node_type).map(|e| &e.metadata)
    }

    /// Get all registered metadata
    pub fn all_metadata(&self) -> Vec<&NodeMetadata> {
        self.entries.values().map(|e| &e.metadata).collect()
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<NodeCategory, Vec<&NodeMetadata>> {
        let mut grouped: HashMap<NodeCategory, Vec<&NodeMetadata>> = HashMap::new();
        for entry in self.entries.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }
        grouped
    }

    /// Check if a node type is registered
    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.entries.contains_key(node_type)
    }

    /// List all registered node type strings
    pub fn node_types(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Merge another registry into this one.
    ///
    /// Entries from `other` override entries in `self` if they share the
    /// same node type.
    pub fn merge(&mut self, other: NodeRegistry) {
        self.entries.extend(other.entries);
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Relay;

    fn test_metadata(node_type: &str) -> NodeMetadata {
        NodeMetadata::new(
            node_type,
            NodeCategory::Filter,
            format!("Test {}", node_type),
            "Test node",
        )
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = NodeRegistry::new();
        registry.register(test_metadata("relay"), || Box::new(Relay::new()));

        assert!(registry.has_node_type("relay"));
        assert!(!registry.has_node_type("unknown"));

        let behavior = registry.create("relay").unwrap();
        assert_eq!(behavior.node_type(), "relay");
        assert!(registry.create("unknown").is_none());
    }

    #[test]
    fn test_all_metadata() {
        let mut registry = NodeRegistry::new();
        registry.register(test_metadata("node-a"), || Box::new(Relay::new()));
        registry.register(test_metadata("node-b"), || Box::new(Relay::new()));

        assert_eq!(registry.all_metadata().len(), 2);
        assert_eq!(registry.node_types().len(), 2);
    }

    #[test]
    fn test_merge_override() {
        let mut registry1 = NodeRegistry::new();
        let mut meta1 = test_metadata("node-a");
        meta1.label = "Original".to_string();
        registry1.register(meta1, || Box::new(Relay::new()));

        let mut registry2 = NodeRegistry::new();
        let mut meta2 = test_metadata("node-a");
        meta2.label = "Override".to_string();
        registry2.register(meta2, || Box::new(Relay::new()));
        registry2.register(test_metadata("node-b"), || Box::new(Relay::new()));

        registry1.merge(registry2);
        assert_eq!(registry1.all_metadata().len(), 2);
        assert_eq!(registry1.get_metadata("node-a").unwrap().label, "Override");
    }

    #[test]
    fn test_metadata_by_category() {
        let mut registry = NodeRegistry::new();
        let mut source = test_metadata("source");
        source.category = NodeCategory::Source;
        registry.register(source, || Box::new(Relay::new()));
        registry.register(test_metadata("filter"), || Box::new(Relay::new()));

        let grouped = registry.metadata_by_category();
        assert_eq!(grouped.get(&NodeCategory::Source).unwrap().len(), 1);
        assert_eq!(grouped.get(&NodeCategory::Filter).unwrap().len(), 1);
    }

    #[test]
    fn test_builtins_registered() {
        let registry = NodeRegistry::with_builtins();
        for node_type in ["data-source", "range-filter", "visual-editor", "histogram"] {
            assert!(registry.has_node_type(node_type), "missing {}", node_type);
        }
    }
}
