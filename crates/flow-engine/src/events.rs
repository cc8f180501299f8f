//! Events raised to collaborators
//!
//! The engine reports propagation progress, node failures and interaction
//! state changes through an `EventSink`. The sink abstracts over the
//! transport (UI channel, test buffer, ...) so the engine stays independent
//! of any host.

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Trait for receiving engine events
pub trait EventSink: Send + Sync {
    /// Receive an event.
    ///
    /// Called synchronously from the engine; implementations must not block.
    fn send(&self, event: FlowEvent);
}

/// Events emitted by the graph and the propagation scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    /// A propagation pass started
    #[serde(rename_all = "camelCase")]
    PropagationStarted {
        pass_id: String,
        sources: Vec<NodeId>,
    },

    /// A propagation pass finished
    #[serde(rename_all = "camelCase")]
    PropagationCompleted { pass_id: String, updated: usize },

    /// A node recomputed its output packages; collaborators should re-render
    #[serde(rename_all = "camelCase")]
    NodeUpdated { node_id: NodeId, pass_id: String },

    /// A node's update routine failed; its last-good outputs remain in place
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        node_id: NodeId,
        pass_id: String,
        error: String,
    },

    /// A node's selection state changed
    #[serde(rename_all = "camelCase")]
    SelectionChanged { node_id: NodeId, selected: bool },

    /// A node's z-order layer changed
    #[serde(rename_all = "camelCase")]
    LayerChanged { node_id: NodeId, layer: i64 },
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: FlowEvent) {}
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<FlowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: FlowEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(FlowEvent::SelectionChanged {
            node_id: "node-1".to_string(),
            selected: true,
        });

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            FlowEvent::SelectionChanged { node_id, selected } => {
                assert_eq!(node_id, "node-1");
                assert!(selected);
            }
            _ => panic!("Expected SelectionChanged event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = FlowEvent::NodeUpdated {
            node_id: "histogram-1".to_string(),
            pass_id: "pass".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nodeUpdated");
        assert_eq!(json["nodeId"], "histogram-1");
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(FlowEvent::PropagationCompleted {
            pass_id: "pass".to_string(),
            updated: 0,
        });
    }
}
