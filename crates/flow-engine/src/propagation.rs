//! The propagation scheduler
//!
//! `Graph::propagate` runs one scheduler-driven update sweep: it collects
//! the nodes reachable forward from the start set, orders them
//! topologically, and updates each dirty node exactly once, delivering fresh
//! output packages downstream as it goes.
//!
//! # Scheduling policy
//!
//! - Within one pass, every node is visited at most once and strictly after
//!   all of its upstream producers in the same pass (topological guarantee).
//! - When several nodes are ready, the one created earliest runs first, so
//!   the order is deterministic across runs.
//! - Single pass, no revisit: a node already visited is not revisited even
//!   if it is marked dirty again during the pass; it stays dirty and is
//!   picked up by the next pass. This bounds every pass and is a documented
//!   policy, not an implementation accident.
//! - A node whose update routine fails keeps its previous (last-good) output
//!   packages; the failure is surfaced as an event and the pass continues
//!   with the remaining nodes.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use uuid::Uuid;

use crate::error::FlowError;
use crate::events::FlowEvent;
use crate::graph::Graph;
use crate::package::Package;
use crate::types::{EdgeId, NodeId, PortRef};

/// A node whose update routine failed during a pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpdate {
    /// The failing node
    pub node_id: NodeId,
    /// The reason reported by the update routine
    pub reason: String,
}

/// Outcome of one propagation pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationReport {
    /// Identifier of this pass, also carried by the pass's events
    pub pass_id: String,
    /// Every node visited, in visit order
    pub visited: Vec<NodeId>,
    /// Nodes whose update routine ran successfully, in visit order
    pub updated: Vec<NodeId>,
    /// Nodes whose update routine failed
    pub failed: Vec<FailedUpdate>,
}

impl PropagationReport {
    /// True when no node failed during the pass
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Graph {
    /// Run one propagation pass starting from the given nodes.
    ///
    /// Unknown start ids are logged and skipped. Returns a report of what
    /// the pass visited, updated and failed.
    pub fn propagate(&mut self, start: &[NodeId]) -> PropagationReport {
        let pass_id = Uuid::new_v4().to_string();

        // Forward-reachable set from the start nodes, inclusive.
        let mut reach: HashSet<NodeId> = HashSet::new();
        let mut sources: Vec<NodeId> = Vec::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for id in start {
            if self.node(id).is_none() {
                log::warn!("propagate: unknown start node '{}'", id);
                continue;
            }
            if reach.insert(id.clone()) {
                sources.push(id.clone());
                queue.push_back(id.clone());
            }
        }
        while let Some(current) = queue.pop_front() {
            for next in self.downstream_of(&current) {
                if reach.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }

        self.emit(FlowEvent::PropagationStarted {
            pass_id: pass_id.clone(),
            sources,
        });

        // Kahn's algorithm restricted to the reachable set; each edge inside
        // the set contributes one unit of in-degree.
        let mut in_degree: HashMap<NodeId, usize> = reach.iter().map(|id| (id.clone(), 0)).collect();
        for edge in self.edges() {
            if reach.contains(&edge.source.node) && reach.contains(&edge.target.node) {
                if let Some(degree) = in_degree.get_mut(&edge.target.node) {
                    *degree += 1;
                }
            }
        }

        // Ties among ready nodes break by ascending creation order.
        let mut ready: BinaryHeap<Reverse<(u64, NodeId)>> = BinaryHeap::new();
        for (id, &degree) in &in_degree {
            if degree == 0 {
                if let Some(node) = self.node(id) {
                    ready.push(Reverse((node.seq(), id.clone())));
                }
            }
        }

        let mut visited: Vec<NodeId> = Vec::new();
        let mut updated: Vec<NodeId> = Vec::new();
        let mut failed: Vec<FailedUpdate> = Vec::new();

        while let Some(Reverse((_, id))) = ready.pop() {
            visited.push(id.clone());

            let dirty = self.node(&id).is_some_and(|n| n.is_dirty());
            if dirty {
                let result = match self.node_mut(&id) {
                    Some(node) => node.run_update(),
                    None => Ok(()),
                };
                match result {
                    Ok(()) => {
                        updated.push(id.clone());
                        self.emit(FlowEvent::NodeUpdated {
                            node_id: id.clone(),
                            pass_id: pass_id.clone(),
                        });
                        self.deliver_outputs(&id);
                    }
                    Err(err) => {
                        let reason = match err {
                            FlowError::UpdateFailed { reason, .. } => reason,
                            other => other.to_string(),
                        };
                        log::error!("update of node '{}' failed: {}", id, reason);
                        self.emit(FlowEvent::NodeFailed {
                            node_id: id.clone(),
                            pass_id: pass_id.clone(),
                            error: reason.clone(),
                        });
                        failed.push(FailedUpdate {
                            node_id: id.clone(),
                            reason,
                        });
                    }
                }
                // The pass consumed this node's dirty flags either way.
                if let Some(node) = self.node_mut(&id) {
                    node.clear_updated_ports();
                }
            }

            // Release downstream nodes inside the reachable set.
            let mut released: Vec<(u64, NodeId)> = Vec::new();
            for edge in self.edges() {
                if edge.source.node != id || !reach.contains(&edge.target.node) {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(&edge.target.node) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(node) = self.node(&edge.target.node) {
                            released.push((node.seq(), edge.target.node.clone()));
                        }
                    }
                }
            }
            for entry in released {
                ready.push(Reverse(entry));
            }
        }

        self.emit(FlowEvent::PropagationCompleted {
            pass_id: pass_id.clone(),
            updated: updated.len(),
        });

        PropagationReport {
            pass_id,
            visited,
            updated,
            failed,
        }
    }

    /// Deliver freshly produced packages to the input ports downstream.
    ///
    /// Only output ports whose package-updated flag is set deliver; each
    /// connected input port receives its own clone, keyed by the edge.
    fn deliver_outputs(&mut self, node_id: &str) {
        let mut deliveries: Vec<(EdgeId, PortRef, Package)> = Vec::new();
        if let Some(node) = self.node(node_id) {
            for port in node.output_ports() {
                if !port.is_package_updated() {
                    continue;
                }
                let Some(package) = port.package() else {
                    continue;
                };
                for edge_id in port.edges() {
                    if let Some(edge) = self.edge(edge_id) {
                        deliveries.push((edge_id.clone(), edge.target.clone(), package.clone()));
                    }
                }
            }
        }
        for (edge_id, target, package) in deliveries {
            if let Some(port) = self
                .node_mut(&target.node)
                .and_then(|n| n.input_port_mut(&target.port))
            {
                port.deliver(&edge_id, package);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::events::VecEventSink;
    use crate::testing::{Emitter, FailSwitch, Relay};
    use crate::types::{PortSpec, PortType};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn emitter(items: impl IntoIterator<Item = usize>) -> Box<Emitter> {
        Box::new(Emitter::new(Package::from_items(None, items)))
    }

    /// A -> B, A -> C, B -> D, C -> D
    fn make_diamond() -> Graph {
        let mut graph = Graph::new();
        graph.add_node("a", emitter([0, 1, 2])).unwrap();
        graph.add_node("b", Box::new(Relay::new())).unwrap();
        graph.add_node("c", Box::new(Relay::new())).unwrap();
        graph
            .add_node(
                "d",
                Box::new(Relay::with_ports(
                    vec![PortSpec::multiple("in", "Input", PortType::Subset)],
                    vec![PortSpec::multiple("out", "Output", PortType::Subset)],
                )),
            )
            .unwrap();
        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("a", "out"), PortRef::new("c", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("b", "out"), PortRef::new("d", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("c", "out"), PortRef::new("d", "in"))
            .unwrap();
        graph
    }

    #[test]
    fn test_diamond_updates_sink_once_after_both_branches() {
        init_logging();
        let mut graph = make_diamond();
        graph.touch("a").unwrap();

        let report = graph.propagate(&["a".to_string()]);
        assert_eq!(report.updated, vec!["a", "b", "c", "d"]);

        // d exactly once, strictly after both b and c
        let pos = |id: &str| report.visited.iter().position(|n| n == id).unwrap();
        assert_eq!(report.visited.iter().filter(|n| *n == "d").count(), 1);
        assert!(pos("d") > pos("b"));
        assert!(pos("d") > pos("c"));

        // both deliveries arrived and were merged
        let out = graph.node("d").unwrap().get_output_port("out").unwrap();
        assert_eq!(out.package().unwrap().item_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn test_diamond_order_independent_of_dirty_source() {
        // dirty b first, then c: d still waits for both
        let mut graph = make_diamond();
        graph.touch("b").unwrap();
        graph.touch("c").unwrap();

        let report = graph.propagate(&["c".to_string(), "b".to_string()]);
        let pos = |id: &str| report.visited.iter().position(|n| n == id).unwrap();
        assert!(pos("d") > pos("b"));
        assert!(pos("d") > pos("c"));
        assert_eq!(report.visited.iter().filter(|n| *n == "d").count(), 1);
    }

    #[test]
    fn test_nothing_dirty_updates_nothing() {
        let mut graph = make_diamond();
        graph.touch("a").unwrap();
        graph.propagate(&["a".to_string()]);

        // flags were consumed; a second pass is a no-op
        let report = graph.propagate(&["a".to_string()]);
        assert!(report.updated.is_empty());
        assert_eq!(report.visited.len(), 4);
    }

    #[test]
    fn test_propagation_only_flows_forward() {
        let mut graph = Graph::new();
        graph.add_node("a", emitter([0])).unwrap();
        graph.add_node("b", Box::new(Relay::new())).unwrap();
        graph.add_node("c", Box::new(Relay::new())).unwrap();
        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("b", "out"), PortRef::new("c", "in"))
            .unwrap();
        graph.touch("a").unwrap();
        graph.propagate(&["a".to_string()]);

        graph.touch("b").unwrap();
        let report = graph.propagate(&["b".to_string()]);
        assert_eq!(report.visited, vec!["b", "c"]);
        assert!(!report.visited.contains(&"a".to_string()));
    }

    #[test]
    fn test_duplicate_start_nodes_visit_once() {
        let mut graph = make_diamond();
        graph.touch("a").unwrap();
        let report = graph.propagate(&["a".to_string(), "a".to_string()]);
        assert_eq!(report.visited.iter().filter(|n| *n == "a").count(), 1);
    }

    #[test]
    fn test_unknown_start_node_is_skipped() {
        let mut graph = make_diamond();
        let report = graph.propagate(&["missing".to_string()]);
        assert!(report.visited.is_empty());
        assert!(report.updated.is_empty());
    }

    #[test]
    fn test_ready_ties_break_by_creation_order() {
        let mut graph = Graph::new();
        // creation order deliberately differs from alphabetical order
        graph.add_node("zeta", emitter([0])).unwrap();
        graph.add_node("yank", emitter([1])).unwrap();
        graph.add_node("alpha", emitter([2])).unwrap();
        for id in ["zeta", "yank", "alpha"] {
            graph.touch(id).unwrap();
        }

        let report = graph.propagate(&[
            "alpha".to_string(),
            "yank".to_string(),
            "zeta".to_string(),
        ]);
        assert_eq!(report.visited, vec!["zeta", "yank", "alpha"]);
    }

    #[test]
    fn test_failed_node_keeps_last_good_output_and_pass_continues() {
        init_logging();
        let sink = Arc::new(VecEventSink::new());
        let mut graph = Graph::with_event_sink(sink.clone());
        graph.add_node("src", emitter([0, 1])).unwrap();
        graph.add_node("mid", Box::new(FailSwitch::new())).unwrap();
        graph.add_node("end", Box::new(Relay::new())).unwrap();
        graph
            .connect(PortRef::new("src", "out"), PortRef::new("mid", "in"))
            .unwrap();
        graph
            .connect(PortRef::new("mid", "out"), PortRef::new("end", "in"))
            .unwrap();

        graph.touch("src").unwrap();
        let report = graph.propagate(&["src".to_string()]);
        assert!(report.is_clean());
        let good = graph
            .node("mid")
            .unwrap()
            .get_output_port("out")
            .unwrap()
            .package()
            .cloned()
            .unwrap();
        assert_eq!(good.item_indices(), vec![0, 1]);

        // switch the middle node into failing mode and push new data through
        graph
            .node_mut("mid")
            .unwrap()
            .behavior_as_mut::<FailSwitch>()
            .unwrap()
            .set_failing(true);
        graph
            .node_mut("src")
            .unwrap()
            .behavior_as_mut::<Emitter>()
            .unwrap()
            .set_package(Package::from_items(None, [7, 8, 9]));
        graph.touch("src").unwrap();

        let report = graph.propagate(&["src".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].node_id, "mid");
        // last-good output survives the failure
        let kept = graph
            .node("mid")
            .unwrap()
            .get_output_port("out")
            .unwrap()
            .package()
            .cloned()
            .unwrap();
        assert_eq!(kept.item_indices(), vec![0, 1]);
        // the pass still visited the remaining node
        assert!(report.visited.contains(&"end".to_string()));
        // failure surfaced to collaborators
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, FlowEvent::NodeFailed { node_id, .. } if node_id == "mid")));
    }

    #[test]
    fn test_failed_node_consumes_dirty_flags() {
        let mut graph = Graph::new();
        graph.add_node("src", emitter([0])).unwrap();
        graph.add_node("mid", Box::new(FailSwitch::new())).unwrap();
        graph
            .connect(PortRef::new("src", "out"), PortRef::new("mid", "in"))
            .unwrap();
        graph
            .node_mut("mid")
            .unwrap()
            .behavior_as_mut::<FailSwitch>()
            .unwrap()
            .set_failing(true);
        graph.touch("src").unwrap();

        graph.propagate(&["src".to_string()]);
        // Dirty -> Updating -> Idle happened once; the failure does not leave
        // the node permanently dirty
        assert!(!graph.node("mid").unwrap().is_dirty());
    }

    #[test]
    fn test_events_carry_one_pass_id() {
        let sink = Arc::new(VecEventSink::new());
        let mut graph = Graph::with_event_sink(sink.clone());
        graph.add_node("a", emitter([0])).unwrap();
        graph.add_node("b", Box::new(Relay::new())).unwrap();
        graph
            .connect(PortRef::new("a", "out"), PortRef::new("b", "in"))
            .unwrap();
        graph.touch("a").unwrap();

        let report = graph.propagate(&["a".to_string()]);

        let events = sink.events();
        let mut updated = 0;
        for event in &events {
            match event {
                FlowEvent::PropagationStarted { pass_id, .. }
                | FlowEvent::PropagationCompleted { pass_id, .. }
                | FlowEvent::NodeFailed { pass_id, .. } => assert_eq!(*pass_id, report.pass_id),
                FlowEvent::NodeUpdated { pass_id, .. } => {
                    assert_eq!(*pass_id, report.pass_id);
                    updated += 1;
                }
                _ => {}
            }
        }
        assert_eq!(updated, 2);
        assert!(matches!(
            events.last(),
            Some(FlowEvent::PropagationCompleted { updated: 2, .. })
        ));
    }
}
