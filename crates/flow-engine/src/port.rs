//! Connection endpoints owned by nodes
//!
//! A `Port` tracks its connected edges, the packages it holds, and the two
//! dirty flags the scheduler consumes: *package-updated* (payload changed)
//! and *connection-updated* (edge set changed since last check).
//!
//! The connection-updated flag is derived: it compares the current edge set
//! against the edge set recorded at the last `clear_connection_update`. This
//! makes connecting and immediately disconnecting an edge restore the port's
//! pre-connect flag state without any extra bookkeeping.

use serde::{Deserialize, Serialize};

use crate::package::Package;
use crate::types::{EdgeId, PortArity, PortId, PortSpec, PortType};

/// Whether a port receives or produces packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// Receives packages from upstream output ports
    Input,
    /// Produces packages during the owning node's update
    Output,
}

/// A typed connection endpoint owned by exactly one node
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    label: String,
    direction: PortDirection,
    port_type: PortType,
    arity: PortArity,
    /// Connected edges, in connection order.
    edges: Vec<EdgeId>,
    /// Edge set at the last connection-update clear.
    consumed_edges: Vec<EdgeId>,
    /// Produced package (output ports only).
    package: Option<Package>,
    /// Delivered packages keyed by incoming edge, in edge order (input ports only).
    incoming: Vec<(EdgeId, Package)>,
    package_updated: bool,
}

impl Port {
    /// Build a port from its spec
    pub(crate) fn from_spec(spec: &PortSpec, direction: PortDirection) -> Self {
        Self {
            id: spec.id.clone(),
            label: spec.label.clone(),
            direction,
            port_type: spec.port_type,
            arity: spec.arity,
            edges: Vec::new(),
            consumed_edges: Vec::new(),
            package: None,
            incoming: Vec::new(),
            package_updated: false,
        }
    }

    /// Port identifier, unique within the owning node
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Input or output
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Data type of the port
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    /// Connection arity
    pub fn arity(&self) -> PortArity {
        self.arity
    }

    /// Connected edge ids, in connection order
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Whether at least one edge is connected
    pub fn is_connected(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Number of connected edges
    pub fn num_connections(&self) -> usize {
        self.edges.len()
    }

    /// Whether the port could accept one more connection
    pub fn has_capacity(&self) -> bool {
        self.arity == PortArity::Multiple || self.edges.is_empty()
    }

    /// Record a newly registered edge. Arity is validated by the caller.
    pub(crate) fn attach(&mut self, edge: EdgeId) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Remove an edge; no-op if not present.
    ///
    /// For input ports, the package delivered over that edge is dropped,
    /// which counts as a package update.
    pub(crate) fn detach(&mut self, edge: &str) {
        self.edges.retain(|e| e != edge);
        let before = self.incoming.len();
        self.incoming.retain(|(e, _)| e != edge);
        if self.incoming.len() != before {
            self.package_updated = true;
        }
    }

    /// The package this port currently holds.
    ///
    /// For output ports this is the produced package; for input ports, the
    /// package delivered over the first connected edge.
    pub fn package(&self) -> Option<&Package> {
        match self.direction {
            PortDirection::Output => self.package.as_ref(),
            PortDirection::Input => self.incoming.first().map(|(_, pkg)| pkg),
        }
    }

    /// All packages this port holds, in edge order.
    ///
    /// Single-arity input ports hold at most one; how multiple packages are
    /// merged is the owning node's policy.
    pub fn packages(&self) -> Vec<&Package> {
        match self.direction {
            PortDirection::Output => self.package.iter().collect(),
            PortDirection::Input => self.incoming.iter().map(|(_, pkg)| pkg).collect(),
        }
    }

    /// Replace the produced package of an output port
    pub(crate) fn set_package(&mut self, package: Package) {
        match self.direction {
            PortDirection::Output => {
                self.package = Some(package);
                self.package_updated = true;
            }
            PortDirection::Input => {
                log::error!("set_package called on input port '{}'", self.id);
            }
        }
    }

    /// Deliver a package into an input port over the given edge.
    ///
    /// Replaces any package previously delivered over the same edge.
    pub(crate) fn deliver(&mut self, edge: &str, package: Package) {
        match self.direction {
            PortDirection::Input => {
                if let Some(slot) = self.incoming.iter_mut().find(|(e, _)| e == edge) {
                    slot.1 = package;
                } else {
                    self.incoming.push((edge.to_string(), package));
                }
                self.package_updated = true;
            }
            PortDirection::Output => {
                log::error!("deliver called on output port '{}'", self.id);
            }
        }
    }

    /// Whether the held package changed since the last clear
    pub fn is_package_updated(&self) -> bool {
        self.package_updated
    }

    /// Whether the edge set changed since the last clear
    pub fn is_connection_updated(&self) -> bool {
        let mut current = self.edges.clone();
        let mut consumed = self.consumed_edges.clone();
        current.sort_unstable();
        consumed.sort_unstable();
        current != consumed
    }

    /// Either dirty flag set
    pub fn is_updated(&self) -> bool {
        self.is_package_updated() || self.is_connection_updated()
    }

    /// Mark the package update as consumed
    pub fn clear_package_update(&mut self) {
        self.package_updated = false;
    }

    /// Mark the current edge set as consumed
    pub fn clear_connection_update(&mut self) {
        self.consumed_edges = self.edges.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_port() -> Port {
        Port::from_spec(
            &PortSpec::single("in", "Input", PortType::Subset),
            PortDirection::Input,
        )
    }

    fn output_port() -> Port {
        Port::from_spec(
            &PortSpec::multiple("out", "Output", PortType::Subset),
            PortDirection::Output,
        )
    }

    #[test]
    fn test_attach_detach_roundtrip_restores_flags() {
        let mut port = input_port();
        assert!(!port.is_connection_updated());

        port.attach("edge-1".to_string());
        assert!(port.is_connection_updated());

        port.detach("edge-1");
        assert!(!port.is_connection_updated());
        assert!(!port.is_package_updated());
        assert!(!port.is_connected());
    }

    #[test]
    fn test_roundtrip_preserves_preexisting_flag() {
        let mut port = input_port();
        port.attach("edge-1".to_string());
        // flag already set from edge-1, never consumed
        port.attach("edge-2".to_string());
        port.detach("edge-2");
        assert!(port.is_connection_updated());
    }

    #[test]
    fn test_clear_connection_update_consumes_edge_set() {
        let mut port = input_port();
        port.attach("edge-1".to_string());
        port.clear_connection_update();
        assert!(!port.is_connection_updated());

        port.detach("edge-1");
        assert!(port.is_connection_updated());
    }

    #[test]
    fn test_deliver_replaces_per_edge() {
        let mut port = Port::from_spec(
            &PortSpec::multiple("in", "Input", PortType::Subset),
            PortDirection::Input,
        );
        port.attach("e1".to_string());
        port.attach("e2".to_string());

        port.deliver("e1", Package::from_items(None, [0]));
        port.deliver("e2", Package::from_items(None, [1]));
        port.deliver("e1", Package::from_items(None, [2]));

        let packages = port.packages();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].item_indices(), vec![2]);
        assert_eq!(packages[1].item_indices(), vec![1]);
        assert!(port.is_package_updated());
    }

    #[test]
    fn test_detach_drops_delivered_package() {
        let mut port = input_port();
        port.attach("e1".to_string());
        port.deliver("e1", Package::from_items(None, [0, 1]));
        port.clear_package_update();

        port.detach("e1");
        assert!(port.package().is_none());
        // dropping real data counts as a package update
        assert!(port.is_package_updated());
    }

    #[test]
    fn test_output_set_package() {
        let mut port = output_port();
        assert!(port.package().is_none());

        port.set_package(Package::from_items(None, [3]));
        assert!(port.is_package_updated());
        assert_eq!(port.package().unwrap().item_indices(), vec![3]);

        port.clear_package_update();
        assert!(!port.is_package_updated());
    }

    #[test]
    fn test_capacity() {
        let mut single = input_port();
        assert!(single.has_capacity());
        single.attach("e1".to_string());
        assert!(!single.has_capacity());

        let mut multiple = Port::from_spec(
            &PortSpec::multiple("in", "Input", PortType::Subset),
            PortDirection::Input,
        );
        multiple.attach("e1".to_string());
        assert!(multiple.has_capacity());
    }
}
