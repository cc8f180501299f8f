//! Nodes: port ownership, update lifecycle, serialization chain
//!
//! A `Node` pairs engine-owned state (identity, ports, layout, dirty
//! tracking, the serialization chain) with a boxed `NodeBehavior` that
//! supplies the node kind's port declarations and its `update` routine.
//!
//! # Serialization chain
//!
//! Every node carries an explicit ordered list of (save, restore) function
//! pairs. `Node::new` pushes the core pair covering engine-owned fields;
//! `NodeBehavior::extend_chain` then appends the behavior's pairs, base
//! contract first, specialization after. `serialize` folds all save
//! functions into a single record where the last writer of a field wins;
//! `deserialize` hands the full record to every restore function, each
//! reading only the fields it owns. Transient interaction state (selection,
//! activation) is touched by no chain function and does not round-trip.

use std::any::Any;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::package::Package;
use crate::port::{Port, PortDirection};
use crate::types::{NodeId, PortId, PortSpec};

/// Default node width when no saved layout is restored
pub const DEFAULT_NODE_WIDTH: f64 = 50.0;
/// Default node height when no saved layout is restored
pub const DEFAULT_NODE_HEIGHT: f64 = 50.0;

/// A save function: contributes fields to the node's save record
pub type SaveFn = fn(&Node) -> Map<String, Value>;
/// A restore function: reads its own fields back out of the full save record
pub type RestoreFn = fn(&mut Node, &Map<String, Value>) -> Result<()>;

/// Ordered list of (save, restore) pairs composing a node's persisted state
#[derive(Default)]
pub struct SerializationChain {
    entries: Vec<(SaveFn, RestoreFn)>,
}

impl SerializationChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a (save, restore) pair to the chain
    pub fn push(&mut self, save: SaveFn, restore: RestoreFn) {
        self.entries.push((save, restore));
    }

    /// Number of pairs in the chain
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no pair has been pushed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The polymorphic capability of a node kind
///
/// Implementations declare the node's fixed port layout, define how output
/// packages are computed from input packages, and may append pairs to the
/// serialization chain for their own parameters.
pub trait NodeBehavior: Any {
    /// Type discriminator used by the serialization registry
    fn node_type(&self) -> &'static str;

    /// Input port declarations, in declaration order
    fn input_ports(&self) -> Vec<PortSpec>;

    /// Output port declarations, in declaration order
    fn output_ports(&self) -> Vec<PortSpec>;

    /// Recompute output packages from the current input packages.
    ///
    /// Runs to completion synchronously; the only legal writes are the
    /// node's own outputs via `UpdateContext::set_output`. An error leaves
    /// the node's previous output packages in place.
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()>;

    /// Append this behavior's (save, restore) pairs to the chain
    fn extend_chain(&self, _chain: &mut SerializationChain) {}

    /// Upcast for chain functions reaching concrete behavior state
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for chain functions reaching concrete behavior state
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Snapshot of one input port taken before an update runs
pub(crate) struct InputState {
    id: PortId,
    packages: Vec<Package>,
    connected: bool,
    updated: bool,
}

/// The window through which an update routine reads inputs and writes outputs
///
/// Input packages are snapshotted before the routine starts, so an update
/// always sees a consistent view. Output writes are staged and applied to the
/// output ports when the routine returns successfully. Unknown port ids are
/// logged and ignored; they indicate a programming error, not a data error.
pub struct UpdateContext<'a> {
    node_id: &'a str,
    inputs: &'a [InputState],
    output_ids: &'a [PortId],
    staged: BTreeMap<PortId, Package>,
}

impl UpdateContext<'_> {
    /// Id of the node being updated
    pub fn node_id(&self) -> &str {
        self.node_id
    }

    fn input(&self, port: &str) -> Option<&InputState> {
        let state = self.inputs.iter().find(|s| s.id == port);
        if state.is_none() {
            log::error!("'{}' is not an input port of node '{}'", port, self.node_id);
        }
        state
    }

    /// The package held by an input port (the first, for multi-arity ports)
    pub fn input_package(&self, port: &str) -> Option<&Package> {
        self.input(port).and_then(|s| s.packages.first())
    }

    /// All packages held by an input port, in edge order
    pub fn input_packages(&self, port: &str) -> &[Package] {
        self.input(port).map(|s| s.packages.as_slice()).unwrap_or(&[])
    }

    /// Whether an input port has at least one connected edge
    pub fn is_input_connected(&self, port: &str) -> bool {
        self.input(port).is_some_and(|s| s.connected)
    }

    /// Whether an input port carried a dirty flag into this update
    pub fn is_input_updated(&self, port: &str) -> bool {
        self.input(port).is_some_and(|s| s.updated)
    }

    /// Stage a package for an output port
    pub fn set_output(&mut self, port: &str, package: Package) {
        if !self.output_ids.iter().any(|id| id == port) {
            log::error!("'{}' is not an output port of node '{}'", port, self.node_id);
            return;
        }
        self.staged.insert(port.to_string(), package);
    }
}

/// A node in the dataflow graph
pub struct Node {
    id: NodeId,
    /// Creation sequence number, assigned by the graph; breaks scheduling ties.
    seq: u64,
    label: String,
    layer: i64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    selected: bool,
    active: bool,
    /// Set by direct data edits (`Graph::touch`), independent of port flags.
    self_dirty: bool,
    input_ports: Vec<Port>,
    output_ports: Vec<Port>,
    chain: SerializationChain,
    behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Create a node with the given id and behavior.
    ///
    /// Ports are built from the behavior's declarations and never resized
    /// afterward. The serialization chain starts with the core pair and is
    /// then extended by the behavior.
    pub fn new(id: impl Into<String>, behavior: Box<dyn NodeBehavior>) -> Self {
        let id = id.into();
        let input_ports = behavior
            .input_ports()
            .iter()
            .map(|spec| Port::from_spec(spec, PortDirection::Input))
            .collect();
        let output_ports = behavior
            .output_ports()
            .iter()
            .map(|spec| Port::from_spec(spec, PortDirection::Output))
            .collect();

        let mut chain = SerializationChain::new();
        chain.push(core_save, core_restore);
        behavior.extend_chain(&mut chain);

        Self {
            label: id.clone(),
            id,
            seq: 0,
            layer: 0,
            x: 0.0,
            y: 0.0,
            width: DEFAULT_NODE_WIDTH,
            height: DEFAULT_NODE_HEIGHT,
            selected: false,
            active: false,
            self_dirty: false,
            input_ports,
            output_ports,
            chain,
            behavior,
        }
    }

    /// Node identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type discriminator of the behavior
    pub fn node_type(&self) -> &'static str {
        self.behavior.node_type()
    }

    /// Human-readable label, defaults to the node id
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set the node label
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Z-order layer; higher layers render on top
    pub fn layer(&self) -> i64 {
        self.layer
    }

    pub(crate) fn set_layer(&mut self, layer: i64) {
        self.layer = layer;
    }

    /// Position of the node's top-left corner
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Node size
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Move the node to a given position
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Move the node by the given offset from its current position
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Resize the node
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Whether the node is among the current selection
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Whether the node is focused (its option panel is shown)
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Input ports in declaration order
    pub fn input_ports(&self) -> &[Port] {
        &self.input_ports
    }

    /// Output ports in declaration order
    pub fn output_ports(&self) -> &[Port] {
        &self.output_ports
    }

    /// Look up an input port by id.
    ///
    /// Port wiring is fixed at construction, so a miss indicates a
    /// programming or configuration error; it is logged and `None` returned.
    pub fn get_input_port(&self, id: &str) -> Option<&Port> {
        let port = self.input_ports.iter().find(|p| p.id() == id);
        if port.is_none() {
            log::error!("port '{}' is not an input port of node '{}'", id, self.id);
        }
        port
    }

    /// Look up an output port by id; logs and returns `None` on a miss
    pub fn get_output_port(&self, id: &str) -> Option<&Port> {
        let port = self.output_ports.iter().find(|p| p.id() == id);
        if port.is_none() {
            log::error!("port '{}' is not an output port of node '{}'", id, self.id);
        }
        port
    }

    pub(crate) fn input_port_mut(&mut self, id: &str) -> Option<&mut Port> {
        self.input_ports.iter_mut().find(|p| p.id() == id)
    }

    pub(crate) fn output_port_mut(&mut self, id: &str) -> Option<&mut Port> {
        self.output_ports.iter_mut().find(|p| p.id() == id)
    }

    /// Whether some input port has an unconsumed package or connection change
    pub fn is_update_necessary(&self) -> bool {
        self.input_ports.iter().any(|p| p.is_updated())
    }

    /// Whether the scheduler should update this node in the next pass
    pub fn is_dirty(&self) -> bool {
        self.self_dirty || self.is_update_necessary()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.self_dirty = true;
    }

    /// Clear the dirty flags of all ports after an update pass consumed them
    pub(crate) fn clear_updated_ports(&mut self) {
        for port in &mut self.input_ports {
            port.clear_package_update();
            port.clear_connection_update();
        }
        for port in &mut self.output_ports {
            port.clear_package_update();
            port.clear_connection_update();
        }
        self.self_dirty = false;
    }

    /// Borrow the behavior as its concrete type
    pub fn behavior_as<T: NodeBehavior>(&self) -> Option<&T> {
        self.behavior.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the behavior as its concrete type
    pub fn behavior_as_mut<T: NodeBehavior>(&mut self) -> Option<&mut T> {
        self.behavior.as_any_mut().downcast_mut::<T>()
    }

    /// Run the behavior's update routine against a snapshot of the inputs.
    ///
    /// On success the staged outputs are written to the output ports,
    /// marking them package-updated. On error nothing is written: the node
    /// keeps its previous (last-good) output packages.
    pub(crate) fn run_update(&mut self) -> Result<()> {
        let inputs: Vec<InputState> = self
            .input_ports
            .iter()
            .map(|port| InputState {
                id: port.id().to_string(),
                packages: port.packages().into_iter().cloned().collect(),
                connected: port.is_connected(),
                updated: port.is_updated(),
            })
            .collect();
        let output_ids: Vec<PortId> = self.output_ports.iter().map(|p| p.id().to_string()).collect();

        let mut ctx = UpdateContext {
            node_id: &self.id,
            inputs: &inputs,
            output_ids: &output_ids,
            staged: BTreeMap::new(),
        };
        self.behavior.update(&mut ctx)?;
        let staged = ctx.staged;

        for (port_id, package) in staged {
            if let Some(port) = self.output_port_mut(&port_id) {
                port.set_package(package);
            }
        }
        Ok(())
    }

    /// Serialize the node by folding its chain into one save record.
    ///
    /// Later chain entries overwrite fields written by earlier ones; this is
    /// the intentional override channel for specializations.
    pub fn serialize(&self) -> Value {
        let mut save = Map::new();
        for (save_fn, _) in &self.chain.entries {
            for (key, value) in save_fn(self) {
                save.insert(key, value);
            }
        }
        Value::Object(save)
    }

    /// Restore the node from a save record.
    ///
    /// Every restore function in the chain receives the full record and
    /// reads only the fields it owns.
    pub fn deserialize(&mut self, save: &Value) -> Result<()> {
        let record = save
            .as_object()
            .ok_or_else(|| crate::error::FlowError::malformed("node save is not an object"))?;
        let entries = self.chain.entries.clone();
        for (_, restore_fn) in entries {
            restore_fn(self, record)?;
        }
        Ok(())
    }
}

/// Core save pair: engine-owned identity and layout fields
fn core_save(node: &Node) -> Map<String, Value> {
    let mut save = Map::new();
    save.insert("id".to_string(), Value::from(node.id.clone()));
    save.insert("type".to_string(), Value::from(node.node_type()));
    save.insert("label".to_string(), Value::from(node.label.clone()));
    save.insert("layer".to_string(), Value::from(node.layer));
    save.insert("x".to_string(), Value::from(node.x));
    save.insert("y".to_string(), Value::from(node.y));
    save.insert("width".to_string(), Value::from(node.width));
    save.insert("height".to_string(), Value::from(node.height));
    save
}

fn core_restore(node: &mut Node, save: &Map<String, Value>) -> Result<()> {
    if let Some(label) = save.get("label").and_then(Value::as_str) {
        node.label = label.to_string();
    }
    if let Some(layer) = save.get("layer").and_then(Value::as_i64) {
        node.layer = layer;
    }
    if let Some(x) = save.get("x").and_then(Value::as_f64) {
        node.x = x;
    }
    if let Some(y) = save.get("y").and_then(Value::as_f64) {
        node.y = y;
    }
    if let Some(width) = save.get("width").and_then(Value::as_f64) {
        node.width = width;
    }
    if let Some(height) = save.get("height").and_then(Value::as_f64) {
        node.height = height;
    }
    Ok(())
}
