//! The visual editor node
//!
//! Assigns visual attributes to every item passing through. Attributes the
//! editor leaves unset keep whatever upstream assigned, so editors compose
//! along a chain.

use std::any::Any;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::node::{Node, NodeBehavior, SerializationChain, UpdateContext};
use crate::package::{Package, VisualProperties};
use crate::types::{PortSpec, PortType};

/// Overlays configured visual attributes onto every item
pub struct VisualEditor {
    visuals: VisualProperties,
}

impl VisualEditor {
    /// Create an editor assigning nothing
    pub fn new() -> Self {
        Self {
            visuals: VisualProperties::default(),
        }
    }

    /// Set the assigned attributes at construction
    pub fn with_visuals(mut self, visuals: VisualProperties) -> Self {
        self.visuals = visuals;
        self
    }

    /// Change the assigned attributes; pair with `Graph::touch` to re-propagate
    pub fn set_visuals(&mut self, visuals: VisualProperties) {
        self.visuals = visuals;
    }

    /// The currently assigned attributes
    pub fn visuals(&self) -> &VisualProperties {
        &self.visuals
    }
}

impl Default for VisualEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for VisualEditor {
    fn node_type(&self) -> &'static str {
        "visual-editor"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::single("in", "Input", PortType::Subset)]
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::multiple("out", "Output", PortType::Subset)]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        let output = match ctx.input_package("in") {
            Some(input) => input.overlay_visuals(&self.visuals),
            None => Package::new(),
        };
        ctx.set_output("out", output);
        Ok(())
    }

    fn extend_chain(&self, chain: &mut SerializationChain) {
        chain.push(save_visuals, restore_visuals);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn save_visuals(node: &Node) -> Map<String, Value> {
    let mut save = Map::new();
    if let Some(editor) = node.behavior_as::<VisualEditor>() {
        match serde_json::to_value(&editor.visuals) {
            Ok(value) => {
                save.insert("visuals".to_string(), value);
            }
            Err(err) => {
                log::error!("failed to save visuals of node '{}': {}", node.id(), err);
            }
        }
    }
    save
}

fn restore_visuals(node: &mut Node, save: &Map<String, Value>) -> Result<()> {
    if let Some(value) = save.get("visuals") {
        let visuals: VisualProperties = serde_json::from_value(value.clone())?;
        if let Some(editor) = node.behavior_as_mut::<VisualEditor>() {
            editor.visuals = visuals;
        }
    }
    Ok(())
}
