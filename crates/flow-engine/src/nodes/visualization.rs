//! Shared base contract for visualization node kinds
//!
//! A visualization forwards its input, maintains an interactive item
//! selection, and emits the selected items on a dedicated output port. The
//! selection is part of the persisted state: the base chain pair here is
//! pushed before each visualization's own pair, so every visualization save
//! record carries a `selection` field.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::node::{Node, NodeBehavior, SerializationChain};
use crate::package::Package;

/// Behavior contract shared by visualization node kinds
pub trait Visualization: NodeBehavior + Sized {
    /// The currently selected item indices
    fn selection(&self) -> &BTreeSet<usize>;

    /// Mutable access to the selected item indices
    fn selection_mut(&mut self) -> &mut BTreeSet<usize>;
}

/// Append the base visualization chain pair for a concrete kind.
///
/// Call this first in `extend_chain`, before the kind's own pair.
pub(crate) fn push_selection_chain<V: Visualization>(chain: &mut SerializationChain) {
    chain.push(save_selection::<V>, restore_selection::<V>);
}

fn save_selection<V: Visualization>(node: &Node) -> Map<String, Value> {
    let mut save = Map::new();
    match node.behavior_as::<V>() {
        Some(viz) => {
            let items: Vec<usize> = viz.selection().iter().copied().collect();
            save.insert("selection".to_string(), serde_json::json!(items));
        }
        None => {
            log::error!(
                "selection chain pair attached to node '{}' of a different kind",
                node.id()
            );
        }
    }
    save
}

fn restore_selection<V: Visualization>(node: &mut Node, save: &Map<String, Value>) -> Result<()> {
    if let Some(items) = save.get("selection").and_then(Value::as_array) {
        let selection: BTreeSet<usize> = items
            .iter()
            .filter_map(Value::as_u64)
            .map(|v| v as usize)
            .collect();
        if let Some(viz) = node.behavior_as_mut::<V>() {
            *viz.selection_mut() = selection;
        }
    }
    Ok(())
}

/// The package a visualization emits on its selection port
pub(crate) fn selection_package(input: &Package, selection: &BTreeSet<usize>) -> Package {
    input.retain(|index| selection.contains(&index))
}
