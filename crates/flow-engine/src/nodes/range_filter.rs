//! The range filter node
//!
//! Keeps the items whose numeric value in a chosen column lies in
//! `[min, max]`. Unset bounds are open, so a fresh filter with a column
//! passes every numeric value; items without a numeric cell never pass.

use std::any::Any;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::node::{Node, NodeBehavior, SerializationChain, UpdateContext};
use crate::package::Package;
use crate::types::{PortSpec, PortType};

/// Filters items by a numeric column range
pub struct RangeFilter {
    column: Option<usize>,
    min: Option<f64>,
    max: Option<f64>,
}

impl RangeFilter {
    /// Create a filter with no column configured; it forwards unchanged
    pub fn new() -> Self {
        Self {
            column: None,
            min: None,
            max: None,
        }
    }

    /// Set the filtered column at construction
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Set the bounds at construction
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Change the filtered column; pair with `Graph::touch` to re-propagate
    pub fn set_column(&mut self, column: Option<usize>) {
        self.column = column;
    }

    /// Change the bounds; pair with `Graph::touch` to re-propagate
    pub fn set_range(&mut self, min: Option<f64>, max: Option<f64>) {
        self.min = min;
        self.max = max;
    }

    /// The filtered column
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Lower bound, inclusive; `None` is open
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Upper bound, inclusive; `None` is open
    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for RangeFilter {
    fn node_type(&self) -> &'static str {
        "range-filter"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::single("in", "Input", PortType::Subset)]
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::multiple("out", "Output", PortType::Subset)]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        let Some(input) = ctx.input_package("in") else {
            ctx.set_output("out", Package::new());
            return Ok(());
        };

        let output = match (self.column, input.dataset().cloned()) {
            (Some(column), Some(dataset)) => {
                let (min, max) = (self.min, self.max);
                input.retain(|index| match dataset.number(index, column) {
                    Some(value) => {
                        min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
                    }
                    None => false,
                })
            }
            // no column configured (or no dataset to look cells up in)
            _ => input.clone(),
        };
        ctx.set_output("out", output);
        Ok(())
    }

    fn extend_chain(&self, chain: &mut SerializationChain) {
        chain.push(save_range, restore_range);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn save_range(node: &Node) -> Map<String, Value> {
    let mut save = Map::new();
    if let Some(filter) = node.behavior_as::<RangeFilter>() {
        save.insert("column".to_string(), serde_json::json!(filter.column));
        save.insert("min".to_string(), serde_json::json!(filter.min));
        save.insert("max".to_string(), serde_json::json!(filter.max));
    }
    save
}

fn restore_range(node: &mut Node, save: &Map<String, Value>) -> Result<()> {
    let column = save.get("column").map(|v| v.as_u64().map(|c| c as usize));
    let min = save.get("min").map(Value::as_f64);
    let max = save.get("max").map(Value::as_f64);
    if let Some(filter) = node.behavior_as_mut::<RangeFilter>() {
        if let Some(column) = column {
            filter.column = column;
        }
        if let Some(min) = min {
            filter.min = min;
        }
        if let Some(max) = max {
            filter.max = max;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::{Column, ColumnType, Dataset};
    use serde_json::json;

    fn make_package() -> Package {
        let dataset = Arc::new(
            Dataset::new("values")
                .with_columns(vec![Column::new("value", ColumnType::Number)])
                .with_row(vec![json!(5.0)])
                .with_row(vec![json!(10.0)])
                .with_row(vec![json!(15.0)])
                .with_row(vec![json!(20.0)])
                .with_row(vec![json!("not a number")]),
        );
        Package::from_dataset(dataset)
    }

    fn run_filter(filter: RangeFilter, input: Package) -> Package {
        let mut node = Node::new("filter-1", Box::new(filter));
        node.input_port_mut("in").unwrap().deliver("e1", input);
        node.run_update().unwrap();
        node.get_output_port("out").unwrap().package().cloned().unwrap()
    }

    #[test]
    fn test_inclusive_bounds() {
        let out = run_filter(
            RangeFilter::new().with_column(0).with_range(Some(10.0), Some(15.0)),
            make_package(),
        );
        assert_eq!(out.item_indices(), vec![1, 2]);
    }

    #[test]
    fn test_open_bounds() {
        let out = run_filter(
            RangeFilter::new().with_column(0).with_range(Some(15.0), None),
            make_package(),
        );
        assert_eq!(out.item_indices(), vec![2, 3]);

        let out = run_filter(RangeFilter::new().with_column(0), make_package());
        // both bounds open: every numeric item passes, the text cell doesn't
        assert_eq!(out.item_indices(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_no_column_forwards_unchanged() {
        let out = run_filter(RangeFilter::new(), make_package());
        assert_eq!(out.item_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_no_input_emits_empty() {
        let mut node = Node::new("filter-1", Box::new(RangeFilter::new().with_column(0)));
        node.run_update().unwrap();
        assert!(node
            .get_output_port("out")
            .unwrap()
            .package()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_range_roundtrips() {
        let node = Node::new(
            "filter-1",
            Box::new(RangeFilter::new().with_column(2).with_range(Some(-1.5), None)),
        );
        let save = node.serialize();

        let mut restored = Node::new("filter-1", Box::new(RangeFilter::new()));
        restored.deserialize(&save).unwrap();
        let filter = restored.behavior_as::<RangeFilter>().unwrap();
        assert_eq!(filter.column(), Some(2));
        assert_eq!(filter.min(), Some(-1.5));
        assert_eq!(filter.max(), None);
    }
}
