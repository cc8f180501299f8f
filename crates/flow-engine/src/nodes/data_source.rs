//! The data source node
//!
//! Introduces a tabular dataset into the graph. Its output package covers
//! every row of the dataset with no visual attributes; downstream nodes
//! subset and decorate from there. The dataset is saved inline in the
//! serialization chain so a diagram restores without external files.

use std::any::Any;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::data::Dataset;
use crate::error::Result;
use crate::node::{Node, NodeBehavior, SerializationChain, UpdateContext};
use crate::package::Package;
use crate::types::{PortSpec, PortType};

/// Emits every row of its dataset as a package
pub struct DataSource {
    dataset: Option<Arc<Dataset>>,
}

impl DataSource {
    /// Create a data source with no dataset; it emits an empty package
    pub fn new() -> Self {
        Self { dataset: None }
    }

    /// Set the dataset at construction
    pub fn with_dataset(mut self, dataset: Arc<Dataset>) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Replace the dataset; pair with `Graph::touch` to re-propagate
    pub fn set_dataset(&mut self, dataset: Option<Arc<Dataset>>) {
        self.dataset = dataset;
    }

    /// The current dataset
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }
}

impl Default for DataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for DataSource {
    fn node_type(&self) -> &'static str {
        "data-source"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![]
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::multiple("out", "Output", PortType::Subset)]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        let package = match &self.dataset {
            Some(dataset) => Package::from_dataset(dataset.clone()),
            None => Package::new(),
        };
        ctx.set_output("out", package);
        Ok(())
    }

    fn extend_chain(&self, chain: &mut SerializationChain) {
        chain.push(save_dataset, restore_dataset);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn save_dataset(node: &Node) -> Map<String, Value> {
    let mut save = Map::new();
    if let Some(source) = node.behavior_as::<DataSource>() {
        let value = match &source.dataset {
            Some(dataset) => match serde_json::to_value(dataset.as_ref()) {
                Ok(value) => value,
                Err(err) => {
                    log::error!("failed to save dataset of node '{}': {}", node.id(), err);
                    Value::Null
                }
            },
            None => Value::Null,
        };
        save.insert("dataset".to_string(), value);
    }
    save
}

fn restore_dataset(node: &mut Node, save: &Map<String, Value>) -> Result<()> {
    if let Some(value) = save.get("dataset") {
        let dataset = if value.is_null() {
            None
        } else {
            Some(Arc::new(serde_json::from_value::<Dataset>(value.clone())?))
        };
        if let Some(source) = node.behavior_as_mut::<DataSource>() {
            source.dataset = dataset;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, ColumnType};
    use serde_json::json;

    fn make_dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::new("values")
                .with_columns(vec![Column::new("value", ColumnType::Number)])
                .with_row(vec![json!(1.0)])
                .with_row(vec![json!(2.0)]),
        )
    }

    #[test]
    fn test_update_emits_all_rows() {
        let mut node = Node::new(
            "source-1",
            Box::new(DataSource::new().with_dataset(make_dataset())),
        );
        node.run_update().unwrap();

        let out = node.get_output_port("out").unwrap().package().unwrap();
        assert_eq!(out.item_indices(), vec![0, 1]);
        assert!(out.dataset().is_some());
    }

    #[test]
    fn test_update_without_dataset_emits_empty() {
        let mut node = Node::new("source-1", Box::new(DataSource::new()));
        node.run_update().unwrap();

        let out = node.get_output_port("out").unwrap().package().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_dataset_roundtrips_inline() {
        let node = Node::new(
            "source-1",
            Box::new(DataSource::new().with_dataset(make_dataset())),
        );
        let save = node.serialize();
        assert_eq!(save["dataset"]["name"], "values");

        let mut restored = Node::new("source-1", Box::new(DataSource::new()));
        restored.deserialize(&save).unwrap();
        let source = restored.behavior_as::<DataSource>().unwrap();
        assert_eq!(source.dataset().unwrap().num_rows(), 2);
    }

    #[test]
    fn test_missing_dataset_roundtrips_as_none() {
        let node = Node::new("source-1", Box::new(DataSource::new()));
        let save = node.serialize();

        let mut restored = Node::new(
            "source-1",
            Box::new(DataSource::new().with_dataset(make_dataset())),
        );
        restored.deserialize(&save).unwrap();
        assert!(restored.behavior_as::<DataSource>().unwrap().dataset().is_none());
    }
}
