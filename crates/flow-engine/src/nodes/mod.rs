//! Built-in node kinds
//!
//! Each node kind implements `NodeBehavior`: it declares a fixed port
//! layout, computes output packages from input packages in `update`, and
//! appends its parameters to the serialization chain. Rendering of these
//! nodes is a collaborator concern; visualization kinds expose their
//! computed geometry (e.g. histogram bins) through accessors instead of
//! drawing.

pub mod data_source;
pub mod histogram;
pub mod range_filter;
pub mod visual_editor;
pub mod visualization;

pub use data_source::DataSource;
pub use histogram::{Histogram, HistogramBin};
pub use range_filter::RangeFilter;
pub use visual_editor::VisualEditor;
pub use visualization::Visualization;

use crate::registry::{NodeMetadata, NodeRegistry};
use crate::types::NodeCategory;

/// Register every built-in node kind
pub fn register_builtins(registry: &mut NodeRegistry) {
    registry.register(
        NodeMetadata::new(
            "data-source",
            NodeCategory::Source,
            "Data Source",
            "Introduces a tabular dataset into the graph",
        ),
        || Box::new(DataSource::new()),
    );
    registry.register(
        NodeMetadata::new(
            "range-filter",
            NodeCategory::Filter,
            "Range Filter",
            "Keeps items whose column value lies in a numeric range",
        ),
        || Box::new(RangeFilter::new()),
    );
    registry.register(
        NodeMetadata::new(
            "visual-editor",
            NodeCategory::Editor,
            "Visual Editor",
            "Assigns visual attributes to every item",
        ),
        || Box::new(VisualEditor::new()),
    );
    registry.register(
        NodeMetadata::new(
            "histogram",
            NodeCategory::Visualization,
            "Histogram",
            "Bins items by a numeric column and propagates bar selection",
        ),
        || Box::new(Histogram::new()),
    );
}
