//! The histogram node
//!
//! Bins the items of its input package by a numeric column into equal-width
//! bins and keeps the computed geometry available for the rendering
//! collaborator. Users select whole bins; the items of the selected bins
//! flow out of the `selection` port. The input package is forwarded
//! unchanged on `out`.

use std::any::Any;
use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::node::{Node, NodeBehavior, SerializationChain, UpdateContext};
use crate::nodes::visualization::{push_selection_chain, selection_package, Visualization};
use crate::package::Package;
use crate::types::{PortSpec, PortType};

const DEFAULT_NUM_BINS: usize = 10;

/// One computed histogram bin
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    /// Inclusive lower bound of the bin
    pub x0: f64,
    /// Upper bound of the bin; inclusive only for the last bin
    pub x1: f64,
    /// Items whose value falls into this bin
    pub members: Vec<usize>,
}

/// Bins items by a numeric column and propagates bar selection
pub struct Histogram {
    column: Option<usize>,
    num_bins: usize,
    /// Indices into `bins` the user selected.
    selected_bins: BTreeSet<usize>,
    /// Selected item indices, derived from the selected bins on update.
    selection: BTreeSet<usize>,
    /// Geometry from the last update, for the rendering collaborator.
    bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Create a histogram with no column configured and 10 bins
    pub fn new() -> Self {
        Self {
            column: None,
            num_bins: DEFAULT_NUM_BINS,
            selected_bins: BTreeSet::new(),
            selection: BTreeSet::new(),
            bins: Vec::new(),
        }
    }

    /// Set the binned column at construction
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Set the bin count at construction
    pub fn with_num_bins(mut self, num_bins: usize) -> Self {
        self.num_bins = num_bins.max(1);
        self
    }

    /// Change the binned column; pair with `Graph::touch` to re-propagate
    pub fn set_column(&mut self, column: Option<usize>) {
        self.column = column;
    }

    /// Change the bin count; pair with `Graph::touch` to re-propagate
    pub fn set_num_bins(&mut self, num_bins: usize) {
        self.num_bins = num_bins.max(1);
    }

    /// The binned column
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// The configured bin count
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Geometry computed by the last update
    pub fn bins(&self) -> &[HistogramBin] {
        &self.bins
    }

    /// The user-selected bin indices
    pub fn selected_bins(&self) -> &BTreeSet<usize> {
        &self.selected_bins
    }

    /// Select a bin; pair with `Graph::touch` to propagate the selection
    pub fn select_bin(&mut self, bin: usize) {
        self.selected_bins.insert(bin);
    }

    /// Deselect a bin
    pub fn deselect_bin(&mut self, bin: usize) {
        self.selected_bins.remove(&bin);
    }

    /// Clear the bin selection
    pub fn clear_selected_bins(&mut self) {
        self.selected_bins.clear();
    }

    /// Equal-width bins over the column domain of the package's items
    fn compute_bins(&self, package: &Package) -> Vec<HistogramBin> {
        let Some(column) = self.column else {
            return Vec::new();
        };
        let Some(dataset) = package.dataset() else {
            return Vec::new();
        };
        let items = package.item_indices();
        let Some((min, max)) = dataset.domain(column, &items) else {
            return Vec::new();
        };

        if min == max {
            // degenerate domain: one bin holding every numeric item
            let members = items
                .iter()
                .copied()
                .filter(|&item| dataset.number(item, column).is_some())
                .collect();
            return vec![HistogramBin {
                x0: min,
                x1: max,
                members,
            }];
        }

        let num_bins = self.num_bins.max(1);
        let width = (max - min) / num_bins as f64;
        let mut bins: Vec<HistogramBin> = (0..num_bins)
            .map(|k| HistogramBin {
                x0: min + k as f64 * width,
                x1: if k + 1 == num_bins {
                    max
                } else {
                    min + (k + 1) as f64 * width
                },
                members: Vec::new(),
            })
            .collect();

        for item in items {
            if let Some(value) = dataset.number(item, column) {
                let index = (((value - min) / width) as usize).min(num_bins - 1);
                bins[index].members.push(item);
            }
        }
        bins
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualization for Histogram {
    fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    fn selection_mut(&mut self) -> &mut BTreeSet<usize> {
        &mut self.selection
    }
}

impl NodeBehavior for Histogram {
    fn node_type(&self) -> &'static str {
        "histogram"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::single("in", "Input", PortType::Subset)]
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::multiple("out", "Output", PortType::Subset),
            PortSpec::multiple("selection", "Selection", PortType::Selection),
        ]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        let input = ctx.input_package("in").cloned().unwrap_or_default();

        self.bins = self.compute_bins(&input);

        // selected items follow the selected bins against the fresh binning
        let mut selection = BTreeSet::new();
        for &bin_index in &self.selected_bins {
            if let Some(bin) = self.bins.get(bin_index) {
                selection.extend(bin.members.iter().copied());
            }
        }
        self.selection = selection;

        ctx.set_output("selection", selection_package(&input, &self.selection));
        ctx.set_output("out", input);
        Ok(())
    }

    fn extend_chain(&self, chain: &mut SerializationChain) {
        // base visualization pair first, histogram parameters after
        push_selection_chain::<Histogram>(chain);
        chain.push(save_histogram, restore_histogram);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn save_histogram(node: &Node) -> Map<String, Value> {
    let mut save = Map::new();
    if let Some(histogram) = node.behavior_as::<Histogram>() {
        let selected: Vec<usize> = histogram.selected_bins.iter().copied().collect();
        save.insert("column".to_string(), serde_json::json!(histogram.column));
        save.insert("numBins".to_string(), serde_json::json!(histogram.num_bins));
        save.insert("selectedBins".to_string(), serde_json::json!(selected));
    }
    save
}

fn restore_histogram(node: &mut Node, save: &Map<String, Value>) -> Result<()> {
    let column = save.get("column").map(|v| v.as_u64().map(|c| c as usize));
    let num_bins = save.get("numBins").and_then(Value::as_u64);
    let selected: Option<BTreeSet<usize>> = save.get("selectedBins").and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_u64)
            .map(|v| v as usize)
            .collect()
    });
    if let Some(histogram) = node.behavior_as_mut::<Histogram>() {
        if let Some(column) = column {
            histogram.column = column;
        }
        if let Some(num_bins) = num_bins {
            histogram.num_bins = (num_bins as usize).max(1);
        }
        if let Some(selected) = selected {
            histogram.selected_bins = selected;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::{Column, ColumnType, Dataset};
    use crate::graph::Graph;
    use crate::nodes::{DataSource, RangeFilter};
    use crate::types::PortRef;
    use serde_json::json;

    fn make_dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::new("values")
                .with_columns(vec![Column::new("value", ColumnType::Number)])
                .with_row(vec![json!(0.0)]) // item 0
                .with_row(vec![json!(5.0)]) // item 1
                .with_row(vec![json!(10.0)]) // item 2
                .with_row(vec![json!(15.0)]) // item 3
                .with_row(vec![json!(20.0)]) // item 4
                .with_row(vec![json!(40.0)]), // item 5
        )
    }

    fn run_histogram(histogram: Histogram, input: Package) -> Node {
        let mut node = Node::new("histogram-1", Box::new(histogram));
        node.input_port_mut("in").unwrap().deliver("e1", input);
        node.run_update().unwrap();
        node
    }

    #[test]
    fn test_equal_width_bins() {
        let input = Package::from_dataset(make_dataset());
        let node = run_histogram(Histogram::new().with_column(0).with_num_bins(4), input);

        let histogram = node.behavior_as::<Histogram>().unwrap();
        let bins = histogram.bins();
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].x0, 0.0);
        assert_eq!(bins[3].x1, 40.0);
        // width 10: [0,10) [10,20) [20,30) [30,40]
        assert_eq!(bins[0].members, vec![0, 1]);
        assert_eq!(bins[1].members, vec![2, 3]);
        assert_eq!(bins[2].members, vec![4]);
        assert_eq!(bins[3].members, vec![5]);
    }

    #[test]
    fn test_maximum_lands_in_last_bin() {
        let input = Package::from_dataset(make_dataset());
        let node = run_histogram(Histogram::new().with_column(0).with_num_bins(2), input);
        let bins = node.behavior_as::<Histogram>().unwrap().bins();
        assert_eq!(bins[1].members, vec![5]);
    }

    #[test]
    fn test_degenerate_domain_single_bin() {
        let dataset = Arc::new(
            Dataset::new("flat")
                .with_columns(vec![Column::new("value", ColumnType::Number)])
                .with_row(vec![json!(7.0)])
                .with_row(vec![json!(7.0)]),
        );
        let node = run_histogram(
            Histogram::new().with_column(0),
            Package::from_dataset(dataset),
        );
        let bins = node.behavior_as::<Histogram>().unwrap().bins();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].members, vec![0, 1]);
    }

    #[test]
    fn test_no_column_produces_no_bins() {
        let node = run_histogram(Histogram::new(), Package::from_dataset(make_dataset()));
        assert!(node.behavior_as::<Histogram>().unwrap().bins().is_empty());
    }

    #[test]
    fn test_selected_bins_feed_selection_port() {
        let mut histogram = Histogram::new().with_column(0).with_num_bins(4);
        histogram.select_bin(1);
        let node = run_histogram(histogram, Package::from_dataset(make_dataset()));

        let selection = node
            .get_output_port("selection")
            .unwrap()
            .package()
            .unwrap();
        assert_eq!(selection.item_indices(), vec![2, 3]);

        // the input is forwarded unchanged
        let out = node.get_output_port("out").unwrap().package().unwrap();
        assert_eq!(out.num_items(), 6);
    }

    #[test]
    fn test_chain_roundtrip_includes_base_pair() {
        let mut histogram = Histogram::new().with_column(0).with_num_bins(4);
        histogram.select_bin(1);
        let node = run_histogram(histogram, Package::from_dataset(make_dataset()));

        let save = node.serialize();
        // base visualization pair contributed the selection field
        assert_eq!(save["selection"], json!([2, 3]));
        assert_eq!(save["numBins"], json!(4));
        assert_eq!(save["selectedBins"], json!([1]));

        let mut restored = Node::new("histogram-1", Box::new(Histogram::new()));
        restored.deserialize(&save).unwrap();
        let histogram = restored.behavior_as::<Histogram>().unwrap();
        assert_eq!(histogram.column(), Some(0));
        assert_eq!(histogram.num_bins(), 4);
        assert_eq!(histogram.selected_bins().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(histogram.selection().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_range_filter_feeds_histogram() {
        let mut graph = Graph::new();
        graph
            .add_node(
                "source-1",
                Box::new(DataSource::new().with_dataset(make_dataset())),
            )
            .unwrap();
        graph
            .add_node("filter-1", Box::new(RangeFilter::new().with_column(0)))
            .unwrap();
        graph
            .add_node(
                "histogram-1",
                Box::new(Histogram::new().with_column(0).with_num_bins(2)),
            )
            .unwrap();
        graph
            .connect(
                PortRef::new("source-1", "out"),
                PortRef::new("filter-1", "in"),
            )
            .unwrap();
        graph
            .connect(
                PortRef::new("filter-1", "out"),
                PortRef::new("histogram-1", "in"),
            )
            .unwrap();

        graph.touch("source-1").unwrap();
        graph.propagate(&["source-1".to_string()]);

        // the user narrows the filter to [10, 20]
        graph
            .node_mut("filter-1")
            .unwrap()
            .behavior_as_mut::<RangeFilter>()
            .unwrap()
            .set_range(Some(10.0), Some(20.0));
        graph.touch("filter-1").unwrap();

        // the edit marks the filter dirty; the histogram follows in the pass
        let report = graph.propagate(&["filter-1".to_string()]);
        assert_eq!(report.updated, vec!["filter-1", "histogram-1"]);

        let histogram = graph
            .node("histogram-1")
            .unwrap()
            .behavior_as::<Histogram>()
            .unwrap();
        let binned: Vec<usize> = histogram
            .bins()
            .iter()
            .flat_map(|bin| bin.members.iter().copied())
            .collect();
        // exactly the items with 10 <= value <= 20
        assert_eq!(binned, vec![2, 3, 4]);
    }
}
