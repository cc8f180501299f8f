//! Data packages flowing over ports
//!
//! A `Package` is the payload a port holds: a set of item indices into a
//! shared dataset, plus optional per-item visual attributes. A package is
//! produced by exactly one node's update pass and consumed read-only by all
//! downstream nodes until replaced; delivery clones the package into the
//! receiving port.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::Dataset;

/// Visual attributes attached to a single item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualProperties {
    /// Fill color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Border color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    /// Border width in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Opacity in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl VisualProperties {
    /// True when no attribute is set
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.border.is_none() && self.width.is_none() && self.opacity.is_none()
    }

    /// Overlay another set of attributes on top of this one.
    ///
    /// Attributes set in `over` win; unset attributes keep their current value.
    pub fn overlay(&mut self, over: &VisualProperties) {
        if over.color.is_some() {
            self.color = over.color.clone();
        }
        if over.border.is_some() {
            self.border = over.border.clone();
        }
        if over.width.is_some() {
            self.width = over.width;
        }
        if over.opacity.is_some() {
            self.opacity = over.opacity;
        }
    }
}

/// A set of item indices with per-item visual attributes
///
/// Items are kept ordered by index so iteration and serialization are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    dataset: Option<Arc<Dataset>>,
    items: BTreeMap<usize, VisualProperties>,
}

impl Package {
    /// Create an empty package with no dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a package containing every row of the dataset, with no visuals
    pub fn from_dataset(dataset: Arc<Dataset>) -> Self {
        let items = (0..dataset.num_rows())
            .map(|index| (index, VisualProperties::default()))
            .collect();
        Self {
            dataset: Some(dataset),
            items,
        }
    }

    /// Create a package from explicit item indices
    pub fn from_items(dataset: Option<Arc<Dataset>>, items: impl IntoIterator<Item = usize>) -> Self {
        Self {
            dataset,
            items: items
                .into_iter()
                .map(|index| (index, VisualProperties::default()))
                .collect(),
        }
    }

    /// The dataset the item indices refer to
    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// Item indices in ascending order
    pub fn item_indices(&self) -> Vec<usize> {
        self.items.keys().copied().collect()
    }

    /// Whether the package contains the given item
    pub fn has_item(&self, index: usize) -> bool {
        self.items.contains_key(&index)
    }

    /// Number of items in the package
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// True when the package holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Visual attributes of an item
    pub fn visuals(&self, index: usize) -> Option<&VisualProperties> {
        self.items.get(&index)
    }

    /// Set the visual attributes of an item already in the package
    pub fn set_visuals(&mut self, index: usize, visuals: VisualProperties) {
        if let Some(entry) = self.items.get_mut(&index) {
            *entry = visuals;
        }
    }

    /// Produce a new package keeping only items the predicate accepts.
    ///
    /// The dataset reference and per-item visuals carry over.
    pub fn retain<F>(&self, keep: F) -> Package
    where
        F: Fn(usize) -> bool,
    {
        Package {
            dataset: self.dataset.clone(),
            items: self
                .items
                .iter()
                .filter(|(&index, _)| keep(index))
                .map(|(&index, visuals)| (index, visuals.clone()))
                .collect(),
        }
    }

    /// Produce a new package with the given attributes overlaid on every item
    pub fn overlay_visuals(&self, over: &VisualProperties) -> Package {
        let mut out = self.clone();
        for visuals in out.items.values_mut() {
            visuals.overlay(over);
        }
        out
    }

    /// Union of two packages.
    ///
    /// For items present in both, `other`'s visuals are overlaid on this
    /// package's visuals. The dataset reference comes from `self` when set,
    /// otherwise from `other`.
    pub fn merge(&self, other: &Package) -> Package {
        let mut out = self.clone();
        if out.dataset.is_none() {
            out.dataset = other.dataset.clone();
        }
        for (&index, visuals) in &other.items {
            out.items
                .entry(index)
                .and_modify(|existing| existing.overlay(visuals))
                .or_insert_with(|| visuals.clone());
        }
        out
    }
}
