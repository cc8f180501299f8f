//! Tabular datasets referenced by packages
//!
//! A `Dataset` is the immutable table a data source introduces into the
//! graph. Packages carry row indices into it; downstream nodes read cells
//! through the shared reference and never mutate the table.

use serde::{Deserialize, Serialize};

/// The value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Numeric values
    Number,
    /// Free text values
    Text,
}

/// A single column of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name
    pub name: String,
    /// Value type of the column
    pub column_type: ColumnType,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// An immutable table of rows, shared by reference between nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Human-readable dataset name
    pub name: String,
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row-major cell values
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Dataset {
    /// Create an empty dataset with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the columns of this dataset
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Append a row of cell values
    pub fn with_row(mut self, row: Vec<serde_json::Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Number of rows in the table
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Find a column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get the type of a column
    pub fn column_type(&self, column: usize) -> Option<ColumnType> {
        self.columns.get(column).map(|c| c.column_type)
    }

    /// Get a cell value
    pub fn value(&self, row: usize, column: usize) -> Option<&serde_json::Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Get a cell value as a number, if it is numeric
    pub fn number(&self, row: usize, column: usize) -> Option<f64> {
        self.value(row, column).and_then(|v| v.as_f64())
    }

    /// Compute the numeric (min, max) domain of a column over the given items.
    ///
    /// Items without a numeric cell in the column are skipped. Returns `None`
    /// when no item contributes a numeric value.
    pub fn domain(&self, column: usize, items: &[usize]) -> Option<(f64, f64)> {
        let mut domain: Option<(f64, f64)> = None;
        for &item in items {
            if let Some(value) = self.number(item, column) {
                domain = Some(match domain {
                    Some((min, max)) => (min.min(value), max.max(value)),
                    None => (value, value),
                });
            }
        }
        domain
    }
}
