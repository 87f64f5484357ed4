use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, LadderError};
use crate::props::Props;

/// Numeric table stored below the header of a cache entry.
///
/// Every row has the same width: one column (values only) or two columns
/// (coordinate, value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Vec<f64>>,
}

impl Table {
    /// Builds a table from rows, rejecting ragged or over-wide input.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, LadderError> {
        if let Some(first) = rows.first() {
            let width = first.len();
            if width == 0 || width > 2 {
                return Err(LadderError::Store(
                    ErrorInfo::new("table-width", "tables hold one or two columns")
                        .with_context("width", width.to_string()),
                ));
            }
            if let Some(bad) = rows.iter().position(|row| row.len() != width) {
                return Err(LadderError::Store(
                    ErrorInfo::new("table-ragged", "table rows differ in width")
                        .with_context("row", bad.to_string()),
                ));
            }
        }
        Ok(Self { rows })
    }

    /// Builds a two-column table from aligned coordinate and value columns.
    pub fn from_columns(x: &[f64], y: &[f64]) -> Result<Self, LadderError> {
        if x.len() != y.len() {
            return Err(LadderError::Structure(
                ErrorInfo::new("column-length", "coordinate and value columns differ in length")
                    .with_context("x", x.len().to_string())
                    .with_context("y", y.len().to_string()),
            ));
        }
        Self::new(x.iter().zip(y).map(|(a, b)| vec![*a, *b]).collect())
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of columns (zero for an empty table).
    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copies one column out of the table.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).copied())
            .collect()
    }
}

/// Labelled series flowing through reductions, extrapolations and fits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Coordinates, one per point (may be empty for bare values).
    pub x: Vec<f64>,
    /// Values aligned with `x`.
    pub y: Vec<f64>,
    /// Provenance and fit metadata.
    pub props: Props,
}

impl Dataset {
    /// Creates a dataset from its three parts.
    pub fn new(x: Vec<f64>, y: Vec<f64>, props: Props) -> Self {
        Self { x, y, props }
    }

    /// Rebuilds a dataset from a stored table.
    ///
    /// Two-column tables split into coordinates and values; one-column tables
    /// only carry values.
    pub fn from_table(table: Option<&Table>, props: Props) -> Self {
        match table {
            Some(table) if table.width() == 2 => {
                Self::new(table.column(0), table.column(1), props)
            }
            Some(table) => Self::new(Vec::new(), table.column(0), props),
            None => Self::new(Vec::new(), Vec::new(), props),
        }
    }

    /// Converts the series into a table, `None` when there is nothing to store.
    pub fn to_table(&self) -> Result<Option<Table>, LadderError> {
        if self.y.is_empty() {
            return Ok(None);
        }
        if self.x.is_empty() {
            return Table::new(self.y.iter().map(|value| vec![*value]).collect()).map(Some);
        }
        Table::from_columns(&self.x, &self.y).map(Some)
    }

    /// Number of points in the series.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// True when the series holds no points.
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}
