//! Result Formatter
//!
//! Cosmetic stage applied after merging: rounding of value columns and
//! textual rendering of dates and cells. It never adds, drops or reorders
//! rows or columns.

use crate::types::{Cell, NormalizedTable, TableRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default textual date format (ISO 8601 calendar date)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest rounding precision; an f64 carries no more significant decimals
pub const MAX_PRECISION: u32 = 15;

/// Rounding and serialization settings for downstream sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFormatter {
    /// Decimal places for value columns; `None` keeps full precision
    pub precision: Option<u32>,

    /// `chrono` format used to serialize the date key
    pub date_format: String,

    /// Header of the date key column
    pub date_column: String,

    /// Text written for missing cells
    pub missing_marker: String,

    /// Text written for cells whose scaling factor was undefined
    pub undefined_marker: String,
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self {
            precision: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            date_column: "date".to_string(),
            missing_marker: String::new(),
            undefined_marker: "NaN".to_string(),
        }
    }
}

/// Text rendering of a normalized table, header included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FormattedTable {
    /// Header and rows joined with `separator`, one string per line
    pub fn lines(&self, separator: &str) -> Vec<String> {
        std::iter::once(self.header.join(separator))
            .chain(self.rows.iter().map(|row| row.join(separator)))
            .collect()
    }
}

impl ResultFormatter {
    pub fn with_precision(precision: Option<u32>) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }

    /// Configured precision, `None` past [`MAX_PRECISION`]
    pub fn digits(&self) -> Option<u32> {
        self.precision.filter(|digits| *digits <= MAX_PRECISION)
    }

    /// Round half away from zero to the configured precision
    pub fn round(&self, value: f64) -> f64 {
        match self.digits() {
            Some(digits) => {
                let scale = 10f64.powi(digits as i32);
                let rounded = (value * scale).round() / scale;
                if rounded.is_finite() {
                    rounded
                } else {
                    value
                }
            }
            None => value,
        }
    }

    pub fn round_cell(&self, cell: Cell) -> Cell {
        match cell {
            Cell::Value(v) => Cell::Value(self.round(v)),
            other => other,
        }
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }

    pub fn format_cell(&self, cell: Cell) -> String {
        match cell {
            Cell::Value(v) => match self.digits() {
                Some(digits) => format!("{:.*}", digits as usize, self.round(v)),
                None => v.to_string(),
            },
            Cell::Missing => self.missing_marker.clone(),
            Cell::Undefined => self.undefined_marker.clone(),
        }
    }

    /// Round every value cell; rows and columns are untouched
    pub fn apply(&self, table: &NormalizedTable) -> NormalizedTable {
        NormalizedTable {
            columns: table.columns.clone(),
            rows: table
                .rows
                .iter()
                .map(|row| TableRow {
                    date: row.date,
                    cells: row.cells.iter().map(|c| self.round_cell(*c)).collect(),
                })
                .collect(),
        }
    }

    /// Render dates and cells as text for text-based sinks
    pub fn render(&self, table: &NormalizedTable) -> FormattedTable {
        FormattedTable {
            header: std::iter::once(self.date_column.clone())
                .chain(table.columns.iter().cloned())
                .collect(),
            rows: table
                .rows
                .iter()
                .map(|row| {
                    std::iter::once(self.format_date(row.date))
                        .chain(row.cells.iter().map(|c| self.format_cell(*c)))
                        .collect()
                })
                .collect(),
        }
    }
}
