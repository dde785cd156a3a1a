//! Type definitions for batch normalization

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single numeric cell of a keyword column
///
/// Cells are typed once at load time. `Missing` and `Undefined` are distinct
/// on purpose: a missing cell never had a value (join gap, unparseable input),
/// an undefined cell had a value whose scaling factor could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    /// Parsed numeric value
    Value(f64),
    /// No value available
    #[default]
    Missing,
    /// Value exists but its scaling factor is undefined
    Undefined,
}

impl Cell {
    /// Numeric value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(*v),
            Cell::Missing | Cell::Undefined => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Cell::Value(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Cell::Undefined)
    }

    /// Multiply by a scaling factor
    ///
    /// Missing stays missing. A value scaled by an undefined factor becomes
    /// `Undefined`, never 0 and never the unscaled value.
    pub fn scale(self, factor: ScalingFactor) -> Cell {
        match (self, factor) {
            (Cell::Value(v), ScalingFactor::Defined(f)) => Cell::Value(v * f),
            (Cell::Value(_), ScalingFactor::Undefined(_)) => Cell::Undefined,
            (Cell::Missing, _) => Cell::Missing,
            (Cell::Undefined, _) => Cell::Undefined,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Value(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Value)
    }
}

/// Why a scaling factor could not be computed for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The batch's anchor value is zero (division by zero)
    ZeroAnchor,
    /// The batch's anchor cell or the reference cell has no value
    MissingAnchor,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::ZeroAnchor => write!(f, "anchor value is zero"),
            UndefinedReason::MissingAnchor => write!(f, "anchor value is missing"),
        }
    }
}

/// Multiplier aligning a batch row to the reference scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScalingFactor {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl ScalingFactor {
    /// Factor of the reference batch (and of identity alignment)
    pub const IDENTITY: ScalingFactor = ScalingFactor::Defined(1.0);

    /// `reference / current`, undefined when either side has no value or
    /// the divisor is zero
    pub fn from_ratio(reference: Cell, current: Cell) -> ScalingFactor {
        match (reference.as_f64(), current.as_f64()) {
            (Some(_), Some(c)) if c == 0.0 => ScalingFactor::Undefined(UndefinedReason::ZeroAnchor),
            (Some(r), Some(c)) => ScalingFactor::Defined(r / c),
            _ => ScalingFactor::Undefined(UndefinedReason::MissingAnchor),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            ScalingFactor::Defined(f) => Some(*f),
            ScalingFactor::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, ScalingFactor::Defined(_))
    }
}

/// Raw record of a batch source, with the 1-based line it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Decoded but untyped batch table as delivered by a data source
///
/// The title line(s) are already stripped: `header` is the column header row,
/// whose first entry names the date column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Human-readable batch name (usually the file name)
    pub label: String,
    pub header: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(label: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            label: label.into(),
            header,
            records: Vec::new(),
        }
    }

    /// Append a record; line numbers continue after the header
    pub fn push_record(&mut self, fields: Vec<String>) {
        let line = self.records.last().map_or(2, |r| r.line + 1);
        self.records.push(RawRecord { line, fields });
    }

    /// Builder-style variant of [`RawTable::push_record`]
    pub fn with_record<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.push_record(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// One dated row of a batch; `values` follow the batch's column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    pub date: NaiveDate,
    pub values: Vec<Cell>,
}

/// Date-indexed keyword-interest dataset with a fixed schema
///
/// Invariants: rows are date-ascending, dates are unique, and every row has
/// exactly `columns.len()` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub label: String,
    /// Keyword column names, excluding the date key
    pub columns: Vec<String>,
    pub rows: Vec<BatchRow>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Set of keyword names, used for anchor intersection
    pub fn keyword_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    /// Row for a date (rows are sorted, so this is a binary search)
    pub fn row(&self, date: NaiveDate) -> Option<&BatchRow> {
        self.rows
            .binary_search_by_key(&date, |row| row.date)
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn get(&self, date: NaiveDate, column: &str) -> Option<Cell> {
        let index = self.column_index(column)?;
        self.row(date).map(|row| row.values[index])
    }

    /// `date -> cell` mapping of one column
    pub fn series(&self, column: &str) -> Option<BTreeMap<NaiveDate, Cell>> {
        let index = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| (row.date, row.values[index]))
                .collect(),
        )
    }
}

/// One dated row of the merged table; `cells` follow the table's column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub date: NaiveDate,
    pub cells: Vec<Cell>,
}

/// Merged, date-ascending, duplicate-free result of a normalization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NormalizedTable {
    /// Value column names in first-appearance order (date key excluded)
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    pub fn get(&self, date: NaiveDate, column: &str) -> Option<Cell> {
        let index = self.column_index(column)?;
        self.rows
            .binary_search_by_key(&date, |row| row.date)
            .ok()
            .map(|i| self.rows[i].cells[index])
    }

    /// All `(date, cell)` pairs of one column
    pub fn column(&self, column: &str) -> Option<Vec<(NaiveDate, Cell)>> {
        let index = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| (row.date, row.cells[index]))
                .collect(),
        )
    }
}
