//! Test utilities for building batches and raw tables
//!
//! - `mod.rs`: small builders used by unit tests
//! - `generators.rs`: deterministic multi-batch scenarios for integration tests

pub mod generators;

use crate::types::{Batch, BatchRow, Cell, RawTable};
use chrono::NaiveDate;

/// Parse an ISO date, panicking on malformed test input
pub fn date(iso: &str) -> NaiveDate {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").unwrap()
}

/// Build a typed batch from `(iso date, values)` rows
///
/// Rows are sorted by date, as the loader would produce them.
pub fn batch(label: &str, columns: &[&str], rows: &[(&str, &[f64])]) -> Batch {
    let mut rows: Vec<BatchRow> = rows
        .iter()
        .map(|(iso, values)| {
            assert_eq!(values.len(), columns.len(), "row width must match columns");
            BatchRow {
                date: date(iso),
                values: values.iter().copied().map(Cell::Value).collect(),
            }
        })
        .collect();
    rows.sort_by_key(|row| row.date);

    Batch {
        label: label.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

/// A batch with the given keyword columns and no rows
pub fn keyword_batch(label: &str, columns: &[&str]) -> Batch {
    batch(label, columns, &[])
}

/// Build a raw table with a `Week` date header, values written with `{}`
pub fn raw_table(label: &str, columns: &[&str], rows: &[(&str, &[f64])]) -> RawTable {
    let header = std::iter::once("Week".to_string())
        .chain(columns.iter().map(|c| c.to_string()))
        .collect();
    rows.iter().fold(RawTable::new(label, header), |table, (iso, values)| {
        table.with_record(
            std::iter::once(iso.to_string()).chain(values.iter().map(|v| v.to_string())),
        )
    })
}
