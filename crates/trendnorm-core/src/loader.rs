//! Batch Loader: raw tables to typed batches
//!
//! The first column is the date key whatever its header says; every other
//! column is a numeric keyword column. Rows with unresolvable dates and cells
//! that are not numbers are recorded in [`Diagnostics`] rather than failing
//! the batch. Only structural defects (see [`LoadError`]) reject a batch.

use crate::dates::DatePolicy;
use crate::diagnostics::{DateParseIssue, Diagnostics, RowIssue, ValueParseIssue};
use crate::errors::LoadError;
use crate::types::{Batch, BatchRow, Cell, RawTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Marker Google Trends writes for interest below one
pub const BELOW_THRESHOLD_MARKER: &str = "<1";

/// Batch Loader options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LoaderOptions {
    /// Date format resolution order
    pub date_policy: DatePolicy,

    /// Value substituted for `"<1"` cells. `None` treats them as unparseable.
    pub below_threshold_value: Option<f64>,
}

/// Parse one raw table into a [`Batch`]
///
/// Rows are returned date-ascending. When a date occurs more than once the
/// first row wins and later ones are recorded as duplicates.
pub fn load_batch(
    raw: &RawTable,
    options: &LoaderOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Batch, LoadError> {
    let columns = keyword_columns(raw)?;
    let mut rows: BTreeMap<chrono::NaiveDate, BatchRow> = BTreeMap::new();

    for record in &raw.records {
        let raw_date = record.fields.first().map(String::as_str).unwrap_or("");
        let Some(date) = options.date_policy.parse(raw_date) else {
            diagnostics.date_parse_failures.push(DateParseIssue {
                batch: raw.label.clone(),
                line: record.line,
                raw: raw_date.to_string(),
            });
            continue;
        };

        if rows.contains_key(&date) {
            diagnostics.duplicate_dates.push(RowIssue {
                batch: raw.label.clone(),
                date,
            });
            continue;
        }

        let values = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let raw_value = record.fields.get(i + 1).map(String::as_str).unwrap_or("");
                parse_value(raw_value, options).unwrap_or_else(|| {
                    diagnostics.value_parse_failures.push(ValueParseIssue {
                        batch: raw.label.clone(),
                        date,
                        column: column.clone(),
                        raw: raw_value.to_string(),
                    });
                    Cell::Missing
                })
            })
            .collect();

        rows.insert(date, BatchRow { date, values });
    }

    if rows.is_empty() {
        return Err(LoadError::NoValidRows {
            label: raw.label.clone(),
            rows: raw.records.len(),
        });
    }

    Ok(Batch {
        label: raw.label.clone(),
        columns,
        rows: rows.into_values().collect(),
    })
}

/// Validate the header and return the keyword column names
fn keyword_columns(raw: &RawTable) -> Result<Vec<String>, LoadError> {
    if raw.header.len() < 2 {
        return Err(LoadError::TooFewColumns {
            label: raw.label.clone(),
            found: raw.header.len(),
        });
    }

    let mut seen = HashSet::new();
    raw.header[1..]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                return Err(LoadError::EmptyColumnName {
                    label: raw.label.clone(),
                    index: i + 1,
                });
            }
            if !seen.insert(name) {
                return Err(LoadError::DuplicateColumn {
                    label: raw.label.clone(),
                    column: name.to_string(),
                });
            }
            Ok(name.to_string())
        })
        .collect()
}

/// Finite number, or the configured below-threshold substitute
fn parse_value(raw: &str, options: &LoaderOptions) -> Option<Cell> {
    let value = raw.trim();
    if value == BELOW_THRESHOLD_MARKER {
        return options.below_threshold_value.map(Cell::Value);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Cell::Value)
}
