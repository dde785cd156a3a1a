//! Chart series selection
//!
//! Picks value columns of a normalized table for plotting. Without an
//! explicit selection the first two value columns are used.

use crate::errors::SeriesError;
use crate::types::NormalizedTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of columns plotted when none are requested
pub const DEFAULT_SERIES_COUNT: usize = 2;

/// One plottable series; `None` points are gaps (missing or undefined cells)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl ChartSeries {
    pub fn defined_points(&self) -> usize {
        self.points.iter().filter(|(_, v)| v.is_some()).count()
    }
}

/// Select series from `table`, in request order
///
/// `None` (or an empty request) selects the first two value columns.
pub fn select_series(
    table: &NormalizedTable,
    requested: Option<&[String]>,
) -> Result<Vec<ChartSeries>, SeriesError> {
    let names: Vec<&str> = match requested {
        Some(names) if !names.is_empty() => names.iter().map(String::as_str).collect(),
        _ => table
            .columns
            .iter()
            .take(DEFAULT_SERIES_COUNT)
            .map(String::as_str)
            .collect(),
    };

    names
        .into_iter()
        .map(|name| {
            let column = table.column(name).ok_or_else(|| SeriesError::UnknownColumn {
                column: name.to_string(),
                available: table.columns.clone(),
            })?;
            Ok(ChartSeries {
                name: name.to_string(),
                points: column
                    .into_iter()
                    .map(|(date, cell)| (date, cell.as_f64()))
                    .collect(),
            })
        })
        .collect()
}
