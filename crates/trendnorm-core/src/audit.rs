//! Batch-comparison audit table
//!
//! Puts the raw anchor series of two batches side by side, joined on date,
//! with their ratio. This is what a reviewer checks to see how far apart two
//! collection sessions were before rescaling.

use crate::errors::NormalizeError;
use crate::types::{Batch, Cell, ScalingFactor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One shared date of the two compared batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorComparisonRow {
    pub date: NaiveDate,
    pub first: Cell,
    pub second: Cell,
    /// `first / second`, undefined on a zero or missing divisor
    pub ratio: ScalingFactor,
}

/// Anchor values of two batches over their shared dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorComparison {
    pub anchor: String,
    pub first_label: String,
    pub second_label: String,
    /// Column header for the first batch, e.g. `coffee_batch1`
    pub first_column: String,
    pub second_column: String,
    pub rows: Vec<AnchorComparisonRow>,
}

impl AnchorComparison {
    /// Renumber the column headers with 1-based batch numbers
    pub fn with_batch_numbers(mut self, first: usize, second: usize) -> Self {
        self.first_column = format!("{}_batch{first}", self.anchor);
        self.second_column = format!("{}_batch{second}", self.anchor);
        self
    }

    pub fn defined_ratios(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(|r| r.ratio.value())
    }
}

/// Compare the anchor series of batches `first` and `second` (0-based)
///
/// Only dates present in both batches are listed (inner join).
pub fn compare_anchor_series(
    batches: &[Batch],
    anchor: &str,
    first: usize,
    second: usize,
) -> Result<AnchorComparison, NormalizeError> {
    let a = batch_at(batches, first)?;
    let b = batch_at(batches, second)?;
    if first == second {
        return Err(NormalizeError::AuditSameBatch { index: first });
    }

    let first_series = a.series(anchor).unwrap_or_default();
    let second_series = b.series(anchor).unwrap_or_default();

    let rows = first_series
        .iter()
        .filter_map(|(date, &first_cell)| {
            second_series.get(date).map(|&second_cell| AnchorComparisonRow {
                date: *date,
                first: first_cell,
                second: second_cell,
                ratio: ScalingFactor::from_ratio(first_cell, second_cell),
            })
        })
        .collect();

    Ok(AnchorComparison {
        anchor: anchor.to_string(),
        first_label: a.label.clone(),
        second_label: b.label.clone(),
        first_column: format!("{anchor}_batch{}", first + 1),
        second_column: format!("{anchor}_batch{}", second + 1),
        rows,
    })
}

fn batch_at(batches: &[Batch], index: usize) -> Result<&Batch, NormalizeError> {
    batches.get(index).ok_or(NormalizeError::AuditOutOfRange {
        index,
        count: batches.len(),
    })
}
