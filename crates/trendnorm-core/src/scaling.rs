//! Scaling Engine
//!
//! Rescales every batch onto the reference batch's scale using the anchor
//! column. For a batch row aligned (by date) with the reference series:
//!
//! ```text
//! factor = reference_anchor / batch_anchor
//! scaled = value * factor          (every value column)
//! ```
//!
//! ## Policies
//!
//! - Alignment is an inner join on date: rows without a reference date are
//!   dropped and reported in [`ScaledBatch::unaligned_dates`].
//! - A zero or missing anchor gives an undefined factor; every value in that
//!   row becomes [`Cell::Undefined`] and the row is reported.
//! - [`ScalingMode`] chooses one factor per date or one per batch. In
//!   batch mode the median applies only to rows whose own ratio is defined.
//! - [`AnchorPolicy`] chooses how the anchor column itself is rewritten.
//! - The reference batch passes through unscaled (factor 1).
//!
//! No rounding happens here.

use crate::anchor::common_keywords;
use crate::diagnostics::{Diagnostics, RowIssue, UndefinedFactorIssue};
use crate::errors::{AnchorError, NormalizeError};
use crate::types::{Batch, BatchRow, Cell, ScalingFactor, UndefinedReason};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Granularity of scaling factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Independent factor per aligned date
    #[default]
    RowWise,
    /// One factor per batch: median of the defined per-date ratios
    BatchWise,
}

/// Treatment of the anchor column in a scaled batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPolicy {
    /// Anchor cell becomes the reference series cell for that date
    #[default]
    ReplaceWithReference,
    /// Anchor cell is multiplied by its factor like any other column
    ScaleInPlace,
}

/// Scaling Engine options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScalingOptions {
    /// Index of the batch whose anchor values define the target scale
    pub reference_batch: usize,
    pub mode: ScalingMode,
    pub anchor_policy: AnchorPolicy,
}

/// A batch rescaled onto the reference scale
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledBatch {
    /// Rescaled rows (aligned rows only, except for the reference batch)
    pub batch: Batch,
    /// Factor applied to each row of `batch`, in row order
    pub factors: Vec<(NaiveDate, ScalingFactor)>,
    /// Dates dropped because the reference series has no row for them
    pub unaligned_dates: Vec<NaiveDate>,
    pub is_reference: bool,
}

impl ScaledBatch {
    pub fn label(&self) -> &str {
        &self.batch.label
    }

    pub fn defined_factors(&self) -> impl Iterator<Item = f64> + '_ {
        self.factors.iter().filter_map(|(_, f)| f.value())
    }

    pub fn undefined_count(&self) -> usize {
        self.factors.iter().filter(|(_, f)| !f.is_defined()).count()
    }
}

/// Rescale every batch onto the reference batch's anchor series
///
/// Returns one [`ScaledBatch`] per input batch, in input order.
pub fn scale_batches(
    batches: &[Batch],
    anchor: &str,
    options: &ScalingOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ScaledBatch>, NormalizeError> {
    let reference = batches
        .get(options.reference_batch)
        .ok_or(NormalizeError::ReferenceOutOfRange {
            index: options.reference_batch,
            count: batches.len(),
        })?;

    let reference_series = reference
        .series(anchor)
        .ok_or_else(|| anchor_not_common(batches, anchor))?;

    batches
        .iter()
        .enumerate()
        .map(|(index, batch)| {
            if index == options.reference_batch {
                Ok(pass_through(batch))
            } else {
                scale_batch(batch, anchor, &reference_series, options, diagnostics)
            }
        })
        .collect()
}

/// Rescale one batch against a reference anchor series
pub fn scale_batch(
    batch: &Batch,
    anchor: &str,
    reference: &BTreeMap<NaiveDate, Cell>,
    options: &ScalingOptions,
    diagnostics: &mut Diagnostics,
) -> Result<ScaledBatch, NormalizeError> {
    let anchor_index = batch
        .column_index(anchor)
        .ok_or_else(|| anchor_not_common(std::slice::from_ref(batch), anchor))?;

    let mut aligned: Vec<(&BatchRow, Cell, ScalingFactor)> = Vec::with_capacity(batch.len());
    let mut unaligned_dates = Vec::new();

    for row in &batch.rows {
        match reference.get(&row.date) {
            Some(&reference_cell) => {
                let factor = ScalingFactor::from_ratio(reference_cell, row.values[anchor_index]);
                aligned.push((row, reference_cell, factor));
            }
            None => {
                unaligned_dates.push(row.date);
                diagnostics.unaligned_rows.push(RowIssue {
                    batch: batch.label.clone(),
                    date: row.date,
                });
            }
        }
    }

    // Rows with an undefined ratio of their own stay undefined
    if options.mode == ScalingMode::BatchWise {
        let batch_factor = median_factor(aligned.iter().map(|(_, _, f)| *f));
        for entry in aligned.iter_mut().filter(|(_, _, f)| f.is_defined()) {
            entry.2 = batch_factor;
        }
    }

    let mut rows = Vec::with_capacity(aligned.len());
    let mut factors = Vec::with_capacity(aligned.len());

    for (row, reference_cell, factor) in aligned {
        if let ScalingFactor::Undefined(reason) = factor {
            diagnostics.undefined_factors.push(UndefinedFactorIssue {
                batch: batch.label.clone(),
                date: row.date,
                reason,
            });
        }

        let values = row
            .values
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == anchor_index && options.anchor_policy == AnchorPolicy::ReplaceWithReference {
                    if reference_cell.is_value() {
                        reference_cell
                    } else {
                        Cell::Undefined
                    }
                } else {
                    cell.scale(factor)
                }
            })
            .collect();

        rows.push(BatchRow {
            date: row.date,
            values,
        });
        factors.push((row.date, factor));
    }

    Ok(ScaledBatch {
        batch: Batch {
            label: batch.label.clone(),
            columns: batch.columns.clone(),
            rows,
        },
        factors,
        unaligned_dates,
        is_reference: false,
    })
}

fn pass_through(batch: &Batch) -> ScaledBatch {
    ScaledBatch {
        factors: batch
            .dates()
            .map(|date| (date, ScalingFactor::IDENTITY))
            .collect(),
        batch: batch.clone(),
        unaligned_dates: Vec::new(),
        is_reference: true,
    }
}

/// Median of the defined factors; undefined when none is defined
///
/// The undefined reason is `ZeroAnchor` if any row had a zero anchor,
/// otherwise `MissingAnchor`.
pub fn median_factor(factors: impl IntoIterator<Item = ScalingFactor>) -> ScalingFactor {
    let mut defined = Vec::new();
    let mut saw_zero = false;

    for factor in factors {
        match factor {
            ScalingFactor::Defined(f) => defined.push(f),
            ScalingFactor::Undefined(UndefinedReason::ZeroAnchor) => saw_zero = true,
            ScalingFactor::Undefined(UndefinedReason::MissingAnchor) => {}
        }
    }

    if defined.is_empty() {
        let reason = if saw_zero {
            UndefinedReason::ZeroAnchor
        } else {
            UndefinedReason::MissingAnchor
        };
        return ScalingFactor::Undefined(reason);
    }

    defined.sort_by(f64::total_cmp);
    let mid = defined.len() / 2;
    let median = if defined.len() % 2 == 0 {
        (defined[mid - 1] + defined[mid]) / 2.0
    } else {
        defined[mid]
    };
    ScalingFactor::Defined(median)
}

fn anchor_not_common(batches: &[Batch], anchor: &str) -> NormalizeError {
    NormalizeError::Anchor(AnchorError::AnchorNotCommon {
        requested: anchor.to_string(),
        candidates: common_keywords(batches),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{batch, date};

    fn end_to_end_batches() -> Vec<Batch> {
        vec![
            batch("ref", &["kw", "other"], &[("2024-01-01", &[50.0, 5.0])]),
            batch(
                "b1",
                &["kw", "other"],
                &[("2024-01-01", &[100.0, 10.0]), ("2024-01-02", &[200.0, 20.0])],
            ),
        ]
    }

    #[test]
    fn test_end_to_end_factor_and_drop() {
        let mut diagnostics = Diagnostics::new();
        let scaled = scale_batches(
            &end_to_end_batches(),
            "kw",
            &ScalingOptions::default(),
            &mut diagnostics,
        )
        .unwrap();

        let b1 = &scaled[1];
        assert_eq!(b1.factors, vec![(date("2024-01-01"), ScalingFactor::Defined(0.5))]);
        assert_eq!(b1.batch.len(), 1);
        assert_eq!(b1.batch.get(date("2024-01-01"), "kw"), Some(Cell::Value(50.0)));
        assert_eq!(b1.batch.get(date("2024-01-01"), "other"), Some(Cell::Value(5.0)));
        assert_eq!(b1.unaligned_dates, vec![date("2024-01-02")]);
        assert_eq!(diagnostics.unaligned_rows.len(), 1);
    }

    #[test]
    fn test_scale_in_place_matches_reference() {
        let options = ScalingOptions {
            anchor_policy: AnchorPolicy::ScaleInPlace,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let scaled = scale_batches(&end_to_end_batches(), "kw", &options, &mut diagnostics).unwrap();

        assert_eq!(scaled[1].batch.get(date("2024-01-01"), "kw"), Some(Cell::Value(50.0)));
    }

    #[test]
    fn test_reference_passes_through() {
        let batches = end_to_end_batches();
        let mut diagnostics = Diagnostics::new();
        let scaled =
            scale_batches(&batches, "kw", &ScalingOptions::default(), &mut diagnostics).unwrap();

        assert!(scaled[0].is_reference);
        assert_eq!(scaled[0].batch, batches[0]);
        assert!(scaled[0].factors.iter().all(|(_, f)| *f == ScalingFactor::IDENTITY));
    }

    #[test]
    fn test_zero_anchor_marks_row_undefined() {
        let batches = vec![
            batch("ref", &["kw", "x"], &[("2024-01-01", &[40.0, 1.0]), ("2024-01-02", &[30.0, 1.0])]),
            batch("b", &["kw", "x"], &[("2024-01-01", &[0.0, 7.0]), ("2024-01-02", &[60.0, 8.0])]),
        ];
        let mut diagnostics = Diagnostics::new();
        let scaled =
            scale_batches(&batches, "kw", &ScalingOptions::default(), &mut diagnostics).unwrap();

        let b = &scaled[1].batch;
        assert_eq!(b.get(date("2024-01-01"), "x"), Some(Cell::Undefined));
        // Anchor keeps the reference value under replace-with-reference
        assert_eq!(b.get(date("2024-01-01"), "kw"), Some(Cell::Value(40.0)));
        assert_eq!(b.get(date("2024-01-02"), "x"), Some(Cell::Value(4.0)));
        assert_eq!(diagnostics.undefined_factors.len(), 1);
        assert_eq!(diagnostics.undefined_factors[0].reason, UndefinedReason::ZeroAnchor);
    }

    #[test]
    fn test_zero_anchor_scale_in_place_is_undefined() {
        let batches = vec![
            batch("ref", &["kw"], &[("2024-01-01", &[40.0])]),
            batch("b", &["kw"], &[("2024-01-01", &[0.0])]),
        ];
        let options = ScalingOptions {
            anchor_policy: AnchorPolicy::ScaleInPlace,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let scaled = scale_batches(&batches, "kw", &options, &mut diagnostics).unwrap();

        assert_eq!(scaled[1].batch.get(date("2024-01-01"), "kw"), Some(Cell::Undefined));
    }

    #[test]
    fn test_batch_wise_uses_median_ratio() {
        let batches = vec![
            batch(
                "ref",
                &["kw", "x"],
                &[("2024-01-01", &[10.0, 0.0]), ("2024-01-02", &[20.0, 0.0]), ("2024-01-03", &[90.0, 0.0])],
            ),
            batch(
                "b",
                &["kw", "x"],
                &[("2024-01-01", &[20.0, 2.0]), ("2024-01-02", &[40.0, 4.0]), ("2024-01-03", &[30.0, 6.0])],
            ),
        ];
        let options = ScalingOptions {
            mode: ScalingMode::BatchWise,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let scaled = scale_batches(&batches, "kw", &options, &mut diagnostics).unwrap();

        // Ratios 0.5, 0.5, 3.0 -> median 0.5 for every row
        assert!(scaled[1]
            .factors
            .iter()
            .all(|(_, f)| *f == ScalingFactor::Defined(0.5)));
        assert_eq!(scaled[1].batch.get(date("2024-01-03"), "x"), Some(Cell::Value(3.0)));
    }

    #[test]
    fn test_batch_wise_zero_anchor_stays_undefined() {
        let batches = vec![
            batch("ref", &["kw", "x"], &[("2024-01-01", &[40.0, 1.0]), ("2024-01-02", &[30.0, 1.0])]),
            batch("b", &["kw", "x"], &[("2024-01-01", &[0.0, 7.0]), ("2024-01-02", &[60.0, 8.0])]),
        ];
        let options = ScalingOptions {
            mode: ScalingMode::BatchWise,
            anchor_policy: AnchorPolicy::ScaleInPlace,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let scaled = scale_batches(&batches, "kw", &options, &mut diagnostics).unwrap();

        let b = &scaled[1];
        assert_eq!(
            b.factors,
            vec![
                (date("2024-01-01"), ScalingFactor::Undefined(UndefinedReason::ZeroAnchor)),
                (date("2024-01-02"), ScalingFactor::Defined(0.5)),
            ]
        );
        assert_eq!(b.batch.get(date("2024-01-01"), "kw"), Some(Cell::Undefined));
        assert_eq!(b.batch.get(date("2024-01-01"), "x"), Some(Cell::Undefined));
        assert_eq!(b.batch.get(date("2024-01-02"), "x"), Some(Cell::Value(4.0)));
        assert_eq!(diagnostics.undefined_in("b"), 1);
        assert_eq!(diagnostics.undefined_factors[0].reason, UndefinedReason::ZeroAnchor);
    }

    #[test]
    fn test_batch_wise_missing_reference_stays_undefined() {
        let mut reference = batch("ref", &["kw"], &[("2024-01-01", &[40.0]), ("2024-01-02", &[30.0])]);
        reference.rows[0].values[0] = Cell::Missing;
        let batches = vec![
            reference,
            batch("b", &["kw", "x"], &[("2024-01-01", &[20.0, 2.0]), ("2024-01-02", &[60.0, 8.0])]),
        ];
        let options = ScalingOptions {
            mode: ScalingMode::BatchWise,
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let scaled = scale_batches(&batches, "kw", &options, &mut diagnostics).unwrap();

        assert_eq!(
            scaled[1].factors[0].1,
            ScalingFactor::Undefined(UndefinedReason::MissingAnchor)
        );
        assert_eq!(scaled[1].batch.get(date("2024-01-01"), "x"), Some(Cell::Undefined));
        assert_eq!(scaled[1].batch.get(date("2024-01-02"), "x"), Some(Cell::Value(4.0)));
        assert_eq!(diagnostics.undefined_in("b"), 1);
    }

    #[test]
    fn test_median_factor() {
        use ScalingFactor::{Defined, Undefined};
        assert_eq!(median_factor([Defined(1.0), Defined(3.0)]), Defined(2.0));
        assert_eq!(
            median_factor([Defined(4.0), Undefined(UndefinedReason::ZeroAnchor), Defined(1.0), Defined(2.0)]),
            Defined(2.0)
        );
        assert_eq!(
            median_factor([Undefined(UndefinedReason::ZeroAnchor)]),
            Undefined(UndefinedReason::ZeroAnchor)
        );
        assert_eq!(median_factor([]), Undefined(UndefinedReason::MissingAnchor));
    }

    #[test]
    fn test_reference_index_out_of_range() {
        let mut diagnostics = Diagnostics::new();
        let options = ScalingOptions {
            reference_batch: 5,
            ..Default::default()
        };

        assert_eq!(
            scale_batches(&end_to_end_batches(), "kw", &options, &mut diagnostics),
            Err(NormalizeError::ReferenceOutOfRange { index: 5, count: 2 })
        );
    }

    #[test]
    fn test_non_default_reference_batch() {
        let mut diagnostics = Diagnostics::new();
        let options = ScalingOptions {
            reference_batch: 1,
            ..Default::default()
        };
        let scaled = scale_batches(&end_to_end_batches(), "kw", &options, &mut diagnostics).unwrap();

        // ref is now rescaled onto b1: 100 / 50 = 2
        assert!(scaled[1].is_reference);
        assert_eq!(scaled[0].factors, vec![(date("2024-01-01"), ScalingFactor::Defined(2.0))]);
        assert_eq!(scaled[0].batch.get(date("2024-01-01"), "other"), Some(Cell::Value(10.0)));
    }
}
