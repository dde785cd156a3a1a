//! Scaling-factor statistics per batch, computed with Polars lazy expressions

use crate::engine::EngineError;
use polars::frame::row::Row;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use trendnorm_core::ScaledBatch;

/// Summary of the factors applied to one rescaled batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FactorStatistics {
    pub batch: String,
    pub defined: usize,
    pub undefined: usize,
    /// Rows dropped for lack of a reference date
    pub unaligned: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; needs at least two defined factors
    pub std: Option<f64>,
}

/// Statistics for every non-reference batch, in batch order
pub fn factor_statistics(scaled: &[ScaledBatch]) -> Result<Vec<FactorStatistics>, EngineError> {
    scaled
        .iter()
        .filter(|batch| !batch.is_reference)
        .map(batch_statistics)
        .collect()
}

fn batch_statistics(batch: &ScaledBatch) -> Result<FactorStatistics, EngineError> {
    let factors: Vec<f64> = batch.defined_factors().collect();

    let mut stats = FactorStatistics {
        batch: batch.label().to_string(),
        defined: factors.len(),
        undefined: batch.undefined_count(),
        unaligned: batch.unaligned_dates.len(),
        ..Default::default()
    };
    if factors.is_empty() {
        return Ok(stats);
    }

    let df = DataFrame::new(vec![Column::new("factor".into(), &factors)]).map_err(|e| {
        EngineError::ComputationFailed {
            operation: "factor_frame".to_string(),
            source: e.into(),
        }
    })?;

    let stats_df = df
        .lazy()
        .select([
            col("factor").mean().alias("mean"),
            col("factor").median().alias("median"),
            col("factor").min().alias("min"),
            col("factor").max().alias("max"),
            col("factor").std(1).alias("std"),
        ])
        .collect()
        .map_err(|e| EngineError::ComputationFailed {
            operation: "factor_statistics".to_string(),
            source: e.into(),
        })?;

    let row = stats_df
        .get_row(0)
        .map_err(|e| EngineError::ComputationFailed {
            operation: "extract_factor_statistics".to_string(),
            source: e.into(),
        })?;

    stats.mean = extract_f64_value(&row, 0)?;
    stats.median = extract_f64_value(&row, 1)?;
    stats.min = extract_f64_value(&row, 2)?;
    stats.max = extract_f64_value(&row, 3)?;
    stats.std = extract_f64_value(&row, 4)?;
    Ok(stats)
}

/// Extract an optional f64 from a Polars row (null is `None`)
fn extract_f64_value(row: &Row, index: usize) -> Result<Option<f64>, EngineError> {
    match row.0.get(index) {
        Some(AnyValue::Float64(val)) => Ok(Some(*val)),
        Some(AnyValue::Float32(val)) => Ok(Some(*val as f64)),
        Some(AnyValue::Null) => Ok(None),
        Some(other) => Err(EngineError::ValueExtractionFailed {
            operation: format!("extract_f64_at_index_{}", index),
            source: format!("Unexpected type: {:?}", other).into(),
        }),
        None => Err(EngineError::ValueExtractionFailed {
            operation: format!("extract_f64_at_index_{}", index),
            source: "Value not found".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendnorm_core::test_utils::{batch, date};
    use trendnorm_core::{ScalingFactor, UndefinedReason};

    fn scaled(label: &str, factors: Vec<ScalingFactor>, unaligned: usize) -> ScaledBatch {
        ScaledBatch {
            batch: batch(label, &["kw"], &[]),
            factors: factors
                .into_iter()
                .enumerate()
                .map(|(i, f)| (date(&format!("2024-01-{:02}", i + 1)), f))
                .collect(),
            unaligned_dates: vec![date("2023-12-01"); unaligned],
            is_reference: false,
        }
    }

    #[test]
    fn test_factor_statistics() {
        let batches = vec![
            ScaledBatch {
                is_reference: true,
                ..scaled("ref", vec![ScalingFactor::IDENTITY], 0)
            },
            scaled(
                "b",
                vec![
                    ScalingFactor::Defined(0.5),
                    ScalingFactor::Defined(1.5),
                    ScalingFactor::Defined(1.0),
                    ScalingFactor::Undefined(UndefinedReason::ZeroAnchor),
                ],
                2,
            ),
        ];

        let stats = factor_statistics(&batches).unwrap();

        assert_eq!(stats.len(), 1);
        let b = &stats[0];
        assert_eq!(b.batch, "b");
        assert_eq!((b.defined, b.undefined, b.unaligned), (3, 1, 2));
        assert_eq!(b.mean, Some(1.0));
        assert_eq!(b.median, Some(1.0));
        assert_eq!(b.min, Some(0.5));
        assert_eq!(b.max, Some(1.5));
        assert!((b.std.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_defined_factors() {
        let batches = vec![scaled(
            "b",
            vec![ScalingFactor::Undefined(UndefinedReason::MissingAnchor)],
            0,
        )];

        let stats = factor_statistics(&batches).unwrap();
        assert_eq!(stats[0].defined, 0);
        assert_eq!(stats[0].mean, None);
        assert_eq!(stats[0].std, None);
    }

    #[test]
    fn test_single_factor_has_no_std() {
        let stats = factor_statistics(&[scaled("b", vec![ScalingFactor::Defined(2.0)], 0)]).unwrap();
        assert_eq!(stats[0].mean, Some(2.0));
        assert_eq!(stats[0].std, None);
    }
}
