//! Property tests over generated collection sessions written to disk

mod common;

use common::{settings_in, write_batch_files};
use proptest::prelude::*;
use tempfile::TempDir;
use trendnorm::batch::NormalizationEngine;
use trendnorm::core::test_utils::generators::{
    keyword_name, true_interest, weekly_scenario, ScenarioBatch,
};
use trendnorm::core::{Cell, JoinPolicy, ScalingMode};

fn sessions() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.05f64..20.0, 2..5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_keyword_lands_on_reference_scale(
        scales in sessions(),
        reference_seed in 0usize..8,
        batch_wise in any::<bool>(),
    ) {
        let reference = reference_seed % scales.len();
        let batches: Vec<ScenarioBatch> = scales
            .iter()
            .enumerate()
            .map(|(i, &scale)| ScenarioBatch { keywords: vec![i + 1], scale })
            .collect();

        let dir = TempDir::new().unwrap();
        let paths = write_batch_files(dir.path(), &weekly_scenario(&batches, 8));
        let mut settings = settings_in(dir.path());
        settings.normalization.reference_batch = reference;
        settings.normalization.join = JoinPolicy::Inner;
        if batch_wise {
            settings.normalization.scaling_mode = ScalingMode::BatchWise;
        }

        let report = NormalizationEngine::new(settings).unwrap().run(&paths).unwrap();
        let table = &report.normalization.table;
        let target = scales[reference];

        prop_assert_eq!(table.len(), 8);
        prop_assert_eq!(table.columns.len(), scales.len() + 1);
        for (week, row) in table.rows.iter().enumerate() {
            for (column, cell) in table.columns.iter().zip(&row.cells) {
                let keyword: usize = column.trim_start_matches("kw").parse().unwrap();
                let expected = true_interest(keyword, week) * target;
                match cell {
                    Cell::Value(v) => prop_assert!(
                        (v - expected).abs() <= 1e-9 * expected,
                        "{} week {}: {} != {}", column, week, v, expected
                    ),
                    other => prop_assert!(false, "{} week {}: {:?}", column, week, other),
                }
            }
        }
        prop_assert_eq!(report.factor_statistics.len(), scales.len() - 1);
    }

    #[test]
    fn reference_batch_passes_through(
        scales in sessions(),
    ) {
        let batches: Vec<ScenarioBatch> = scales
            .iter()
            .enumerate()
            .map(|(i, &scale)| ScenarioBatch { keywords: vec![i + 1], scale })
            .collect();

        let dir = TempDir::new().unwrap();
        let tables = weekly_scenario(&batches, 6);
        let paths = write_batch_files(dir.path(), &tables);
        let report = NormalizationEngine::new(settings_in(dir.path()))
            .unwrap()
            .run(&paths)
            .unwrap();

        let reference = &report.normalization.batches[0];
        let scaled = &report.normalization.scaled[0];
        prop_assert!(scaled.is_reference);
        prop_assert_eq!(&scaled.batch, reference);
        for column in [keyword_name(0), keyword_name(1)] {
            prop_assert_eq!(
                report.normalization.table.column(&column),
                Some(reference.series(&column).unwrap().into_iter().collect::<Vec<_>>())
            );
        }
    }
}
