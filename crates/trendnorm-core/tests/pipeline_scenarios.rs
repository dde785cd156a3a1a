//! End-to-end normalization scenarios over raw tables

use trendnorm_core::test_utils::generators::{keyword_name, true_interest, weekly_scenario, ScenarioBatch};
use trendnorm_core::test_utils::{date, raw_table};
use trendnorm_core::{
    common_keywords, normalize, resolve_anchor, AnchorError, AnchorSelection, Cell, JoinPolicy,
    NormalizeError, NormalizeOptions, ResultFormatter, ScalingMode,
};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9 * expected.abs().max(1.0),
        "{actual} != {expected}"
    );
}

#[test]
fn worked_example_factor_half() {
    let tables = vec![
        raw_table("ref.csv", &["kw", "other"], &[("2024-01-01", &[50.0, 5.0])]),
        raw_table(
            "b1.csv",
            &["kw", "other"],
            &[("2024-01-01", &[100.0, 10.0]), ("2024-01-02", &[200.0, 20.0])],
        ),
    ];

    let result = normalize(&tables, &NormalizeOptions::default()).unwrap();

    assert_eq!(result.scaled[1].factors[0].1.value(), Some(0.5));
    assert_eq!(result.table.get(date("2024-01-01"), "other"), Some(Cell::Value(5.0)));
    assert_eq!(result.scaled[1].unaligned_dates, vec![date("2024-01-02")]);
    assert_eq!(result.diagnostics.unaligned_rows.len(), 1);
}

#[test]
fn intersection_examples() {
    let tables = vec![
        raw_table("1", &["A", "B", "C"], &[("2024-01-01", &[1.0, 1.0, 1.0])]),
        raw_table("2", &["B", "C", "D"], &[("2024-01-01", &[1.0, 1.0, 1.0])]),
        raw_table("3", &["B", "C", "E"], &[("2024-01-01", &[1.0, 1.0, 1.0])]),
    ];
    let options = NormalizeOptions {
        anchor: AnchorSelection::Named("C".to_string()),
        ..Default::default()
    };
    let result = normalize(&tables, &options).unwrap();
    assert_eq!(result.candidates, vec!["B", "C"]);
    assert_eq!(common_keywords(&result.batches), vec!["B", "C"]);
    assert_eq!(result.anchor, "C");

    let disjoint = vec![
        raw_table("x.csv", &["A", "B"], &[("2024-01-01", &[1.0, 1.0])]),
        raw_table("y.csv", &["C", "D"], &[("2024-01-01", &[1.0, 1.0])]),
    ];
    match normalize(&disjoint, &NormalizeOptions::default()) {
        Err(NormalizeError::Anchor(AnchorError::NoCommonAnchor { batches })) => {
            assert_eq!(batches.len(), 2);
            assert_eq!(batches[0].0, "x.csv");
        }
        other => panic!("expected NoCommonAnchor, got {other:?}"),
    }
}

#[test]
fn generated_sessions_recover_reference_scale() {
    let scenario = [
        ScenarioBatch { keywords: vec![1, 2], scale: 1.0 },
        ScenarioBatch { keywords: vec![3, 4], scale: 2.5 },
        ScenarioBatch { keywords: vec![5], scale: 0.4 },
    ];
    let tables = weekly_scenario(&scenario, 26);

    for mode in [ScalingMode::RowWise, ScalingMode::BatchWise] {
        let mut options = NormalizeOptions::default();
        options.scaling.mode = mode;
        let result = normalize(&tables, &options).unwrap();

        assert_eq!(result.anchor, keyword_name(0));
        assert_eq!(result.table.len(), 26);
        assert!(result.diagnostics.is_empty());

        for (week, row) in result.table.rows.iter().enumerate() {
            for (column, cell) in result.table.columns.iter().zip(&row.cells) {
                let keyword: usize = column.trim_start_matches("kw").parse().unwrap();
                assert_close(cell.as_f64().unwrap(), true_interest(keyword, week));
            }
        }
    }
}

#[test]
fn inner_join_limits_dates() {
    let tables = vec![
        raw_table("a", &["kw", "x"], &[("2024-01-01", &[10.0, 1.0]), ("2024-01-08", &[10.0, 1.0])]),
        raw_table("b", &["kw", "y"], &[("2024-01-08", &[20.0, 4.0])]),
    ];
    let options = NormalizeOptions {
        join: JoinPolicy::Inner,
        ..Default::default()
    };

    let result = normalize(&tables, &options).unwrap();
    assert_eq!(result.table.dates().collect::<Vec<_>>(), vec![date("2024-01-08")]);
    assert_eq!(result.table.get(date("2024-01-08"), "y"), Some(Cell::Value(2.0)));

    let outer = normalize(&tables, &NormalizeOptions::default()).unwrap();
    assert_eq!(outer.table.get(date("2024-01-01"), "y"), Some(Cell::Missing));
}

#[test]
fn mixed_date_formats_and_markers() {
    let tables = vec![
        raw_table("iso.csv", &["kw", "x"], &[("2024-01-07", &[50.0, 10.0]), ("2024-01-14", &[40.0, 8.0])]),
        trendnorm_core::RawTable::new("us.csv", vec!["Week".into(), "kw".into(), "z".into()])
            .with_record(["01/07/2024", "25", "<1"])
            .with_record(["01/14/24", "0", "3"]),
    ];

    let result = normalize(&tables, &NormalizeOptions::default()).unwrap();

    assert_eq!(result.table.get(date("2024-01-07"), "z"), Some(Cell::Missing));
    assert_eq!(result.table.get(date("2024-01-14"), "z"), Some(Cell::Undefined));
    assert_eq!(result.diagnostics.value_parse_failures.len(), 1);
    assert_eq!(result.diagnostics.undefined_factors.len(), 1);

    let rendered = ResultFormatter::with_precision(Some(2)).render(&result.table);
    assert_eq!(rendered.header, vec!["date", "kw", "x", "z"]);
    assert_eq!(rendered.rows[1], vec!["2024-01-14", "40.00", "8.00", "NaN"]);
}

#[test]
fn resolve_anchor_selection_modes() {
    let tables = vec![
        raw_table("a", &["p", "q"], &[("2024-01-01", &[1.0, 2.0])]),
        raw_table("b", &["q", "p"], &[("2024-01-01", &[1.0, 2.0])]),
    ];
    let batches = normalize(
        &tables,
        &NormalizeOptions {
            anchor: AnchorSelection::FirstCandidate,
            ..Default::default()
        },
    )
    .unwrap()
    .batches;

    assert_eq!(
        resolve_anchor(&batches, &AnchorSelection::Unique),
        Err(AnchorError::AmbiguousAnchor {
            candidates: vec!["p".to_string(), "q".to_string()]
        })
    );
    assert_eq!(
        resolve_anchor(&batches, &AnchorSelection::Named("q".into())).as_deref(),
        Ok("q")
    );
    assert!(matches!(
        resolve_anchor(&batches, &AnchorSelection::Named("r".into())),
        Err(AnchorError::AnchorNotCommon { .. })
    ));
}
