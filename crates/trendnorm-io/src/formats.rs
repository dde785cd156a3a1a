//! Format conversion between normalized tables and Polars DataFrames
//!
//! Two encodings are produced:
//! - typed: date as formatted text, value columns as nullable `f64`
//!   (missing is null, undefined is NaN), rounded by the formatter
//! - text: every column rendered by the [`ResultFormatter`], so markers and
//!   fixed decimals survive text sinks exactly

use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use trendnorm_core::{
    AnchorComparison, Cell, ChartSeries, NormalizedTable, ResultFormatter, ScalingFactor, TableRow,
};

/// Header of the ratio column in the audit sheet
pub const RATIO_COLUMN: &str = "ratio";

/// Trait for converting between tables and Polars DataFrames
pub trait DataFrameConverter: Sized {
    /// Typed DataFrame (nullable `f64` value columns)
    fn to_polars_dataframe(&self, formatter: &ResultFormatter) -> PolarsResult<DataFrame>;

    /// All-text DataFrame rendered by `formatter`
    fn to_text_dataframe(&self, formatter: &ResultFormatter) -> PolarsResult<DataFrame>;

    /// Rebuild from a typed DataFrame
    fn from_polars_dataframe(
        df: &DataFrame,
        formatter: &ResultFormatter,
    ) -> Result<Self, ConversionError>;
}

/// Conversion errors with rich context
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Invalid data type for column '{column}': expected {expected}, got {actual}")]
    InvalidDataType {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Row {row} of column '{column}' is not a date in format '{format}': {value:?}")]
    InvalidDate {
        column: String,
        row: usize,
        format: String,
        value: Option<String>,
    },

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

impl DataFrameConverter for NormalizedTable {
    fn to_polars_dataframe(&self, formatter: &ResultFormatter) -> PolarsResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(date_column(&self.rows, formatter));

        for (index, name) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|row| typed_value(formatter, row.cells[index]))
                .collect();
            columns.push(Column::new(name.as_str().into(), &values));
        }

        DataFrame::new(columns)
    }

    fn to_text_dataframe(&self, formatter: &ResultFormatter) -> PolarsResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(date_column(&self.rows, formatter));

        for (index, name) in self.columns.iter().enumerate() {
            let values: Vec<String> = self
                .rows
                .iter()
                .map(|row| formatter.format_cell(row.cells[index]))
                .collect();
            columns.push(Column::new(name.as_str().into(), &values));
        }

        DataFrame::new(columns)
    }

    fn from_polars_dataframe(
        df: &DataFrame,
        formatter: &ResultFormatter,
    ) -> Result<Self, ConversionError> {
        let dates = extract_date_column(df, formatter)?;

        let value_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| *name != formatter.date_column)
            .collect();

        let mut value_columns = Vec::with_capacity(value_names.len());
        for name in &value_names {
            value_columns.push(extract_cell_column(df, name)?);
        }

        let rows = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| TableRow {
                date,
                cells: value_columns.iter().map(|column| column[i]).collect(),
            })
            .collect();

        Ok(NormalizedTable {
            columns: value_names,
            rows,
        })
    }
}

/// Audit comparison as a three-column table: both anchor series and their ratio
pub fn audit_table(comparison: &AnchorComparison) -> NormalizedTable {
    NormalizedTable {
        columns: vec![
            comparison.first_column.clone(),
            comparison.second_column.clone(),
            RATIO_COLUMN.to_string(),
        ],
        rows: comparison
            .rows
            .iter()
            .map(|row| TableRow {
                date: row.date,
                cells: vec![row.first, row.second, factor_cell(row.ratio)],
            })
            .collect(),
    }
}

/// Chart series as a date-keyed table, gaps as missing cells
pub fn chart_table(series: &[ChartSeries]) -> NormalizedTable {
    let mut rows: BTreeMap<NaiveDate, Vec<Cell>> = BTreeMap::new();

    for (index, s) in series.iter().enumerate() {
        for (date, value) in &s.points {
            let cells = rows
                .entry(*date)
                .or_insert_with(|| vec![Cell::Missing; series.len()]);
            cells[index] = Cell::from(*value);
        }
    }

    NormalizedTable {
        columns: series.iter().map(|s| s.name.clone()).collect(),
        rows: rows
            .into_iter()
            .map(|(date, cells)| TableRow { date, cells })
            .collect(),
    }
}

fn factor_cell(factor: ScalingFactor) -> Cell {
    match factor {
        ScalingFactor::Defined(value) => Cell::Value(value),
        ScalingFactor::Undefined(_) => Cell::Undefined,
    }
}

fn typed_value(formatter: &ResultFormatter, cell: Cell) -> Option<f64> {
    match cell {
        Cell::Value(v) => Some(formatter.round(v)),
        Cell::Missing => None,
        Cell::Undefined => Some(f64::NAN),
    }
}

fn date_column(rows: &[TableRow], formatter: &ResultFormatter) -> Column {
    let dates: Vec<String> = rows.iter().map(|row| formatter.format_date(row.date)).collect();
    Column::new(formatter.date_column.as_str().into(), &dates)
}

/// Extract and parse the date key column
fn extract_date_column(
    df: &DataFrame,
    formatter: &ResultFormatter,
) -> Result<Vec<NaiveDate>, ConversionError> {
    let name = formatter.date_column.as_str();
    let column = df.column(name).map_err(|_| ConversionError::MissingColumn {
        column: name.to_string(),
    })?;

    let strings = column.str().map_err(|_| ConversionError::InvalidDataType {
        column: name.to_string(),
        expected: "str".to_string(),
        actual: format!("{:?}", column.dtype()),
    })?;

    strings
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .and_then(|text| NaiveDate::parse_from_str(text, &formatter.date_format).ok())
                .ok_or_else(|| ConversionError::InvalidDate {
                    column: name.to_string(),
                    row,
                    format: formatter.date_format.clone(),
                    value: value.map(str::to_string),
                })
        })
        .collect()
}

/// Extract a value column: null is missing, NaN is undefined
fn extract_cell_column(df: &DataFrame, name: &str) -> Result<Vec<Cell>, ConversionError> {
    let column = df.column(name).map_err(|_| ConversionError::MissingColumn {
        column: name.to_string(),
    })?;

    let values = column.f64().map_err(|_| ConversionError::InvalidDataType {
        column: name.to_string(),
        expected: "f64".to_string(),
        actual: format!("{:?}", column.dtype()),
    })?;

    Ok(values
        .into_iter()
        .map(|value| match value {
            Some(v) if v.is_nan() => Cell::Undefined,
            other => Cell::from(other),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendnorm_core::test_utils::date;
    use trendnorm_core::{AnchorComparisonRow, UndefinedReason};

    fn sample_table() -> NormalizedTable {
        NormalizedTable {
            columns: vec!["coffee".into(), "tea".into()],
            rows: vec![
                TableRow {
                    date: date("2024-01-07"),
                    cells: vec![Cell::Value(50.0), Cell::Value(12.345)],
                },
                TableRow {
                    date: date("2024-01-14"),
                    cells: vec![Cell::Missing, Cell::Undefined],
                },
            ],
        }
    }

    #[test]
    fn test_typed_dataframe() {
        let formatter = ResultFormatter::with_precision(Some(2));
        let df = sample_table().to_polars_dataframe(&formatter).unwrap();

        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.get_column_names()[0].as_str(), "date");

        let tea: Vec<Option<f64>> = df.column("tea").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(tea[0], Some(12.35));
        assert!(tea[1].unwrap().is_nan());

        let coffee = df.column("coffee").unwrap().f64().unwrap();
        assert_eq!(coffee.get(1), None);
    }

    #[test]
    fn test_text_dataframe_uses_markers() {
        let formatter = ResultFormatter {
            precision: Some(1),
            missing_marker: "-".to_string(),
            ..Default::default()
        };
        let df = sample_table().to_text_dataframe(&formatter).unwrap();

        let coffee = df.column("coffee").unwrap().str().unwrap();
        assert_eq!(coffee.get(0), Some("50.0"));
        assert_eq!(coffee.get(1), Some("-"));
        assert_eq!(df.column("tea").unwrap().str().unwrap().get(1), Some("NaN"));
    }

    #[test]
    fn test_typed_dataframe_rebuilds_table() {
        let formatter = ResultFormatter::default();
        let table = sample_table();
        let df = table.to_polars_dataframe(&formatter).unwrap();

        let rebuilt = NormalizedTable::from_polars_dataframe(&df, &formatter).unwrap();
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn test_missing_date_column() {
        let df = DataFrame::new(vec![Column::new("x".into(), &[1.0f64])]).unwrap();
        let err = NormalizedTable::from_polars_dataframe(&df, &ResultFormatter::default())
            .unwrap_err();
        assert!(matches!(err, ConversionError::MissingColumn { ref column } if column == "date"));
    }

    #[test]
    fn test_audit_table_layout() {
        let comparison = AnchorComparison {
            anchor: "coffee".into(),
            first_label: "a.csv".into(),
            second_label: "b.csv".into(),
            first_column: "coffee_batch1".into(),
            second_column: "coffee_batch2".into(),
            rows: vec![AnchorComparisonRow {
                date: date("2024-01-07"),
                first: Cell::Value(50.0),
                second: Cell::Value(0.0),
                ratio: ScalingFactor::Undefined(UndefinedReason::ZeroAnchor),
            }],
        };

        let table = audit_table(&comparison);
        assert_eq!(table.columns, vec!["coffee_batch1", "coffee_batch2", "ratio"]);
        assert_eq!(table.rows[0].cells[2], Cell::Undefined);
    }

    #[test]
    fn test_chart_table() {
        let series = vec![
            ChartSeries {
                name: "a".into(),
                points: vec![(date("2024-01-07"), Some(1.0)), (date("2024-01-14"), None)],
            },
            ChartSeries {
                name: "b".into(),
                points: vec![(date("2024-01-07"), Some(2.0)), (date("2024-01-14"), Some(3.0))],
            },
        ];

        let table = chart_table(&series);
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.get(date("2024-01-14"), "a"), Some(Cell::Missing));
        assert_eq!(table.get(date("2024-01-14"), "b"), Some(Cell::Value(3.0)));
    }
}
