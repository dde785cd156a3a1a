//! Workbook export
//!
//! A [`Workbook`] is an ordered set of named sheets (normalized data, the
//! anchor audit, the chart series). Each sheet is written as its own file
//! `<stem>_<sheet_slug>.<ext>`: CSV sheets carry the formatter's text
//! rendering, Parquet and JSON sheets carry typed values.

use crate::formats::{audit_table, chart_table, ConversionError, DataFrameConverter};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use trendnorm_core::{AnchorComparison, ChartSeries, NormalizedTable, ResultFormatter};

pub const NORMALIZED_SHEET: &str = "Normalized Data";
pub const SCALING_SHEET: &str = "Scaling Factors";
pub const CHART_SHEET: &str = "Chart Data";

/// Output file format, one file per sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
    Json,
}

impl ExportFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Json => "json",
        }
    }
}

/// One named sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: NormalizedTable,
}

impl Sheet {
    pub fn new(name: impl Into<String>, table: NormalizedTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// File-name form of the sheet name, e.g. `normalized_data`
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for c in self.name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        slug.trim_matches('_').to_string()
    }
}

/// Ordered collection of sheets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, table: NormalizedTable) -> Self {
        self.sheets.push(Sheet::new(name, table));
        self
    }

    /// Standard workbook of a normalization run
    pub fn from_results(
        table: &NormalizedTable,
        audit: Option<&AnchorComparison>,
        chart: Option<&[ChartSeries]>,
    ) -> Self {
        let mut workbook = Self::new().with_sheet(NORMALIZED_SHEET, table.clone());
        if let Some(comparison) = audit {
            workbook = workbook.with_sheet(SCALING_SHEET, audit_table(comparison));
        }
        if let Some(series) = chart {
            workbook = workbook.with_sheet(CHART_SHEET, chart_table(series));
        }
        workbook
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Workbook exporter configuration
#[derive(Debug, Clone)]
pub struct WorkbookExporterConfig {
    pub format: ExportFormat,

    /// Rounding, date format and markers applied to every sheet
    pub formatter: ResultFormatter,

    /// Whether to use statistics in Parquet files
    pub parquet_statistics: bool,
}

impl Default for WorkbookExporterConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            formatter: ResultFormatter::default(),
            parquet_statistics: true,
        }
    }
}

/// Per-sheet export result
#[derive(Debug, Clone)]
pub struct SheetExportResult {
    pub sheet: String,
    pub records_written: usize,
    pub file_path: PathBuf,
}

/// Workbook export result, one entry per sheet in workbook order
#[derive(Debug, Clone, Default)]
pub struct WorkbookExportResult {
    pub sheets: Vec<SheetExportResult>,
}

impl WorkbookExportResult {
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.sheets.iter().map(|s| s.file_path.as_path())
    }
}

/// Export operation errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Sheet '{sheet}' has no columns to export")]
    EmptyData { sheet: String },

    #[error("Sheets '{first}' and '{second}' map to the same file name")]
    DuplicateSheet { first: String, second: String },

    #[error("Data conversion failed")]
    ConversionFailed {
        #[source]
        source: ConversionError,
    },

    #[error("Failed to write {format} file to '{path}'")]
    WriteFailed {
        format: String,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Writes workbooks sheet by sheet
#[derive(Debug, Default)]
pub struct WorkbookExporter {
    config: WorkbookExporterConfig,
}

impl WorkbookExporter {
    /// Create new exporter with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new exporter with custom configuration
    pub fn with_config(config: WorkbookExporterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkbookExporterConfig {
        &self.config
    }

    /// Path a sheet is written to
    pub fn sheet_path(&self, dir: &Path, stem: &str, sheet: &Sheet) -> PathBuf {
        dir.join(format!(
            "{stem}_{}.{}",
            sheet.slug(),
            self.config.format.file_extension()
        ))
    }

    /// Export every sheet into `dir`, creating it if needed
    pub fn export<P: AsRef<Path>>(
        &self,
        workbook: &Workbook,
        dir: P,
        stem: &str,
    ) -> Result<WorkbookExportResult, ExportError> {
        let dir = dir.as_ref();
        check_unique_slugs(workbook)?;
        std::fs::create_dir_all(dir)?;

        let mut result = WorkbookExportResult::default();
        for sheet in &workbook.sheets {
            let path = self.sheet_path(dir, stem, sheet);
            result.sheets.push(self.export_sheet(sheet, &path)?);
        }
        Ok(result)
    }

    /// Export one sheet to `path`
    pub fn export_sheet(&self, sheet: &Sheet, path: &Path) -> Result<SheetExportResult, ExportError> {
        if sheet.table.columns.is_empty() {
            return Err(ExportError::EmptyData {
                sheet: sheet.name.clone(),
            });
        }

        let formatter = &self.config.formatter;
        let format = self.config.format;
        let mut df = match format {
            ExportFormat::Csv => sheet.table.to_text_dataframe(formatter),
            ExportFormat::Parquet | ExportFormat::Json => sheet.table.to_polars_dataframe(formatter),
        }
        .map_err(|e| ExportError::ConversionFailed {
            source: ConversionError::PolarsError(e),
        })?;

        let write_failed = |source: Box<dyn std::error::Error + Send + Sync>| ExportError::WriteFailed {
            format: format.file_extension().to_string(),
            path: path.to_string_lossy().to_string(),
            source,
        };

        let mut file = std::fs::File::create(path).map_err(|e| write_failed(e.into()))?;

        let written = match format {
            ExportFormat::Csv => CsvWriter::new(&mut file)
                .include_header(true)
                .with_separator(b',')
                .finish(&mut df),
            ExportFormat::Parquet => ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Snappy)
                .with_statistics(if self.config.parquet_statistics {
                    StatisticsOptions::default()
                } else {
                    StatisticsOptions::empty()
                })
                .finish(&mut df)
                .map(|_| ()),
            ExportFormat::Json => JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(&mut df),
        };
        written.map_err(|e| write_failed(e.into()))?;

        info!(
            event_type = "sheet_exported",
            sheet = %sheet.name,
            format = format.file_extension(),
            rows = sheet.table.len(),
            path = %path.display(),
            "Sheet written"
        );

        Ok(SheetExportResult {
            sheet: sheet.name.clone(),
            records_written: sheet.table.len(),
            file_path: path.to_path_buf(),
        })
    }
}

fn check_unique_slugs(workbook: &Workbook) -> Result<(), ExportError> {
    let mut seen: HashSet<String> = HashSet::new();
    for (index, sheet) in workbook.sheets.iter().enumerate() {
        if !seen.insert(sheet.slug()) {
            let first = workbook.sheets[..index]
                .iter()
                .find(|s| s.slug() == sheet.slug())
                .map_or_else(String::new, |s| s.name.clone());
            return Err(ExportError::DuplicateSheet {
                first,
                second: sheet.name.clone(),
            });
        }
    }
    Ok(())
}
