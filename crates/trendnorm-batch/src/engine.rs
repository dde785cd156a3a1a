//! Normalization engine
//!
//! Runs one normalization from batch files to an exported workbook using a
//! loaded [`Settings`]. Non-fatal issues are logged as warnings and kept in
//! the report.

use crate::statistics::{factor_statistics, FactorStatistics};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use trendnorm_config::{OutputFormat, Settings};
use trendnorm_core::{
    common_keywords, load_batch, normalize, select_series, ChartSeries, Diagnostics, LoadPolicy,
    NormalizeError, Normalization, RawTable, SeriesError,
};
use trendnorm_io::{
    CsvBatchSource, CsvSourceOptions, ExportError, ExportFormat, SourceError, Workbook,
    WorkbookExportResult, WorkbookExporter, WorkbookExporterConfig,
};

/// Config-driven normalization runs
#[derive(Debug)]
pub struct NormalizationEngine {
    settings: Settings,
    source: CsvBatchSource,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct EngineReport {
    pub normalization: Normalization,
    /// Chart series, when the chart sheet is enabled
    pub chart: Option<Vec<ChartSeries>>,
    /// Factor summary of every non-reference batch
    pub factor_statistics: Vec<FactorStatistics>,
    /// Files that could not be read and were left out
    pub unreadable: Vec<String>,
}

impl EngineReport {
    /// Workbook with the normalized, audit and chart sheets
    pub fn workbook(&self) -> Workbook {
        Workbook::from_results(
            &self.normalization.table,
            self.normalization.audit.as_ref(),
            self.chart.as_deref(),
        )
    }
}

/// Keywords shared by a set of batch files
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateReport {
    /// Keywords present in every loadable batch, in first-batch order
    pub candidates: Vec<String>,
    /// `(batch label, keyword columns)` per loaded batch
    pub keyword_sets: Vec<(String, Vec<String>)>,
}

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to read batch source")]
    Source(#[from] SourceError),

    #[error("Reference batch {index} ('{label}') could not be read")]
    ReferenceUnreadable { index: usize, label: String },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("Computation failed: {operation}")]
    ComputationFailed {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Value extraction failed: {operation}")]
    ValueExtractionFailed {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Export failed")]
    Export(#[from] ExportError),
}

impl NormalizationEngine {
    /// Create a new engine, rejecting settings no run could use
    pub fn new(settings: Settings) -> Result<Self, EngineError> {
        let delimiter = settings
            .data
            .delimiter_byte()
            .map_err(|message| EngineError::InvalidConfig { message })?;
        settings
            .export
            .validate()
            .map_err(|message| EngineError::InvalidConfig { message })?;

        let source = CsvBatchSource::with_options(CsvSourceOptions {
            title_rows: settings.data.title_rows,
            delimiter,
        });

        Ok(Self { settings, source })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read, normalize and summarize the given batch files
    ///
    /// `normalization.reference_batch` indexes `paths`.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> Result<EngineReport, EngineError> {
        self.settings
            .normalization
            .validate(paths.len())
            .map_err(|message| EngineError::InvalidConfig { message })?;

        info!(
            event_type = "normalization_started",
            batches = paths.len(),
            reference = self.settings.normalization.reference_batch,
            "Starting normalization run"
        );

        let (tables, unreadable, reference) = self.read_sources(paths)?;

        let mut options = self.settings.normalize_options();
        options.scaling.reference_batch = reference;

        let normalization = normalize(&tables, &options)?;

        for warning in normalization.diagnostics.warnings() {
            warn!(event_type = "normalization_warning", "{}", warning);
        }

        let chart = if self.settings.export.include_chart_sheet {
            Some(select_series(
                &normalization.table,
                self.settings.export.chart_selection(),
            )?)
        } else {
            None
        };

        let factor_statistics = factor_statistics(&normalization.scaled)?;
        for stats in &factor_statistics {
            debug!(
                event_type = "factor_statistics",
                batch = %stats.batch,
                defined = stats.defined,
                undefined = stats.undefined,
                unaligned = stats.unaligned,
                mean = ?stats.mean,
                "Scaling factors summarized"
            );
        }

        info!(
            event_type = "normalization_completed",
            anchor = %normalization.anchor,
            reference = %normalization.reference_label(),
            rows = normalization.table.len(),
            columns = normalization.table.columns.len(),
            issues = normalization.diagnostics.counts().total(),
            "Normalization run completed"
        );

        Ok(EngineReport {
            normalization,
            chart,
            factor_statistics,
            unreadable,
        })
    }

    /// Export a report's workbook under the configured output directory
    pub fn export(&self, report: &EngineReport) -> Result<WorkbookExportResult, EngineError> {
        let export = &self.settings.export;
        let exporter = WorkbookExporter::with_config(WorkbookExporterConfig {
            format: export_format(export.format),
            formatter: export.formatter(),
            ..Default::default()
        });

        let dir = export.get_output_dir();
        let result = exporter.export(&report.workbook(), &dir, &export.file_stem)?;

        info!(
            event_type = "workbook_exported",
            dir = %dir.display(),
            sheets = result.sheets.len(),
            "Workbook exported"
        );
        Ok(result)
    }

    /// Keywords common to every batch file that reads and loads
    pub fn candidates<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CandidateReport, EngineError> {
        let loader = self.settings.data.loader_options();
        let mut batches = Vec::new();
        let mut diagnostics = Diagnostics::new();

        for result in self.source.read_all(paths) {
            let table = match result {
                Ok(table) => table,
                Err(e) if self.best_effort() => {
                    warn!(event_type = "batch_unreadable", batch = %e.label(), error = %e, "Skipping batch");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            match load_batch(&table, &loader, &mut diagnostics) {
                Ok(batch) => batches.push(batch),
                Err(e) if self.best_effort() => {
                    warn!(event_type = "batch_skipped", batch = %e.label(), error = %e, "Skipping batch");
                }
                Err(e) => return Err(NormalizeError::from(e).into()),
            }
        }

        Ok(CandidateReport {
            candidates: common_keywords(&batches),
            keyword_sets: batches
                .iter()
                .map(|b| (b.label.clone(), b.columns.clone()))
                .collect(),
        })
    }

    fn best_effort(&self) -> bool {
        self.settings.data.load_policy == LoadPolicy::BestEffort
    }

    /// Raw tables, labels of unreadable files, and the reference index
    /// remapped onto the tables that were read
    fn read_sources<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<(Vec<RawTable>, Vec<String>, usize), EngineError> {
        let requested = self.settings.normalization.reference_batch;
        let mut reference = requested;
        let mut tables = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();

        for (index, result) in self.source.read_all(paths).into_iter().enumerate() {
            match result {
                Ok(table) => tables.push(table),
                Err(e) if index == requested => {
                    warn!(event_type = "batch_unreadable", batch = %e.label(), error = %e, "Reference batch unreadable");
                    return Err(EngineError::ReferenceUnreadable {
                        index,
                        label: e.label(),
                    });
                }
                Err(e) if self.best_effort() => {
                    warn!(event_type = "batch_unreadable", batch = %e.label(), error = %e, "Skipping batch");
                    if index < requested {
                        reference -= 1;
                    }
                    unreadable.push(e.label());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok((tables, unreadable, reference))
    }
}

fn export_format(format: OutputFormat) -> ExportFormat {
    match format {
        OutputFormat::Csv => ExportFormat::Csv,
        OutputFormat::Parquet => ExportFormat::Parquet,
        OutputFormat::Json => ExportFormat::Json,
    }
}

/// Sort paths the way batch files are usually numbered (`batch2` before `batch10`)
pub fn sorted_batch_paths(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by(|a, b| natural_key(a).cmp(&natural_key(b)));
    paths
}

fn natural_key(path: &Path) -> Vec<(String, u64)> {
    let name = path.to_string_lossy();
    let mut key = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();

    for ch in name.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                key.push((std::mem::take(&mut text), digits.parse().unwrap_or(u64::MAX)));
                digits.clear();
            }
            text.push(ch);
        }
    }
    key.push((text, digits.parse().unwrap_or(0)));
    key
}
