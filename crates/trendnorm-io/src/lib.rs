//! Input/output operations for keyword-interest batches
//!
//! - [`source`]: CSV batch files to raw tables (title rows stripped)
//! - [`formats`]: normalized tables to and from Polars DataFrames
//! - [`export`]: multi-sheet workbook export in CSV, Parquet, or JSON

pub mod source;

#[cfg(feature = "polars")]
pub mod formats;

#[cfg(feature = "polars")]
pub mod export;

pub use source::{CsvBatchSource, CsvSourceOptions, SourceError};

#[cfg(feature = "polars")]
pub use formats::{audit_table, chart_table, ConversionError, DataFrameConverter};

#[cfg(feature = "polars")]
pub use export::{
    ExportError, ExportFormat, Sheet, SheetExportResult, Workbook, WorkbookExportResult,
    WorkbookExporter, WorkbookExporterConfig,
};
