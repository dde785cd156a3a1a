//! Normalization runs driven by [`trendnorm_config::Settings`]
//!
//! Reads batch files, normalizes them, reports diagnostics through
//! `tracing`, summarizes the scaling factors with Polars, and exports the
//! workbook.

pub mod engine;
pub mod statistics;

// Re-export commonly used types
pub use engine::{
    sorted_batch_paths, CandidateReport, EngineError, EngineReport, NormalizationEngine,
};
pub use statistics::{factor_statistics, FactorStatistics};
pub use trendnorm_io::{SheetExportResult, WorkbookExportResult};
