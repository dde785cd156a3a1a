//! Anchor-based normalization of Google Trends batch downloads.
//!
//! Google Trends caps a comparison at five keywords and scales every download
//! to 0-100 relative to its own peak. Comparing more keywords means
//! downloading several batches that share one keyword (the *anchor*) and
//! rescaling each batch onto a reference batch through it:
//!
//! ```text
//! factor = reference_anchor / batch_anchor
//! scaled = value * factor
//! ```
//!
//! ## Meta-Crate
//!
//! This crate re-exports the trendnorm sub-crates:
//!
//! - `trendnorm-core` - Loading, anchor resolution, scaling, merging, formatting
//! - `trendnorm-config` - Layered configuration (defaults, TOML, environment)
//! - `trendnorm-io` - CSV batch sources and workbook export (Polars)
//! - `trendnorm-batch` - Config-driven runs and factor statistics
//!
//! ## Features
//!
//! - `core` - Normalization pipeline (always enabled)
//! - `config` - Configuration management
//! - `io` - Batch sources and export
//! - `batch` - Normalization engine
//! - `full` - Enable all features
//!
//! ## Basic Usage
//!
//! ```rust
//! use trendnorm::{normalize, NormalizeOptions, RawTable};
//!
//! let reference = RawTable::new("batch1.csv", vec!["Week".into(), "coffee".into(), "tea".into()])
//!     .with_record(["2024-01-07", "50", "10"]);
//! let other = RawTable::new("batch2.csv", vec!["Week".into(), "coffee".into(), "cocoa".into()])
//!     .with_record(["2024-01-07", "100", "40"]);
//!
//! let result = normalize(&[reference, other], &NormalizeOptions::default()).unwrap();
//! assert_eq!(result.anchor, "coffee");
//! assert_eq!(result.table.columns, vec!["coffee", "tea", "cocoa"]);
//! ```
//!
//! ### Config-driven runs
//! ```rust,no_run
//! # #[cfg(feature = "batch")]
//! # {
//! use trendnorm::batch::NormalizationEngine;
//! use trendnorm::Settings;
//!
//! let engine = NormalizationEngine::new(Settings::load().unwrap()).unwrap();
//! let report = engine.run(&["batch1.csv", "batch2.csv"]).unwrap();
//! engine.export(&report).unwrap();
//! # }
//! ```

// Re-export core (always available)
pub use trendnorm_core as core;

// Re-export optional crates
#[cfg(feature = "config")]
pub use trendnorm_config as config;

#[cfg(feature = "io")]
pub use trendnorm_io as io;

#[cfg(feature = "batch")]
pub use trendnorm_batch as batch;

// Re-export commonly used types at crate root for convenience
pub use trendnorm_core::{
    normalize, AnchorPolicy, AnchorSelection, Cell, JoinPolicy, NormalizeError,
    NormalizeOptions, Normalization, NormalizedTable, RawTable, ResultFormatter, ScalingMode,
};

#[cfg(feature = "config")]
pub use trendnorm_config::Settings;

#[cfg(feature = "io")]
pub use trendnorm_io::{CsvBatchSource, Workbook, WorkbookExporter};

#[cfg(feature = "batch")]
pub use trendnorm_batch::{EngineError, EngineReport, NormalizationEngine};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
