//! Core anchor-based normalization algorithms
//!
//! Rescales independently collected keyword-interest batches onto the scale
//! of one reference batch, using a keyword common to every batch (the
//! anchor) as the pivot.
//!
//! ## Pipeline
//!
//! - Loader: raw tables become typed [`Batch`] values (date key + numeric columns)
//! - Anchor: keyword-set intersection, single anchor selection
//! - Scaling: per-row (or per-batch) factors `reference / current` applied to every column
//! - Merge: date-keyed join with first-occurrence column de-duplication
//! - Format: rounding and date serialization for text sinks
//!
//! Every stage is a pure function over immutable values. Per-row and per-cell
//! problems are accumulated in [`Diagnostics`] instead of aborting the run.

pub mod anchor;
pub mod audit;
pub mod dates;
pub mod diagnostics;
pub mod errors;
pub mod format;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod scaling;
pub mod series;
pub mod types;

// Test utilities (only available in test builds or with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use anchor::{common_keywords, resolve_anchor, AnchorSelection};
pub use audit::{compare_anchor_series, AnchorComparison, AnchorComparisonRow};
pub use dates::{parse_date, DatePolicy};
pub use diagnostics::{Diagnostics, UndefinedReason};
pub use errors::{AnchorError, LoadError, NormalizeError, SeriesError};
pub use format::{FormattedTable, ResultFormatter};
pub use loader::{load_batch, LoaderOptions};
pub use merge::{merge_batches, JoinPolicy};
pub use pipeline::{normalize, LoadPolicy, NormalizeOptions, Normalization};
pub use scaling::{scale_batches, AnchorPolicy, ScaledBatch, ScalingMode, ScalingOptions};
pub use series::{select_series, ChartSeries};
pub use types::{Batch, BatchRow, Cell, NormalizedTable, RawTable, ScalingFactor, TableRow};
