//! Normalization error types
//!
//! Only structural failures are errors. Per-row and per-cell problems are
//! collected in [`crate::Diagnostics`] and reported as warnings.

use thiserror::Error;

/// Structural failure loading one batch (fatal to that batch only)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Batch '{label}' has {found} column(s); need a date column and at least one keyword column")]
    TooFewColumns { label: String, found: usize },

    #[error("Batch '{label}' has an empty name for column {index}")]
    EmptyColumnName { label: String, index: usize },

    #[error("Batch '{label}' declares column '{column}' more than once")]
    DuplicateColumn { label: String, column: String },

    #[error("Batch '{label}' has no row with a parseable date ({rows} row(s) read)")]
    NoValidRows { label: String, rows: usize },
}

impl LoadError {
    pub fn label(&self) -> &str {
        match self {
            LoadError::TooFewColumns { label, .. }
            | LoadError::EmptyColumnName { label, .. }
            | LoadError::DuplicateColumn { label, .. }
            | LoadError::NoValidRows { label, .. } => label,
        }
    }
}

/// Anchor resolution failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnchorError {
    #[error("No keyword is common to all batches: {}", describe_keyword_sets(.batches))]
    NoCommonAnchor {
        /// `(batch label, keyword-set)` for every batch
        batches: Vec<(String, Vec<String>)>,
    },

    #[error("Several keywords are common to all batches, select one of: {}", .candidates.join(", "))]
    AmbiguousAnchor { candidates: Vec<String> },

    #[error("Keyword '{requested}' is not common to all batches (common keywords: {})", describe_candidates(.candidates))]
    AnchorNotCommon {
        requested: String,
        candidates: Vec<String>,
    },
}

fn describe_keyword_sets(batches: &[(String, Vec<String>)]) -> String {
    batches
        .iter()
        .map(|(label, keywords)| format!("'{label}' {{{}}}", keywords.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        "none".to_string()
    } else {
        candidates.join(", ")
    }
}

/// Whole-run normalization failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Need at least {required} loadable batches, got {loaded}")]
    TooFewBatches {
        loaded: usize,
        required: usize,
        /// Load failures of the batches that were skipped
        failures: Vec<LoadError>,
    },

    #[error("Batch load failed")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Anchor(#[from] AnchorError),

    #[error("Reference batch index {index} is out of range ({count} batches loaded)")]
    ReferenceOutOfRange { index: usize, count: usize },

    #[error("Reference batch {index} ('{label}') failed to load")]
    ReferenceNotLoaded { index: usize, label: String },

    #[error("Audit batch index {index} is out of range ({count} batches loaded)")]
    AuditOutOfRange { index: usize, count: usize },

    #[error("Audit needs two different batches, got index {index} twice")]
    AuditSameBatch { index: usize },
}

/// Chart series selection failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Unknown column '{column}' (available: {})", .available.join(", "))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },
}
