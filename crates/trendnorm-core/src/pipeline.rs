//! End-to-end normalization run
//!
//! Load every raw table, resolve the anchor, scale, merge, and build the
//! anchor audit table. Formatting is left to the sinks.

use crate::anchor::{common_keywords, resolve_anchor, AnchorSelection};
use crate::audit::{compare_anchor_series, AnchorComparison};
use crate::diagnostics::{Diagnostics, SkippedBatch};
use crate::errors::NormalizeError;
use crate::loader::{load_batch, LoaderOptions};
use crate::merge::{merge_batches, JoinPolicy};
use crate::scaling::{scale_batches, ScaledBatch, ScalingOptions};
use crate::types::{Batch, NormalizedTable, RawTable};
use serde::{Deserialize, Serialize};

/// A run needs at least this many loadable batches
pub const MIN_BATCHES: usize = 2;

/// What to do when a batch fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Skip the batch, record it, continue while enough batches remain
    #[default]
    BestEffort,
    /// Abort on the first load error
    FailFast,
}

/// Options for one normalization run
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub loader: LoaderOptions,
    pub anchor: AnchorSelection,
    /// `reference_batch` indexes the input tables, skipped ones included
    pub scaling: ScalingOptions,
    pub join: JoinPolicy,
    pub load_policy: LoadPolicy,
    /// Loaded-batch indices compared in the audit table; `None` skips it
    ///
    /// Column headers are numbered by input position.
    pub audit_batches: Option<(usize, usize)>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            loader: LoaderOptions::default(),
            anchor: AnchorSelection::default(),
            scaling: ScalingOptions::default(),
            join: JoinPolicy::default(),
            load_policy: LoadPolicy::default(),
            audit_batches: Some((0, 1)),
        }
    }
}

/// Result of a normalization run
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub anchor: String,
    /// Every keyword common to all loaded batches
    pub candidates: Vec<String>,
    /// Loaded batches before scaling
    pub batches: Vec<Batch>,
    pub scaled: Vec<ScaledBatch>,
    /// Position of the reference batch within `batches`
    pub reference: usize,
    pub table: NormalizedTable,
    pub audit: Option<AnchorComparison>,
    pub diagnostics: Diagnostics,
}

impl Normalization {
    pub fn reference_label(&self) -> &str {
        &self.batches[self.reference].label
    }
}

/// Normalize raw tables onto the reference batch's scale
pub fn normalize(
    raw_tables: &[RawTable],
    options: &NormalizeOptions,
) -> Result<Normalization, NormalizeError> {
    let mut diagnostics = Diagnostics::new();
    let (batches, input_positions) = load_all(raw_tables, options, &mut diagnostics)?;

    let requested = options.scaling.reference_batch;
    let reference = match input_positions.iter().position(|&p| p == requested) {
        Some(position) => position,
        None => match raw_tables.get(requested) {
            Some(table) => {
                return Err(NormalizeError::ReferenceNotLoaded {
                    index: requested,
                    label: table.label.clone(),
                })
            }
            None => {
                return Err(NormalizeError::ReferenceOutOfRange {
                    index: requested,
                    count: raw_tables.len(),
                })
            }
        },
    };

    let candidates = common_keywords(&batches);
    let anchor = resolve_anchor(&batches, &options.anchor)?;

    let scaling = ScalingOptions {
        reference_batch: reference,
        ..options.scaling
    };
    let scaled = scale_batches(&batches, &anchor, &scaling, &mut diagnostics)?;

    let scaled_refs: Vec<&Batch> = scaled.iter().map(|s| &s.batch).collect();
    let table = merge_batches(&scaled_refs, options.join);

    let audit = options
        .audit_batches
        .map(|(first, second)| {
            compare_anchor_series(&batches, &anchor, first, second).map(|comparison| {
                comparison.with_batch_numbers(input_positions[first] + 1, input_positions[second] + 1)
            })
        })
        .transpose()?;

    Ok(Normalization {
        anchor,
        candidates,
        batches,
        scaled,
        reference,
        table,
        audit,
        diagnostics,
    })
}

/// Load every table under the load policy
///
/// Returns the loaded batches with the input index of each.
fn load_all(
    raw_tables: &[RawTable],
    options: &NormalizeOptions,
    diagnostics: &mut Diagnostics,
) -> Result<(Vec<Batch>, Vec<usize>), NormalizeError> {
    let mut batches = Vec::with_capacity(raw_tables.len());
    let mut positions = Vec::with_capacity(raw_tables.len());
    let mut failures = Vec::new();

    for (index, raw) in raw_tables.iter().enumerate() {
        match load_batch(raw, &options.loader, diagnostics) {
            Ok(batch) => {
                batches.push(batch);
                positions.push(index);
            }
            Err(err) if options.load_policy == LoadPolicy::FailFast => return Err(err.into()),
            Err(err) => {
                diagnostics.skipped_batches.push(SkippedBatch {
                    label: raw.label.clone(),
                    error: err.clone(),
                });
                failures.push(err);
            }
        }
    }

    if batches.len() < MIN_BATCHES {
        return Err(NormalizeError::TooFewBatches {
            loaded: batches.len(),
            required: MIN_BATCHES,
            failures,
        });
    }

    Ok((batches, positions))
}
