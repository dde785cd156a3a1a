//! Anchor-scaling configuration

use serde::{Deserialize, Serialize};
use trendnorm_core::{AnchorPolicy, AnchorSelection, JoinPolicy, ScalingMode, ScalingOptions};

/// Anchor selection, scaling and merging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Input position of the batch whose scale the others are mapped onto
    pub reference_batch: usize,

    /// Anchor keyword; unset means "the single common keyword"
    pub anchor: Option<String>,

    /// Take the first common keyword when several qualify
    pub first_candidate: bool,

    pub scaling_mode: ScalingMode,

    pub anchor_policy: AnchorPolicy,

    pub join: JoinPolicy,

    /// Build the anchor audit table
    pub audit: bool,

    /// Loaded-batch positions compared by the audit table
    pub audit_batches: [usize; 2],
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            reference_batch: 0,
            anchor: None,
            first_candidate: false,
            scaling_mode: ScalingMode::RowWise,
            anchor_policy: AnchorPolicy::ReplaceWithReference,
            join: JoinPolicy::Outer,
            audit: true,
            audit_batches: [0, 1],
        }
    }
}

impl NormalizationConfig {
    pub fn anchor_selection(&self) -> AnchorSelection {
        AnchorSelection::from_parts(self.anchor.as_deref(), self.first_candidate)
    }

    pub fn scaling_options(&self) -> ScalingOptions {
        ScalingOptions {
            reference_batch: self.reference_batch,
            mode: self.scaling_mode,
            anchor_policy: self.anchor_policy,
        }
    }

    pub fn audit_pair(&self) -> Option<(usize, usize)> {
        self.audit
            .then_some((self.audit_batches[0], self.audit_batches[1]))
    }

    /// Validate settings that can be checked before any batch is read
    pub fn validate(&self, batch_count: usize) -> Result<(), String> {
        if self.reference_batch >= batch_count {
            return Err(format!(
                "Reference batch {} is out of range for {} input file(s)",
                self.reference_batch, batch_count
            ));
        }

        if self.audit && self.audit_batches[0] == self.audit_batches[1] {
            return Err(format!(
                "Audit batches must differ, got {} twice",
                self.audit_batches[0]
            ));
        }

        if let Some(anchor) = &self.anchor {
            if anchor.trim().is_empty() {
                return Err("Anchor keyword must not be empty".to_string());
            }
        }

        Ok(())
    }
}
