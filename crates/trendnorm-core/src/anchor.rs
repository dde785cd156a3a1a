//! Anchor Resolver
//!
//! The anchor is a keyword present in every loaded batch. Exactly one anchor
//! is used per run; when several keywords qualify, the caller must choose.

use crate::errors::AnchorError;
use crate::types::Batch;
use std::collections::BTreeSet;

/// How to pick the anchor among the common keywords
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnchorSelection {
    /// Accept only a single common keyword; several is [`AnchorError::AmbiguousAnchor`]
    #[default]
    Unique,
    /// Deterministic tie-break: first common keyword in the first batch's column order
    FirstCandidate,
    /// Explicit choice, which must be a common keyword
    Named(String),
}

impl AnchorSelection {
    /// Named selection when given, otherwise the requested tie-break
    pub fn from_parts(anchor: Option<&str>, first_candidate: bool) -> Self {
        match anchor {
            Some(name) => AnchorSelection::Named(name.to_string()),
            None if first_candidate => AnchorSelection::FirstCandidate,
            None => AnchorSelection::Unique,
        }
    }
}

/// Keywords present in every batch, in the first batch's column order
pub fn common_keywords(batches: &[Batch]) -> Vec<String> {
    let column_lists: Vec<&[String]> = batches.iter().map(|b| b.columns.as_slice()).collect();
    intersect_columns(&column_lists)
}

/// Intersection of keyword lists, ordered like the first list
pub fn intersect_columns(column_lists: &[&[String]]) -> Vec<String> {
    let Some((first, rest)) = column_lists.split_first() else {
        return Vec::new();
    };

    let others: Vec<BTreeSet<&str>> = rest
        .iter()
        .map(|columns| columns.iter().map(String::as_str).collect())
        .collect();

    first
        .iter()
        .filter(|keyword| others.iter().all(|set| set.contains(keyword.as_str())))
        .cloned()
        .collect()
}

/// Pick the single anchor keyword for a run
pub fn resolve_anchor(batches: &[Batch], selection: &AnchorSelection) -> Result<String, AnchorError> {
    let candidates = common_keywords(batches);

    if candidates.is_empty() {
        return Err(AnchorError::NoCommonAnchor {
            batches: batches
                .iter()
                .map(|b| (b.label.clone(), b.columns.clone()))
                .collect(),
        });
    }

    match selection {
        AnchorSelection::Named(requested) => {
            if candidates.iter().any(|c| c == requested) {
                Ok(requested.clone())
            } else {
                Err(AnchorError::AnchorNotCommon {
                    requested: requested.clone(),
                    candidates,
                })
            }
        }
        AnchorSelection::FirstCandidate => Ok(candidates[0].clone()),
        AnchorSelection::Unique if candidates.len() == 1 => Ok(candidates[0].clone()),
        AnchorSelection::Unique => Err(AnchorError::AmbiguousAnchor { candidates }),
    }
}
