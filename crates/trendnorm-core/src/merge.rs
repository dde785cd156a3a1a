//! Merger: combine normalized batches into one date-keyed table
//!
//! Columns are de-duplicated by name with the first occurrence (in batch
//! order) winning. After scaling, duplicated columns such as the anchor are
//! expected to agree, so nothing is averaged or compared.

use crate::types::{Batch, Cell, NormalizedTable, TableRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashSet};

/// Which dates appear in the merged table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Every date of any batch; cells of batches lacking the date are `Missing`
    #[default]
    Outer,
    /// Only dates present in every batch
    Inner,
}

/// Merge batches on the date key
///
/// Output rows are date-ascending; columns keep first-appearance order across
/// the batch sequence. Accepts owned or borrowed batches.
pub fn merge_batches<B: Borrow<Batch>>(batches: &[B], join: JoinPolicy) -> NormalizedTable {
    let batches: Vec<&Batch> = batches.iter().map(Borrow::borrow).collect();

    // (batch index, column index) feeding each output column
    let mut sources: Vec<(usize, usize)> = Vec::new();
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (batch_index, batch) in batches.iter().enumerate() {
        for (column_index, column) in batch.columns.iter().enumerate() {
            if seen.insert(column.as_str()) {
                columns.push(column.clone());
                sources.push((batch_index, column_index));
            }
        }
    }

    let rows = join_dates(&batches, join)
        .into_iter()
        .map(|date| TableRow {
            date,
            cells: sources
                .iter()
                .map(|&(b, c)| {
                    batches[b]
                        .row(date)
                        .map_or(Cell::Missing, |row| row.values[c])
                })
                .collect(),
        })
        .collect();

    NormalizedTable { columns, rows }
}

fn join_dates(batches: &[&Batch], join: JoinPolicy) -> BTreeSet<NaiveDate> {
    match join {
        JoinPolicy::Outer => batches.iter().flat_map(|b| b.dates()).collect(),
        JoinPolicy::Inner => {
            let Some((first, rest)) = batches.split_first() else {
                return BTreeSet::new();
            };
            first
                .dates()
                .filter(|date| rest.iter().all(|b| b.row(*date).is_some()))
                .collect()
        }
    }
}
