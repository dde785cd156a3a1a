//! Deterministic multi-batch scenarios
//!
//! Every batch observes the same underlying weekly interest curves, each on
//! its own arbitrary scale. Normalizing them must recover the reference
//! batch's scale for every keyword, which makes these scenarios handy for
//! end-to-end checks without fixture files.

use super::raw_table;
use crate::types::RawTable;
use chrono::{Duration, NaiveDate};

/// Underlying interest of keyword `k` in week `w` (strictly positive)
pub fn true_interest(keyword: usize, week: usize) -> f64 {
    let phase = (week as f64 * 0.7 + keyword as f64 * 1.3).sin();
    40.0 + 10.0 * keyword as f64 + 25.0 * phase
}

/// Keyword name used by the generated batches
pub fn keyword_name(keyword: usize) -> String {
    format!("kw{keyword}")
}

/// One scenario batch: the anchor `kw0` plus keywords `first..first + count`
pub struct ScenarioBatch {
    pub keywords: Vec<usize>,
    /// Scale of this collection session relative to the true interest
    pub scale: f64,
}

/// Generate raw tables for `batches` over `weeks` weeks starting 2024-01-07
///
/// Values are `true_interest * scale`. The anchor `kw0` is the first column
/// of every batch.
pub fn weekly_scenario(batches: &[ScenarioBatch], weeks: usize) -> Vec<RawTable> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

    batches
        .iter()
        .enumerate()
        .map(|(index, session)| {
            let mut keywords = vec![0];
            keywords.extend(session.keywords.iter().copied().filter(|k| *k != 0));

            let names: Vec<String> = keywords.iter().map(|k| keyword_name(*k)).collect();
            let columns: Vec<&str> = names.iter().map(String::as_str).collect();

            let dates: Vec<String> = (0..weeks)
                .map(|w| (start + Duration::weeks(w as i64)).format("%Y-%m-%d").to_string())
                .collect();
            let values: Vec<Vec<f64>> = (0..weeks)
                .map(|w| {
                    keywords
                        .iter()
                        .map(|k| true_interest(*k, w) * session.scale)
                        .collect()
                })
                .collect();
            let rows: Vec<(&str, &[f64])> = dates
                .iter()
                .zip(&values)
                .map(|(d, v)| (d.as_str(), v.as_slice()))
                .collect();

            raw_table(&format!("batch{}.csv", index + 1), &columns, &rows)
        })
        .collect()
}
