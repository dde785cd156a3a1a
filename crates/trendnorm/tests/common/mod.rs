//! Shared helpers for the end-to-end tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use trendnorm::{RawTable, Settings};

/// Title line Google Trends writes above the header
pub const TITLE_LINE: &str = "Category: All categories";

/// Write raw tables as Google Trends style CSV files named after their labels
pub fn write_batch_files(dir: &Path, tables: &[RawTable]) -> Vec<PathBuf> {
    tables
        .iter()
        .map(|table| {
            let path = dir.join(&table.label);
            let mut content = format!("{TITLE_LINE}\n{}\n", table.header.join(","));
            for record in &table.records {
                content.push_str(&record.fields.join(","));
                content.push('\n');
            }
            fs::write(&path, content).expect("write batch file");
            path
        })
        .collect()
}

/// Default settings exporting into `dir/out` at full precision
pub fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.export.output_dir = dir.join("out");
    settings.export.precision = None;
    settings
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9 * expected.abs().max(1.0),
        "{actual} != {expected}"
    );
}
