//! CSV batch source
//!
//! Reads one exported batch file into a [`RawTable`]. The first
//! `title_rows` records (Google Trends writes a category line) are
//! discarded, blank lines are skipped by the reader, and the next record is
//! the header. Rows may be ragged; short rows simply yield missing cells.

use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use trendnorm_core::types::RawRecord;
use trendnorm_core::RawTable;

/// Batch source options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSourceOptions {
    /// Records discarded before the header
    pub title_rows: usize,

    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvSourceOptions {
    fn default() -> Self {
        Self {
            title_rows: 1,
            delimiter: b',',
        }
    }
}

/// Batch source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open batch file '{}'", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in batch '{label}'")]
    Csv {
        label: String,
        #[source]
        source: csv::Error,
    },

    #[error("Batch '{label}' has no header row after {title_rows} title row(s)")]
    MissingHeader { label: String, title_rows: usize },
}

impl SourceError {
    /// Batch label (file name) the error refers to
    pub fn label(&self) -> String {
        match self {
            SourceError::Open { path, .. } => file_label(path),
            SourceError::Csv { label, .. } | SourceError::MissingHeader { label, .. } => {
                label.clone()
            }
        }
    }
}

/// Reads batch files into raw tables
#[derive(Debug, Clone, Default)]
pub struct CsvBatchSource {
    options: CsvSourceOptions,
}

impl CsvBatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CsvSourceOptions) -> Self {
        Self { options }
    }

    /// Read one file; the label is the file name
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<RawTable, SourceError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.read(file_label(path), file)
    }

    /// Read a batch from any reader
    pub fn read<R: Read>(&self, label: String, reader: R) -> Result<RawTable, SourceError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.options.delimiter)
            .from_reader(reader);

        let mut records = reader.records().skip(self.options.title_rows);

        let header = match records.next() {
            Some(record) => record.map_err(|source| SourceError::Csv {
                label: label.clone(),
                source,
            })?,
            None => {
                return Err(SourceError::MissingHeader {
                    label,
                    title_rows: self.options.title_rows,
                })
            }
        };

        let mut table = RawTable::new(label.clone(), fields(&header));
        for record in records {
            let record = record.map_err(|source| SourceError::Csv {
                label: label.clone(),
                source,
            })?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            table.records.push(RawRecord {
                line,
                fields: fields(&record),
            });
        }

        debug!(
            event_type = "batch_read",
            batch = %table.label,
            columns = table.header.len(),
            records = table.records.len(),
            "Read batch file"
        );
        Ok(table)
    }

    /// Read every path, keeping per-file results in input order
    pub fn read_all<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<Result<RawTable, SourceError>> {
        paths.iter().map(|p| self.read_path(p)).collect()
    }
}

fn fields(record: &StringRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| field.trim_start_matches('\u{feff}').trim().to_string())
        .collect()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
