//! Export and output configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trendnorm_core::format::{DEFAULT_DATE_FORMAT, MAX_PRECISION};
use trendnorm_core::ResultFormatter;

/// Export and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving the workbook files
    pub output_dir: PathBuf,

    /// Workbook file stem; each sheet is written as `<stem>_<sheet>.<ext>`
    pub file_stem: String,

    pub format: OutputFormat,

    /// Decimal places for value columns (unset keeps full precision)
    pub precision: Option<u32>,

    /// Date serialization format
    pub date_format: String,

    /// Text for missing cells in text formats
    pub missing_marker: String,

    /// Text for cells with an undefined scaling factor in text formats
    pub undefined_marker: String,

    /// Write the chart sheet with the selected series
    pub include_chart_sheet: bool,

    /// Columns plotted on the chart sheet; empty means the first two
    pub chart_columns: Vec<String>,

    /// Create a timestamped subdirectory per run
    pub create_timestamped_dirs: bool,
}

/// Supported output formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values
    Csv,
    /// Apache Parquet format
    Parquet,
    /// JavaScript Object Notation
    Json,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            file_stem: "normalized_trends".to_string(),
            format: OutputFormat::Csv,
            precision: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            missing_marker: String::new(),
            undefined_marker: "NaN".to_string(),
            include_chart_sheet: true,
            chart_columns: Vec::new(),
            create_timestamped_dirs: false,
        }
    }
}

impl ExportConfig {
    /// Validate settings that can be checked before any batch is read
    pub fn validate(&self) -> Result<(), String> {
        match self.precision {
            Some(digits) if digits > MAX_PRECISION => Err(format!(
                "Precision {digits} exceeds the maximum of {MAX_PRECISION} decimal places"
            )),
            _ => Ok(()),
        }
    }

    /// Result formatter carrying this configuration's rounding and markers
    pub fn formatter(&self) -> ResultFormatter {
        ResultFormatter {
            precision: self.precision,
            date_format: self.date_format.clone(),
            missing_marker: self.missing_marker.clone(),
            undefined_marker: self.undefined_marker.clone(),
            ..Default::default()
        }
    }

    /// Requested chart columns, `None` when the default selection applies
    pub fn chart_selection(&self) -> Option<&[String]> {
        (!self.chart_columns.is_empty()).then_some(self.chart_columns.as_slice())
    }

    /// Get output directory, creating timestamped subdirectory if enabled
    pub fn get_output_dir(&self) -> PathBuf {
        if self.create_timestamped_dirs {
            let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
            self.output_dir.join(timestamp)
        } else {
            self.output_dir.clone()
        }
    }
}

impl OutputFormat {
    /// Get file extension for the format
    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_extension())
    }
}
