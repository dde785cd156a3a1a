//! Batch source and loading configuration

use serde::{Deserialize, Serialize};
use trendnorm_core::dates::DEFAULT_DATE_FORMATS;
use trendnorm_core::{DatePolicy, LoadPolicy, LoaderOptions};

/// Batch source and loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Records discarded before the header row (Google Trends writes one title line)
    pub title_rows: usize,

    /// Field delimiter of input files
    pub delimiter: char,

    /// Strict date formats, tried in order
    pub date_formats: Vec<String>,

    /// Day-first numeric fallback when no strict format matches
    pub lenient_dates: bool,

    /// Value for `"<1"` cells; unset treats them as unparseable
    pub below_threshold_value: Option<f64>,

    /// Skip unloadable batches or abort on the first one
    pub load_policy: LoadPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            title_rows: 1,
            delimiter: ',',
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            lenient_dates: true,
            below_threshold_value: None,
            load_policy: LoadPolicy::BestEffort,
        }
    }
}

impl DataConfig {
    pub fn date_policy(&self) -> DatePolicy {
        DatePolicy {
            formats: self.date_formats.clone(),
            lenient: self.lenient_dates,
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            date_policy: self.date_policy(),
            below_threshold_value: self.below_threshold_value,
        }
    }

    /// Delimiter as the single byte the CSV reader expects
    pub fn delimiter_byte(&self) -> Result<u8, String> {
        u8::try_from(self.delimiter)
            .map_err(|_| format!("Delimiter {:?} is not a single-byte character", self.delimiter))
    }
}
