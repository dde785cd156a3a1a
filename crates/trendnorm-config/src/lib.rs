//! Configuration management for trendnorm
//!
//! Centralized configuration handling with support for:
//! - Default values
//! - Configuration files (TOML, `trendnorm.toml`)
//! - Environment variables (`TRENDNORM_<SECTION>__<KEY>`)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

mod app;
mod data;
mod export;
mod normalization;

// Re-export main types
pub use app::{AppConfig, LogLevel};
pub use data::DataConfig;
pub use export::{ExportConfig, OutputFormat};
pub use normalization::NormalizationConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;
use trendnorm_core::NormalizeOptions;

/// Default configuration file name (extension resolved by the `config` crate)
pub const CONFIG_FILE_NAME: &str = "trendnorm";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TRENDNORM";

/// Root configuration structure containing all configuration categories
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application-wide settings
    pub app: AppConfig,

    /// Batch source and loading configuration
    pub data: DataConfig,

    /// Anchor selection, scaling and merging
    pub normalization: NormalizationConfig,

    /// Export and output configuration
    pub export: ExportConfig,
}

impl Settings {
    /// Load configuration from multiple sources with proper precedence
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(
            config::File::with_name(CONFIG_FILE_NAME)
                .format(config::FileFormat::Toml)
                .required(false),
            environment(),
        )
    }

    /// Load configuration from a specific file path (environment still applies)
    pub fn load_from_file(path: &Path) -> Result<Self, config::ConfigError> {
        Self::build(
            config::File::from(path).format(config::FileFormat::Toml),
            environment(),
        )
    }

    fn build<F>(file: F, env: config::Environment) -> Result<Self, config::ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let builder = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(env);

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Merge command-line arguments into the loaded configuration
    pub fn merge_cli_args(mut self, cli_args: &dyn CliConfigMerge) -> Self {
        cli_args.merge_into_config(&mut self);
        self
    }

    /// Core pipeline options described by this configuration
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            loader: self.data.loader_options(),
            anchor: self.normalization.anchor_selection(),
            scaling: self.normalization.scaling_options(),
            join: self.normalization.join,
            load_policy: self.data.load_policy,
            audit_batches: self.normalization.audit_pair(),
        }
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// `TRENDNORM_` prefixed variables; `__` separates section and key
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("export.chart_columns")
        .with_list_parse_key("data.date_formats")
        .try_parsing(true)
}

/// Trait for merging CLI arguments into configuration
pub trait CliConfigMerge {
    fn merge_into_config(&self, config: &mut Settings);
}
