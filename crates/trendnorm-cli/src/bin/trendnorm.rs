//! trendnorm - Google Trends batch normalizer
//!
//! Rescales separately downloaded Google Trends batches onto one common
//! scale through a keyword shared by every batch (the anchor), merges them
//! into one table and writes the result workbook.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendnorm_batch::{
    sorted_batch_paths, EngineReport, NormalizationEngine, WorkbookExportResult,
};
use trendnorm_config::{CliConfigMerge, LogLevel, OutputFormat, Settings};
use trendnorm_core::{AnchorPolicy, JoinPolicy, LoadPolicy, ScalingMode};

#[derive(Parser, Debug)]
#[command(
    name = "trendnorm",
    about = "Normalize Google Trends batches onto a common scale",
    long_about = "
Google Trends scales every download to 0-100 relative to its own maximum, so
values from different downloads are not comparable. trendnorm rescales each
batch onto a reference batch through an anchor keyword present in all of them.

Examples:
  trendnorm candidates batch1.csv batch2.csv
  trendnorm normalize batch1.csv batch2.csv batch3.csv
  trendnorm normalize --anchor coffee --scaling batch-wise data/*.csv
  trendnorm --config trendnorm.toml normalize --format parquet data/*.csv
",
    version
)]
struct Cli {
    /// Configuration file (defaults to ./trendnorm.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevelArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize batches and export the workbook
    Normalize(NormalizeArgs),

    /// List the keywords every batch shares
    Candidates(CandidatesArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    /// Batch CSV files, in batch order
    #[arg(required = true, num_args = 2..)]
    files: Vec<PathBuf>,

    /// Anchor keyword (default: the single keyword common to all batches)
    #[arg(short, long)]
    anchor: Option<String>,

    /// Take the first common keyword when several qualify
    #[arg(long)]
    first_candidate: bool,

    /// 0-based position of the reference batch among FILES
    #[arg(short, long)]
    reference: Option<usize>,

    /// One scaling factor per date or one per batch
    #[arg(long, value_enum)]
    scaling: Option<ScalingArg>,

    /// How the anchor column is rewritten in scaled batches
    #[arg(long, value_enum)]
    anchor_policy: Option<AnchorPolicyArg>,

    /// Dates kept in the merged table
    #[arg(long, value_enum)]
    join: Option<JoinArg>,

    /// Decimal places of exported values
    #[arg(short, long)]
    precision: Option<u32>,

    /// Keep full precision in exported values
    #[arg(long, conflicts_with = "precision")]
    full_precision: bool,

    /// Value used for "<1" cells (unset leaves them missing)
    #[arg(long, value_name = "VALUE")]
    below_threshold: Option<f64>,

    /// Workbook output format
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Workbook file stem
    #[arg(long)]
    stem: Option<String>,

    /// Columns of the chart sheet
    #[arg(long, value_delimiter = ',')]
    chart_columns: Option<Vec<String>>,

    /// Skip the chart sheet
    #[arg(long)]
    no_chart: bool,

    /// Skip the anchor audit sheet
    #[arg(long)]
    no_audit: bool,

    /// Abort on the first batch that cannot be read or loaded
    #[arg(long)]
    fail_fast: bool,

    /// Order FILES by their embedded numbers (batch2 before batch10)
    #[arg(long)]
    sort: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CandidatesArgs {
    /// Batch CSV files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScalingArg {
    #[value(alias = "row")]
    RowWise,
    #[value(alias = "batch")]
    BatchWise,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnchorPolicyArg {
    Replace,
    Scale,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JoinArg {
    Outer,
    Inner,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliConfigMerge for Cli {
    fn merge_into_config(&self, config: &mut Settings) {
        if let Some(level) = self.log_level {
            config.app.log_level = match level {
                LogLevelArg::Error => LogLevel::Error,
                LogLevelArg::Warn => LogLevel::Warn,
                LogLevelArg::Info => LogLevel::Info,
                LogLevelArg::Debug => LogLevel::Debug,
                LogLevelArg::Trace => LogLevel::Trace,
            };
        }
        if let Command::Normalize(args) = &self.command {
            args.merge_into_config(config);
        }
    }
}

impl CliConfigMerge for NormalizeArgs {
    fn merge_into_config(&self, config: &mut Settings) {
        let normalization = &mut config.normalization;
        if let Some(anchor) = &self.anchor {
            normalization.anchor = Some(anchor.clone());
        }
        if self.first_candidate {
            normalization.first_candidate = true;
        }
        if let Some(reference) = self.reference {
            normalization.reference_batch = reference;
        }
        if let Some(scaling) = self.scaling {
            normalization.scaling_mode = match scaling {
                ScalingArg::RowWise => ScalingMode::RowWise,
                ScalingArg::BatchWise => ScalingMode::BatchWise,
            };
        }
        if let Some(policy) = self.anchor_policy {
            normalization.anchor_policy = match policy {
                AnchorPolicyArg::Replace => AnchorPolicy::ReplaceWithReference,
                AnchorPolicyArg::Scale => AnchorPolicy::ScaleInPlace,
            };
        }
        if let Some(join) = self.join {
            normalization.join = match join {
                JoinArg::Outer => JoinPolicy::Outer,
                JoinArg::Inner => JoinPolicy::Inner,
            };
        }
        if self.no_audit {
            normalization.audit = false;
        }

        if let Some(value) = self.below_threshold {
            config.data.below_threshold_value = Some(value);
        }
        if self.fail_fast {
            config.data.load_policy = LoadPolicy::FailFast;
        }

        let export = &mut config.export;
        if self.full_precision {
            export.precision = None;
        } else if let Some(precision) = self.precision {
            export.precision = Some(precision);
        }
        if let Some(format) = self.format {
            export.format = match format {
                FormatArg::Csv => OutputFormat::Csv,
                FormatArg::Parquet => OutputFormat::Parquet,
                FormatArg::Json => OutputFormat::Json,
            };
        }
        if let Some(dir) = &self.output_dir {
            export.output_dir = dir.clone();
        }
        if let Some(stem) = &self.stem {
            export.file_stem = stem.clone();
        }
        if let Some(columns) = &self.chart_columns {
            export.chart_columns = columns.clone();
        }
        if self.no_chart {
            export.include_chart_sheet = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Settings::load().context("Failed to load configuration")?,
    }
    .merge_cli_args(&cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.app.log_directive())),
        )
        .with_target(settings.app.is_debug())
        .init();

    match &cli.command {
        Command::Normalize(args) => run_normalize(settings, args),
        Command::Candidates(args) => run_candidates(settings, args),
        Command::Config => {
            print!("{}", settings.to_toml().context("Failed to render configuration")?);
            Ok(())
        }
    }
}

fn run_normalize(settings: Settings, args: &NormalizeArgs) -> Result<()> {
    let files = if args.sort {
        sorted_batch_paths(args.files.clone())
    } else {
        args.files.clone()
    };

    let engine = NormalizationEngine::new(settings)?;
    let report = engine.run(&files)?;
    let exported = engine.export(&report)?;

    info!(
        event_type = "run_finished",
        files = exported.sheets.len(),
        "Normalized workbook written"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&report, &exported))?);
    } else {
        print_summary(&report);
        for file in exported.files() {
            println!("  wrote {}", file.display());
        }
    }
    Ok(())
}

fn run_candidates(settings: Settings, args: &CandidatesArgs) -> Result<()> {
    let engine = NormalizationEngine::new(settings)?;
    let report = engine.candidates(&args.files)?;

    if report.keyword_sets.is_empty() {
        bail!("None of the {} file(s) could be loaded", args.files.len());
    }

    if args.json {
        let value = serde_json::json!({
            "candidates": report.candidates,
            "batches": report
                .keyword_sets
                .iter()
                .map(|(label, keywords)| serde_json::json!({ "batch": label, "keywords": keywords }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (label, keywords) in &report.keyword_sets {
        println!("{label}: {}", keywords.join(", "));
    }
    if report.candidates.is_empty() {
        println!("No keyword is common to all batches");
    } else {
        println!("Common keywords: {}", report.candidates.join(", "));
    }
    Ok(())
}

fn print_summary(report: &EngineReport) {
    let normalization = &report.normalization;
    let counts = normalization.diagnostics.counts();

    println!("Anchor:     {}", normalization.anchor);
    println!("Reference:  {}", normalization.reference_label());
    println!("Batches:    {}", normalization.batches.len());
    println!(
        "Table:      {} rows x {} columns",
        normalization.table.len(),
        normalization.table.columns.len()
    );
    for stats in &report.factor_statistics {
        match (stats.mean, stats.min, stats.max) {
            (Some(mean), Some(min), Some(max)) => println!(
                "  {}: factor mean {mean:.4} (min {min:.4}, max {max:.4}), {} undefined, {} unaligned",
                stats.batch, stats.undefined, stats.unaligned
            ),
            _ => println!(
                "  {}: no defined factor, {} undefined, {} unaligned",
                stats.batch, stats.undefined, stats.unaligned
            ),
        }
    }
    if counts.total() > 0 {
        println!("Issues:     {} (see warnings above)", counts.total());
    }
}

fn summary_json(
    report: &EngineReport,
    exported: &WorkbookExportResult,
) -> serde_json::Value {
    let normalization = &report.normalization;
    serde_json::json!({
        "anchor": normalization.anchor,
        "reference": normalization.reference_label(),
        "batches": normalization.batches.iter().map(|b| &b.label).collect::<Vec<_>>(),
        "rows": normalization.table.len(),
        "columns": normalization.table.columns,
        "factor_statistics": report.factor_statistics,
        "issues": normalization.diagnostics.counts(),
        "unreadable": report.unreadable,
        "files": exported.files().map(|p| p.display().to_string()).collect::<Vec<_>>(),
    })
}
