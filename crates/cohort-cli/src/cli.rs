//! CLI argument definitions for the cohort feature builder.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort-unify",
    version,
    about = "Build a patient-level, time-indexed feature table from EHR extracts",
    long_about = "Assemble preprocessed EHR event tables into one model-ready table with\n\
                  one row per patient per anchor date: backward-looking clinical features\n\
                  joined within lookback windows, and forward-looking censored labels."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient-level values in trace logs.
    ///
    /// By default every patient identifier and clinical value is replaced with
    /// a redaction token before it reaches the logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the unified feature table for one alignment.
    Unify(UnifyArgs),

    /// List the event tables the pipeline consumes.
    Sources,
}

#[derive(Parser)]
pub struct UnifyArgs {
    /// Data directory containing interim/<source>.parquet and external/.
    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: PathBuf,

    /// What the anchor rows align on: treatment-dates, clinic-visits,
    /// weekly-mondays, or a path to a parquet/CSV anchor table.
    #[arg(
        long = "align-on",
        value_name = "MODE|PATH",
        default_value = "treatment-dates"
    )]
    pub align_on: String,

    /// Anchor date column for grid and external alignment.
    #[arg(
        long = "date-column",
        value_name = "NAME",
        default_value = "assessment_date"
    )]
    pub date_column: String,

    /// First day of the weekly-mondays grid (YYYY-MM-DD).
    #[arg(long = "start", value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last day of the weekly-mondays grid (YYYY-MM-DD).
    #[arg(long = "end", value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Destination parquet file (default: <DATA_DIR>/processed/unified.parquet).
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// JSON run configuration; missing fields fall back to defaults.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
