//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use plansync_cli::settings::SETTINGS_FILENAME;

#[derive(Parser)]
#[command(
    name = "plansync",
    version,
    about = "Transform and validate payroll records for retirement plan record-keepers",
    long_about = "Transform payroll records into a plan record-keeper's schema using a stored\n\
                  mapping configuration, then check them against validation rules.\n\n\
                  Configurations, rules and execution logs live in a JSON directory\n\
                  repository configured in plansync.toml."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
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

    /// Allow record values in diagnostics. Values are redacted otherwise.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Settings file.
    #[arg(
        long = "settings",
        value_name = "PATH",
        default_value = SETTINGS_FILENAME,
        global = true
    )]
    pub settings: PathBuf,

    /// Repository directory (overrides `store_dir` from the settings file).
    #[arg(long = "store-dir", value_name = "DIR", global = true)]
    pub store_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a stored mapping configuration to a batch of records.
    Apply(ApplyArgs),

    /// List execution logs of a mapping configuration, newest first.
    Logs(LogsArgs),

    /// Validate a mapping configuration file without saving it.
    Check(CheckArgs),

    /// Save a mapping configuration into the repository.
    ImportConfig(ImportConfigArgs),

    /// Save validation rules into the repository.
    ImportRules(ImportRulesArgs),

    /// List the built-in transformation functions.
    Functions,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Mapping configuration id.
    #[arg(long = "config", value_name = "ID")]
    pub config: String,

    /// Tenant the batch belongs to.
    #[arg(long = "tenant", value_name = "ID")]
    pub tenant: String,

    /// Source records: a JSON array of objects, or a `.csv` file with a
    /// header row.
    #[arg(long = "records", value_name = "FILE")]
    pub records: PathBuf,

    /// Compute the result without writing an execution log.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Skip validation rules.
    #[arg(long = "skip-validation")]
    pub skip_validation: bool,

    /// File import id recorded in the execution log.
    #[arg(long = "file-import", value_name = "ID")]
    pub file_import: Option<String>,

    /// Write the full result as JSON.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct LogsArgs {
    #[arg(long = "config", value_name = "ID")]
    pub config: String,

    #[arg(long = "tenant", value_name = "ID")]
    pub tenant: String,

    /// Maximum number of entries (default from settings).
    #[arg(long = "limit", value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Mapping configuration JSON file.
    #[arg(value_name = "FILE")]
    pub configuration: PathBuf,

    /// CSV or JSON sample whose field names condition and formula
    /// references are checked against.
    #[arg(long = "sample", value_name = "FILE")]
    pub sample: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportConfigArgs {
    /// Mapping configuration JSON file.
    #[arg(value_name = "FILE")]
    pub configuration: PathBuf,

    /// Reject the save unless the stored version matches.
    #[arg(long = "expected-version", value_name = "VERSION")]
    pub expected_version: Option<u32>,
}

#[derive(Args)]
pub struct ImportRulesArgs {
    /// JSON file with one rule or an array of rules.
    #[arg(value_name = "FILE")]
    pub rules: PathBuf,
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
