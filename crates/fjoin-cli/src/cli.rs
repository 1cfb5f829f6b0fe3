//! CLI argument definitions for fjoin.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use fjoin_model::{JoinHow, MergeDirection};

#[derive(Parser)]
#[command(
    name = "fjoin",
    version,
    about = "Top-1 fuzzy joins between two CSV files",
    long_about = "Join two CSV files on exact keys and on fuzzy keys matched to their\n\
                  closest counterpart.\n\n\
                  Each fuzzy key is a level: every left value is paired with the right\n\
                  value(s) of minimal difference, optionally within blocks of equal\n\
                  exact keys."
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
}

#[derive(Subcommand)]
pub enum Command {
    /// Join two CSV files and optionally write the result.
    Join(JoinArgs),

    /// Show the top-1 mapping of one fuzzy level without joining.
    Preview(PreviewArgs),

    /// List the built-in difference functions.
    Differences,
}

#[derive(Args)]
pub struct InputArgs {
    /// Left CSV file; every left row is kept by the fuzzy levels.
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,

    /// Right CSV file.
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,

    /// JSON join configuration; flags below override its values.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct KeyArgs {
    /// Exact key column, `COL` or `LEFT:RIGHT`. Repeat for several keys.
    #[arg(long = "exact", value_name = "KEY")]
    pub exact: Vec<String>,

    /// Fuzzy key column, `COL` or `LEFT:RIGHT`. Each one is a level.
    #[arg(long = "fuzzy", value_name = "KEY")]
    pub fuzzy: Vec<String>,
}

#[derive(Args)]
pub struct LevelArgs {
    /// Difference function by name, applied to every level. Later ones
    /// break ties left by earlier ones.
    #[arg(long = "difference", value_name = "NAME")]
    pub differences: Vec<String>,

    /// Drop candidates whose primary difference exceeds this value.
    #[arg(long = "cutoff", value_name = "DIFF")]
    pub cutoff: Option<f64>,

    /// Consider only the first N distinct left values per block.
    #[arg(long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    /// Search direction for numeric and date keys.
    #[arg(long = "direction", value_enum)]
    pub direction: Option<DirectionArg>,
}

#[derive(Args)]
pub struct JoinArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub keys: KeyArgs,

    #[command(flatten)]
    pub level: LevelArgs,

    /// Join type for the exact keys.
    #[arg(long = "how", value_enum)]
    pub how: Option<HowArg>,

    /// Write the joined table to this CSV file.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Keep internal mapping columns (`__top1*`, `__matchtype*`).
    #[arg(long = "debug")]
    pub debug: bool,

    /// Exit with status 2 when a left value has tied top-1 matches.
    #[arg(long = "fail-on-duplicates")]
    pub fail_on_duplicates: bool,
}

#[derive(Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub keys: KeyArgs,

    #[command(flatten)]
    pub level: LevelArgs,

    /// Fuzzy level to preview.
    #[arg(long = "level", default_value_t = 0)]
    pub index: usize,

    /// Distinct left values per block to resolve (0 for all).
    #[arg(long = "sample", default_value_t = 20)]
    pub sample: usize,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HowArg {
    Inner,
    Left,
    Right,
    Outer,
}

impl From<HowArg> for JoinHow {
    fn from(value: HowArg) -> Self {
        match value {
            HowArg::Inner => JoinHow::Inner,
            HowArg::Left => JoinHow::Left,
            HowArg::Right => JoinHow::Right,
            HowArg::Outer => JoinHow::Outer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Nearest,
    Forward,
    Backward,
}

impl From<DirectionArg> for MergeDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Nearest => MergeDirection::Nearest,
            DirectionArg::Forward => MergeDirection::Forward,
            DirectionArg::Backward => MergeDirection::Backward,
        }
    }
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
