//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "offerte",
    version,
    about = "Edit offerte documents with debounced auto-save",
    long_about = "Edit offerte documents with debounced auto-save.\n\n\
                  `offerte edit` reads one JSON document per line from stdin and saves\n\
                  it after a quiet period, exactly like the web editor does."
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

    /// Read configuration from this file instead of the default offerte.toml.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Quiet period before an automatic save, in milliseconds.
    #[arg(long = "debounce-ms", value_name = "MS", global = true)]
    pub debounce_ms: Option<u64>,

    /// Only save on `:save` and at the end of input.
    #[arg(long = "no-autosave", global = true)]
    pub no_autosave: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Edit a document from stdin (one JSON document per line, or :save,
    /// :pause, :resume, :status, :quit).
    Edit(DocumentArgs),

    /// Print a stored document.
    Show(DocumentArgs),

    /// Manage onboarding flags.
    #[command(subcommand)]
    Flags(FlagsCommand),
}

#[derive(Parser)]
pub struct DocumentArgs {
    /// Path to the document file.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
}

#[derive(Subcommand)]
pub enum FlagsCommand {
    /// List all stored flags.
    List,

    /// Print one flag (false when unset).
    Get {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Set a flag (true when no value is given).
    Set {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "VALUE")]
        value: Option<bool>,
    },

    /// Remove a flag.
    Clear {
        #[arg(value_name = "NAME")]
        name: String,
    },
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
