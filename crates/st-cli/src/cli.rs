//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// sqltrace - trace table and column lineage across multi-file SQL pipelines
#[derive(Parser, Debug)]
#[command(name = "sqltrace")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze SQL files and print the lineage graph
    Analyze(AnalyzeArgs),

    /// List supported SQL dialects
    Dialects,

    /// Serve the lineage analysis API over HTTP
    #[cfg(feature = "serve")]
    Serve(ServeArgs),
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// SQL files to analyze, in pipeline order
    #[arg(required = true)]
    pub files: Vec<String>,

    /// SQL dialect used for parsing
    #[arg(short, long, default_value = "generic")]
    pub dialect: String,

    /// Include column-level lineage
    #[arg(long)]
    pub columns: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Analyze output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// Wire-format JSON
    Json,
}

/// Arguments for the serve command
#[cfg(feature = "serve")]
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}
