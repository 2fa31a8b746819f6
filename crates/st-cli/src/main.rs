//! sqltrace CLI - trace table and column lineage across multi-file SQL pipelines

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{analyze, dialects};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        cli::Commands::Analyze(args) => analyze::execute(args, &cli.global).await,
        cli::Commands::Dialects => dialects::execute(),
        #[cfg(feature = "serve")]
        cli::Commands::Serve(args) => commands::serve::execute(args, &cli.global).await,
    }
}
