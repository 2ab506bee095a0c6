//! Mender CLI - fill in missing album and artist overviews on a Jellyfin server.
//!
//! Mender finds music items whose overview is missing or too short, asks an
//! LLM for a fresh one and writes it back. Every run leaves a timestamped log
//! of what changed.
//!
//! # Usage
//!
//! ```bash
//! # Mend the library described by ./config.json
//! mender run
//!
//! # See what would change, for the first ten items only
//! mender run --dry-run --limit 10
//!
//! # Use another backend for this run
//! mender run --provider anthropic --model claude-3-5-haiku-latest
//!
//! # View configuration
//! mender config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Mender - fill in missing album and artist overviews with an LLM.
#[derive(Parser, Debug)]
#[command(name = "mender")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite missing or short overviews and write them back
    Run(cli::run::RunArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `run` sets up logging itself once it knows the log directory.
    match cli.command {
        Commands::Run(args) => cli::run::execute(args, cli.verbose, cli.json_logs).await,
        Commands::Config(args) => {
            let level = if cli.verbose { "debug" } else { "info" };
            logging::init(level, cli.json_logs, None);
            tracing::debug!("Mender v{}", mender_core::VERSION);
            cli::config::execute(args)
        }
    }
}
