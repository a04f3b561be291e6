//! choromap CLI - headless driver for the choropleth pipeline
//!
//! Loads a TopoJSON layer and a CSV dataset, runs the queued pipeline and
//! prints per-feature states, statistics or zoom targets.

mod commands;
mod error;

use std::path::PathBuf;

use choromap::config::ConfigFile;
use choromap::logging::{default_log_dir, init_logging, LoggingGuard, DEFAULT_LOG_FILE};
use clap::{Parser, Subcommand};

use commands::common::load_config;
use commands::config::ConfigCommands;
use commands::fill::FillArgs;
use commands::stats::StatsArgs;
use commands::zoom::ZoomArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "choromap")]
#[command(version)]
#[command(about = "Color map features from tabular data", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.choromap/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the log file (defaults to ~/.choromap/logs)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a dataset onto a layer, fill it and print every feature state
    Fill(FillArgs),

    /// Print statistics of joined properties
    Stats(StatsArgs),

    /// Print the viewport transform framing a layer or a feature
    Zoom(ZoomArgs),

    /// View or initialize the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command, cli.config.as_ref()),
        Commands::Fill(args) => {
            let (_guard, config) = prepare(cli.config.as_ref(), cli.log_dir)?;
            commands::fill::run(args, config).await
        }
        Commands::Stats(args) => {
            let (_guard, config) = prepare(cli.config.as_ref(), cli.log_dir)?;
            commands::stats::run(args, config).await
        }
        Commands::Zoom(args) => {
            let (_guard, config) = prepare(cli.config.as_ref(), cli.log_dir)?;
            commands::zoom::run(args, config).await
        }
    }
}

/// Initializes logging and loads the configuration for a pipeline command.
fn prepare(
    config_path: Option<&PathBuf>,
    log_dir: Option<PathBuf>,
) -> Result<(LoggingGuard, ConfigFile), CliError> {
    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    let guard = init_logging(&log_dir, DEFAULT_LOG_FILE)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    let config = load_config(config_path)?;
    Ok((guard, config))
}
