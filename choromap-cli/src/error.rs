//! CLI error types and process exit handling.

use std::process;

use choromap::composition::CompositionError;
use choromap::config::ConfigFileError;
use choromap::layer::LayerError;
use choromap::source::FetchError;
use choromap::viewport::ZoomError;
use thiserror::Error;

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to create source fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("Layer operation failed: {0}")]
    Layer(#[from] LayerError),

    #[error("Zoom failed: {0}")]
    Zoom(#[from] ZoomError),

    #[error("{0}")]
    Composition(#[from] CompositionError),
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("{} {}", console::style("Error:").red().bold(), self);

        match self {
            CliError::Layer(LayerError::LoadFailure { .. }) | CliError::Layer(LayerError::Fetch(_)) => {
                eprintln!();
                eprintln!("Sources are read from disk unless they start with http:// or https://.");
                eprintln!("Relative paths resolve against [fetch] base_dir when it is set.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'choromap config path' to locate the configuration file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}
