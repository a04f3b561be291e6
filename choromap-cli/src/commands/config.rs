//! Configuration management CLI commands.
//!
//! Provides `config show`, `config path` and `config init`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use choromap::config::{config_file_path, ConfigFile};

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, path: Option<&PathBuf>) -> Result<(), CliError> {
    let path = path.cloned().unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Path => run_path(&path),
        ConfigCommands::Init { force } => run_init(&path, force),
    }
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(&path.to_path_buf()))?;
    print!("{}", config.to_ini_string());
    Ok(())
}

fn run_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    if !path.exists() {
        println!("(file does not exist, defaults are in effect)");
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "'{}' already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_defaults_and_refuses_overwrite() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.ini");

        run_init(&path, false).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());

        assert!(matches!(run_init(&path, false), Err(CliError::Config(_))));
        run_init(&path, true).unwrap();
    }

    #[test]
    fn test_show_missing_file_uses_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        run_show(&temp_dir.path().join("config.ini")).unwrap();
    }
}
