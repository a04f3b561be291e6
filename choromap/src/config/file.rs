//! Configuration file handling for ~/.choromap/config.ini.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::settings::ConfigFile;

const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while reading or writing `config.ini`.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot parse configuration: {0}")]
    Unreadable(#[from] ini::Error),

    #[error("cannot write configuration: {0}")]
    Unwritable(std::io::Error),

    /// A key is present but its value does not fit the setting.
    #[error("invalid configuration: [{section}] {key} = '{value}' ({reason})")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Load configuration from the default path (~/.choromap/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, defaults apply");
            return Ok(Self::default());
        }

        super::parser::parse_ini(&Ini::load_from_file(path)?)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        super::parser::parse_ini(&ini)
    }

    /// Writes this configuration to `path`, creating missing directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        dir.map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::write(path, self.to_ini_string()))
            .map_err(ConfigFileError::Unwritable)
    }

    /// Commented INI representation of this configuration.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }
}

/// `~/.choromap`, or `./.choromap` when no home directory is known.
pub fn config_directory() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(".choromap"), |home| home.join(".choromap"))
}

/// `~/.choromap/config.ini`
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}
