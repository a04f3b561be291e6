//! User configuration loaded from `~/.choromap/config.ini`.
//!
//! Settings structs live in [`settings`], INI parsing in `parser` and
//! serialization in `writer`. A missing file yields defaults.

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, FetchSettings, FillSettings, LabelSettings, MapSettings, DEFAULT_HEIGHT,
    DEFAULT_WIDTH,
};
