//! Argument groups and helpers shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use choromap::color::Color;
use choromap::composition::{CompositionOptions, MapComposition};
use choromap::config::ConfigFile;
use choromap::dataset::{mappers, Dataset, DatasetHandle, DatasetOptions};
use choromap::geometry::GeometryRegistry;
use choromap::layer::{FeatureState, Layer, LayerConfig};
use choromap::source::SourceFetcher;
use choromap::Value;

use crate::error::CliError;

/// Id of the single layer the CLI drives.
pub const LAYER_ID: &str = "main";

/// Geometry source and feature keys.
#[derive(Debug, Args)]
pub struct GeometryArgs {
    /// TopoJSON source (path or http(s) URL)
    #[arg(long, short = 'g')]
    pub geometry: String,

    /// Feature property used as the feature id
    #[arg(long, short = 'p')]
    pub primary: String,

    /// Feature property holding a display name
    #[arg(long)]
    pub secondary: Option<String>,
}

/// Tabular source joined onto the features.
#[derive(Debug, Args)]
pub struct DataArgs {
    /// CSV source (path or http(s) URL)
    #[arg(long, short = 'd')]
    pub data: String,

    /// Column holding the row key matched against feature ids
    #[arg(long)]
    pub data_key: String,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Columns kept as text; every other column is read as a number
    #[arg(long, value_delimiter = ',')]
    pub text_columns: Vec<String>,
}

impl DataArgs {
    /// Starts loading the dataset described by these arguments.
    pub fn load(&self, fetcher: Arc<dyn SourceFetcher>) -> Result<DatasetHandle, CliError> {
        let delimiter = u8::try_from(self.delimiter).map_err(|_| {
            CliError::InvalidArgument(format!("delimiter '{}' is not ASCII", self.delimiter))
        })?;

        let mut text_columns = self.text_columns.clone();
        text_columns.push(self.data_key.clone());

        let options = DatasetOptions::new(&self.data_key)
            .with_delimiter(delimiter)
            .with_mapper(mappers::numeric_except(text_columns));
        Ok(Dataset::load("data", fetcher, &self.data, options))
    }
}

/// Load configuration from `path`, or from the default location.
pub fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Builds a composition and its fetcher from configuration.
pub fn build_map(
    config: &ConfigFile,
) -> Result<(MapComposition, Arc<dyn SourceFetcher>), CliError> {
    build_map_with(config, config.composition_options())
}

/// Like [`build_map`], with explicit composition options.
pub fn build_map_with(
    config: &ConfigFile,
    options: CompositionOptions,
) -> Result<(MapComposition, Arc<dyn SourceFetcher>), CliError> {
    let fetcher: Arc<dyn SourceFetcher> = Arc::new(config.fetcher()?);
    let map = MapComposition::new(
        "choromap",
        config.map_size(),
        options,
        Arc::new(GeometryRegistry::new()),
        Arc::clone(&fetcher),
    );
    Ok((map, fetcher))
}

/// Creates the CLI layer on `map`.
pub fn create_layer(map: &MapComposition, args: &GeometryArgs, config: &ConfigFile) -> Layer {
    let mut layer_config = LayerConfig::new(&args.primary)
        .with_autofit(true)
        .with_blank(config.fill.blank);
    if let Some(secondary) = &args.secondary {
        layer_config = layer_config.with_secondary(secondary);
    }
    map.get_or_create_layer(LAYER_ID, layer_config)
}

/// Parses a comma separated list of two or three colors.
pub fn parse_colors(s: &str) -> Result<Vec<Color>, CliError> {
    let colors = s
        .split(',')
        .map(|c| c.trim().parse::<Color>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    if !(2..=3).contains(&colors.len()) {
        return Err(CliError::InvalidArgument(format!(
            "expected 2 or 3 colors, got {}",
            colors.len()
        )));
    }
    Ok(colors)
}

/// Parses a `min,max` domain.
pub fn parse_domain(s: &str) -> Result<(f64, f64), CliError> {
    let invalid = || CliError::InvalidArgument(format!("invalid domain '{}', expected min,max", s));
    let (min, max) = s.split_once(',').ok_or_else(invalid)?;
    let min: f64 = min.trim().parse().map_err(|_| invalid())?;
    let max: f64 = max.trim().parse().map_err(|_| invalid())?;
    Ok((min, max))
}

/// Short human readable form of a feature state.
pub fn describe_state(state: FeatureState) -> String {
    match state {
        FeatureState::Unloaded => "unloaded".to_string(),
        FeatureState::Loaded => "loaded".to_string(),
        FeatureState::Rendered => "rendered".to_string(),
        FeatureState::Filled(color) => format!("filled {}", color),
        FeatureState::Blank(color) => format!("blank {}", color),
    }
}

/// Renders an optional property value, `-` when absent.
pub fn describe_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
