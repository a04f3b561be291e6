//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI file and converts into
//! the options types used by the library.

use std::path::PathBuf;
use std::time::Duration;

use crate::color::Color;
use crate::composition::{CompositionOptions, Margins, MapSize};
use crate::layer::{FillOptions, LabelOptions, DEFAULT_BLANK, DEFAULT_COLORS};
use crate::source::{DefaultFetcher, FetchError, FileFetcher, HttpFetcher};
use crate::viewport::ZoomConfig;

/// Default map width in pixels.
pub const DEFAULT_WIDTH: f64 = 960.0;

/// Default map height in pixels.
pub const DEFAULT_HEIGHT: f64 = 500.0;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub map: MapSettings,
    pub fill: FillSettings,
    pub labels: LabelSettings,
    pub fetch: FetchSettings,
}

/// `[map]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    /// Zoom transition duration.
    pub duration: Duration,
    /// Zoom transition delay.
    pub delay: Duration,
    /// Whether interactive zoom is allowed.
    pub zoomable: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        let zoom = ZoomConfig::default();
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            margins: Margins::default(),
            duration: zoom.duration,
            delay: zoom.delay,
            zoomable: zoom.zoomable,
        }
    }
}

/// `[fill]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FillSettings {
    /// Two or three ramp colors.
    pub colors: Vec<Color>,
    /// Color of features without data.
    pub blank: Color,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
            blank: DEFAULT_BLANK,
        }
    }
}

/// `[labels]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSettings {
    pub delay: Duration,
    pub duration: Duration,
}

impl Default for LabelSettings {
    fn default() -> Self {
        let options = LabelOptions::default();
        Self {
            delay: options.delay,
            duration: options.duration,
        }
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Directory relative file sources resolve against.
    pub base_dir: Option<PathBuf>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: crate::source::DEFAULT_TIMEOUT_SECS,
            base_dir: None,
        }
    }
}

impl ConfigFile {
    pub fn map_size(&self) -> MapSize {
        MapSize::new(self.map.width, self.map.height).with_margins(self.map.margins)
    }

    pub fn composition_options(&self) -> CompositionOptions {
        CompositionOptions::default().with_zoom(
            ZoomConfig::default()
                .with_duration(self.map.duration)
                .with_delay(self.map.delay)
                .with_zoomable(self.map.zoomable),
        )
    }

    pub fn fill_options(&self) -> FillOptions {
        FillOptions::new(self.fill.colors.clone())
    }

    pub fn label_options(&self) -> LabelOptions {
        LabelOptions {
            delay: self.labels.delay,
            duration: self.labels.duration,
        }
    }

    /// Builds the source fetcher described by `[fetch]`.
    pub fn fetcher(&self) -> Result<DefaultFetcher, FetchError> {
        let http = HttpFetcher::with_timeout(self.fetch.timeout_secs)?;
        let file = match &self.fetch.base_dir {
            Some(dir) => FileFetcher::with_base_dir(dir.clone()),
            None => FileFetcher::new(),
        };
        Ok(DefaultFetcher::with_parts(http, file))
    }
}
