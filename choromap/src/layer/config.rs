//! Layer configuration and per-call options.

use std::sync::Arc;
use std::time::Duration;

use crate::color::Color;
use crate::projection::{self, Projection, SharedProjection};
use crate::source::{MemoryFetcher, SourceFetcher};
use crate::viewport::{Viewport, ViewportSize};

/// Default blank color for features without data.
pub const DEFAULT_BLANK: Color = Color::rgb(0xee, 0xee, 0xee);

/// Default fill ramp, white to black.
pub const DEFAULT_COLORS: [Color; 2] = [Color::rgb(0xff, 0xff, 0xff), Color::rgb(0, 0, 0)];

/// Final label font size before zoom scaling.
pub const LABEL_FONT_SIZE: f64 = 24.0;

/// Zoom level from which labels are shown.
pub const LABEL_MIN_LEVEL: f64 = 4.0;

/// Static configuration of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    /// Property identifying features.
    pub primary: String,
    /// Property holding a display name.
    pub secondary: Option<String>,
    /// Group name used by compositions to fade layers together.
    pub class_name: Option<String>,
    /// Fit the shared projection to this layer when rendering.
    pub autofit: bool,
    /// Color of features without a value.
    pub blank: Color,
    /// Whether features react to clicks.
    pub clickable: bool,
}

impl LayerConfig {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
            class_name: None,
            autofit: false,
            blank: DEFAULT_BLANK,
            clickable: true,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_autofit(mut self, autofit: bool) -> Self {
        self.autofit = autofit;
        self
    }

    pub fn with_blank(mut self, blank: Color) -> Self {
        self.blank = blank;
        self
    }

    pub fn with_clickable(mut self, clickable: bool) -> Self {
        self.clickable = clickable;
        self
    }
}

/// Options of a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOptions {
    /// Two colors for a linear ramp, three for a diverging one.
    pub colors: Vec<Color>,
    /// Overrides the computed `(min, max)`; the mean still comes from the data.
    pub domain: Option<(f64, f64)>,
    pub clamp: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
            domain: None,
            clamp: true,
        }
    }
}

impl FillOptions {
    pub fn new(colors: Vec<Color>) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }

    pub fn with_domain(mut self, min: f64, max: f64) -> Self {
        self.domain = Some((min, max));
        self
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }
}

/// Timing of label entrance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelOptions {
    pub delay: Duration,
    pub duration: Duration,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
            duration: Duration::from_millis(1000),
        }
    }
}

/// Timing of a fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeOptions {
    pub delay: Duration,
    pub duration: Duration,
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            duration: Duration::from_millis(500),
        }
    }
}

impl FadeOptions {
    pub fn new(duration: Duration) -> Self {
        Self {
            delay: Duration::ZERO,
            duration,
        }
    }
}

/// Collaborators a layer shares with its composition.
#[derive(Clone)]
pub struct LayerContext {
    pub projection: SharedProjection,
    pub viewport: Viewport,
    pub fetcher: Arc<dyn SourceFetcher>,
}

impl LayerContext {
    pub fn new(
        projection: SharedProjection,
        viewport: Viewport,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self {
            projection,
            viewport,
            fetcher,
        }
    }

    /// Standalone context: Mercator, 960×500 viewport, no sources.
    pub fn detached() -> Self {
        Self::new(
            projection::shared(Projection::mercator()),
            Viewport::new(ViewportSize::new(960.0, 500.0)),
            Arc::new(MemoryFetcher::new()),
        )
    }
}

impl std::fmt::Debug for LayerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerContext")
            .field("projection", &*self.projection.read())
            .field("viewport", &self.viewport)
            .finish()
    }
}
