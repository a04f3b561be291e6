//! Map composition: the container tying layers to one projection and viewport.
//!
//! A [`MapComposition`] owns:
//! - the **shared projection** fitted by autofit layers
//! - the **viewport** and its [`ZoomController`]
//! - the **registry** and **fetcher** injected at construction
//!
//! Layers created through the composition share all of the above, so a
//! commune layer created after a department layer is drawn in the same
//! projected space and follows the same zoom.
//!
//! # Example
//!
//! ```ignore
//! let map = MapComposition::new("france", MapSize::new(800.0, 600.0), options, registry, fetcher);
//! let communes = map.get_or_create_layer("_01", LayerConfig::new("COM").with_class_name("communes"));
//! map.fade_out_layers("communes", Some("_01"));
//! map.zoom_on("departements", Some("01"))?;
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::geometry::GeometryRegistry;
use crate::layer::{
    ClickEvent, FadeOptions, InputEvent, Layer, LayerConfig, LayerContext, LayerError,
};
use crate::projection::{self, Projection, SharedProjection};
use crate::queue::OperationHandle;
use crate::source::SourceFetcher;
use crate::viewport::{
    Viewport, ViewportSize, ViewportTransform, ZoomConfig, ZoomController, ZoomError, ZoomEvent,
};

/// Errors raised by composition-level lookups.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompositionError {
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),
}

/// Margins around the drawing area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Outer size of a map and its margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSize {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl MapSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margins: Margins::default(),
        }
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Drawing area left once margins are removed.
    pub fn effective(&self) -> ViewportSize {
        ViewportSize::new(
            (self.width - self.margins.left - self.margins.right).max(0.0),
            (self.height - self.margins.top - self.margins.bottom).max(0.0),
        )
    }
}

/// Composition settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionOptions {
    pub zoom: ZoomConfig,
    /// Margin factor used by [`MapComposition::zoom_on`].
    pub zoom_margin: f64,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            zoom: ZoomConfig::default(),
            zoom_margin: 1.0,
        }
    }
}

impl CompositionOptions {
    pub fn with_zoom(mut self, zoom: ZoomConfig) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_zoom_margin(mut self, margin: f64) -> Self {
        self.zoom_margin = margin;
        self
    }
}

/// Linear opacity ramp over zoom levels, clamped at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityRamp {
    pub levels: (f64, f64),
    pub opacities: (f64, f64),
}

impl OpacityRamp {
    /// Overview layers fade as the map zooms in.
    pub const OVERVIEW: OpacityRamp = OpacityRamp {
        levels: (1.0, 7.0),
        opacities: (1.0, 0.05),
    };

    /// Detail layers appear as the map zooms in.
    pub const DETAIL: OpacityRamp = OpacityRamp {
        levels: (1.0, 6.0),
        opacities: (0.0, 1.0),
    };

    pub fn new(levels: (f64, f64), opacities: (f64, f64)) -> Self {
        Self { levels, opacities }
    }

    /// Opacity at zoom level `k`.
    pub fn at(&self, k: f64) -> f64 {
        let (l0, l1) = self.levels;
        let (o0, o1) = self.opacities;
        if l1 == l0 {
            return if k < l0 { o0 } else { o1 };
        }
        let t = ((k - l0) / (l1 - l0)).clamp(0.0, 1.0);
        o0 + (o1 - o0) * t
    }
}

/// Container of layers sharing one projection and viewport.
pub struct MapComposition {
    name: String,
    size: MapSize,
    options: CompositionOptions,
    projection: SharedProjection,
    viewport: Viewport,
    zoom: ZoomController,
    registry: Arc<GeometryRegistry>,
    fetcher: Arc<dyn SourceFetcher>,
    /// Ids of layers created here, in drawing order.
    order: RwLock<Vec<String>>,
}

impl MapComposition {
    /// Creates a composition. Must run inside a Tokio runtime.
    pub fn new(
        name: impl Into<String>,
        size: MapSize,
        options: CompositionOptions,
        registry: Arc<GeometryRegistry>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        let name = name.into();
        let viewport = Viewport::new(size.effective());
        let zoom = ZoomController::new(
            format!("{}/zoom", name),
            viewport.clone(),
            options.zoom.clone(),
        );
        info!(
            map = %name,
            width = size.width,
            height = size.height,
            zoomable = options.zoom.zoomable,
            "Map composition created"
        );

        Self {
            name,
            size,
            options,
            projection: projection::shared(Projection::mercator()),
            viewport,
            zoom,
            registry,
            fetcher,
            order: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn options(&self) -> &CompositionOptions {
        &self.options
    }

    /// Current projection.
    pub fn projection(&self) -> Projection {
        *self.projection.read()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }

    pub fn registry(&self) -> &Arc<GeometryRegistry> {
        &self.registry
    }

    /// Context handed to layers of this composition.
    pub fn context(&self) -> LayerContext {
        LayerContext::new(
            Arc::clone(&self.projection),
            self.viewport.clone(),
            Arc::clone(&self.fetcher),
        )
    }

    /// Returns the layer `id`, creating it with `config` if the registry
    /// does not know it yet. An existing layer keeps its own config.
    pub fn get_or_create_layer(&self, id: &str, config: LayerConfig) -> Layer {
        let context = self.context();
        let layer = self
            .registry
            .get_or_create(id, || Layer::new(id, config, context));

        let mut order = self.order.write();
        if !order.iter().any(|known| known == id) {
            order.push(id.to_string());
        }
        layer
    }

    pub fn layer(&self, id: &str) -> Option<Layer> {
        self.registry.get(id)
    }

    /// Layers of this composition, in drawing order.
    pub fn layers(&self) -> Vec<Layer> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect()
    }

    /// Layers of this composition tagged with `class_name`.
    pub fn layers_of_class(&self, class_name: &str) -> Vec<Layer> {
        self.layers()
            .into_iter()
            .filter(|layer| layer.config().class_name.as_deref() == Some(class_name))
            .collect()
    }

    /// Zooms on feature `id` of `layer_id`, or on the whole layer.
    pub fn zoom_on(
        &self,
        layer_id: &str,
        id: Option<&str>,
    ) -> Result<OperationHandle<ViewportTransform, ZoomError>, CompositionError> {
        let layer = self
            .layer(layer_id)
            .ok_or_else(|| CompositionError::UnknownLayer(layer_id.to_string()))?;
        debug!(map = %self.name, layer = %layer_id, feature = ?id, "Zooming on layer");
        Ok(self.zoom.zoom_to_features(
            &layer,
            id.map(|id| vec![id.to_string()]),
            self.options.zoom_margin,
        ))
    }

    pub fn zoom_out(&self) -> OperationHandle<ViewportTransform, ZoomError> {
        self.zoom.zoom_out()
    }

    /// Fades out every layer of `class_name` except `except`.
    ///
    /// Fades run on each layer's own queue over half the zoom duration.
    pub fn fade_out_layers(
        &self,
        class_name: &str,
        except: Option<&str>,
    ) -> Vec<OperationHandle<(), LayerError>> {
        let fade = FadeOptions::new(self.options.zoom.duration / 2);
        self.layers_of_class(class_name)
            .into_iter()
            .filter(|layer| Some(layer.id()) != except)
            .map(|layer| layer.fade_out(fade))
            .collect()
    }

    /// Fades in every layer of `class_name`.
    pub fn fade_in_layers(&self, class_name: &str) -> Vec<OperationHandle<(), LayerError>> {
        let fade = FadeOptions::new(self.options.zoom.duration / 2);
        self.layers_of_class(class_name)
            .into_iter()
            .map(|layer| layer.fade_in(fade))
            .collect()
    }

    /// Routes a click at screen position `input` to the topmost visible
    /// layer with a shape under it.
    pub fn click_at(&self, input: InputEvent) -> Option<ClickEvent> {
        let inner = InputEvent::new(
            input.x - self.size.margins.left,
            input.y - self.size.margins.top,
        );
        self.layers()
            .into_iter()
            .rev()
            .filter(|layer| layer.is_visible())
            .find_map(|layer| layer.click_at(inner))
    }

    pub fn subscribe_zoom(&self) -> broadcast::Receiver<ZoomEvent> {
        self.zoom.subscribe()
    }

    /// Keeps the opacity of `layer` on `ramp` as the zoom level changes.
    ///
    /// The task ends when the zoom controller is dropped.
    pub fn track_opacity(&self, layer: &Layer, ramp: OpacityRamp) -> JoinHandle<()> {
        let layer = layer.clone();
        let mut events = self.zoom.subscribe();
        layer.set_opacity(ramp.at(self.viewport.level()));

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => layer.set_opacity(ramp.at(event.level)),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(layer = %layer.id(), skipped, "Opacity tracking lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl std::fmt::Debug for MapComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapComposition")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("layers", &self.order.read().len())
            .finish()
    }
}
