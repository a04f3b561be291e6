//! Geometry layers.
//!
//! A [`Layer`] owns the features decoded from one geometry source and turns
//! them into colored, clickable shapes. Every pipeline step (load, render,
//! join, statistics, fill, labels, fades) is queued on the layer's own
//! [`OperationQueue`] and returns a handle immediately, so a whole pipeline
//! can be declared at once:
//!
//! ```ignore
//! layer.load("departements.topojson");
//! layer.render();
//! layer.join(&results, JoinOptions::default());
//! let report = layer.fill("voix", FillOptions::default()).await?;
//! ```
//!
//! Selection, clicks and snapshots are synchronous and act on whatever state
//! the queue has reached.

mod config;
mod shape;
mod traits;

pub use config::{
    FadeOptions, FillOptions, LabelOptions, LayerConfig, LayerContext, DEFAULT_BLANK,
    DEFAULT_COLORS, LABEL_FONT_SIZE, LABEL_MIN_LEVEL,
};
pub use shape::{
    ClickEvent, FeatureState, InputEvent, Label, LabelStyle, LayerEvent, Shape, ShapeFill,
};
pub use traits::{Clickable, Positionable, Queued, Renderable};

pub use crate::join::{JoinOptions, JoinReport};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::color::{ColorError, ColorScale, ScaleDomain, ScaleOptions};
use crate::dataset::{DataError, Dataset, DatasetHandle};
use crate::geometry::{decode_topology, BoundingBox, Feature, GeometryError, Position};
use crate::join::{first_rows, join_features};
use crate::projection::ProjectionError;
use crate::queue::{OperationHandle, OperationQueue, QueueError, Readiness};
use crate::source::FetchError;
use crate::stats::{self, StatisticKind, Statistics, StatisticsCache, StatisticsOptions};
use crate::value::{Properties, Value};
use crate::viewport::animation::{animate, Timing};

const EVENT_CAPACITY: usize = 64;

/// Errors raised by layer operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayerError {
    /// The geometry source could not be fetched or decoded.
    #[error("layer '{layer}' failed to load: {reason}")]
    LoadFailure { layer: String, reason: String },

    /// The operation needs loaded geometry.
    #[error("layer '{0}' has no geometry loaded")]
    NotLoaded(String),

    /// The operation needs rendered shapes.
    #[error("layer '{0}' is not rendered")]
    NotRendered(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Color(#[from] ColorError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Outcome of a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillReport {
    pub key: String,
    /// Features colored from the scale.
    pub filled: usize,
    /// Features without a value, painted blank.
    pub blank: usize,
    pub scale: ColorScale,
}

#[derive(Debug)]
struct LayerState {
    loaded: bool,
    rendered: bool,
    features: Vec<Feature>,
    /// One shape per feature, same order.
    shapes: Vec<Shape>,
    dataset: Option<Arc<Dataset>>,
    labels: Vec<Label>,
    opacity: f64,
    visible: bool,
}

impl Default for LayerState {
    fn default() -> Self {
        Self {
            loaded: false,
            rendered: false,
            features: Vec::new(),
            shapes: Vec::new(),
            dataset: None,
            labels: Vec::new(),
            opacity: 1.0,
            visible: true,
        }
    }
}

struct LayerInner {
    id: String,
    config: RwLock<LayerConfig>,
    context: LayerContext,
    queue: OperationQueue,
    load_started: AtomicBool,
    geometry: Readiness<Vec<Feature>>,
    state: RwLock<LayerState>,
    statistics: StatisticsCache,
    events: broadcast::Sender<LayerEvent>,
}

impl LayerInner {
    fn render(&self) -> Result<usize, LayerError> {
        let config = self.config.read().clone();
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.loaded {
            return Err(LayerError::NotLoaded(self.id.clone()));
        }

        if config.autofit {
            let size = self.context.viewport.size();
            self.context
                .projection
                .write()
                .fit_size(size.width, size.height, &state.features)?;
        }
        let projection = *self.context.projection.read();

        if state.rendered {
            for (shape, feature) in state.shapes.iter_mut().zip(&state.features) {
                let geometry = feature.geometry.map_positions(|p| projection.project(p));
                shape.bbox = geometry.bounding_box();
                shape.centroid = geometry.centroid();
                shape.geometry = geometry;
            }
        } else {
            state.shapes = state
                .features
                .iter()
                .map(|feature| {
                    let geometry = feature.geometry.map_positions(|p| projection.project(p));
                    Shape::new(feature.id.clone(), geometry, config.clickable)
                })
                .collect();
            state.rendered = true;
        }

        debug!(layer = %self.id, shapes = state.shapes.len(), autofit = config.autofit, "Rendered layer");
        Ok(state.shapes.len())
    }

    fn compute_statistics(
        &self,
        keys: &[String],
        kinds: &[StatisticKind],
        options: StatisticsOptions,
    ) -> Result<HashMap<String, Statistics>, LayerError> {
        let state = self.state.read();
        if !state.loaded {
            return Err(LayerError::NotLoaded(self.id.clone()));
        }

        let mut computed = HashMap::new();
        for key in keys {
            let values =
                stats::numeric_values(state.features.iter().filter_map(|f| f.properties.get(key)));
            let fresh = stats::compute(&values, kinds, options.trim);
            computed.insert(key.clone(), self.statistics.store(key, &fresh, kinds));
        }
        debug!(layer = %self.id, keys = ?keys, kinds = ?kinds, trim = options.trim, "Computed statistics");
        Ok(computed)
    }

    fn fill(&self, key: &str, options: &FillOptions) -> Result<FillReport, LayerError> {
        let config = self.config.read().clone();
        let stats = self.statistics.get(key).unwrap_or_default();

        // Without numeric data the scale degenerates to a flat color.
        let domain = match (stats.domain, options.domain) {
            (None, _) => None,
            (Some(_), Some((min, max))) => Some(ScaleDomain {
                min,
                max,
                mean: stats.mean,
            }),
            (Some(_), None) => ScaleDomain::from_statistics(&stats),
        };
        let scale = ColorScale::build(
            ScaleOptions::new(options.colors.clone(), domain).with_clamp(options.clamp),
        )?;

        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.rendered {
            return Err(LayerError::NotRendered(self.id.clone()));
        }

        let (mut filled, mut blank) = (0, 0);
        for (shape, feature) in state.shapes.iter_mut().zip(&state.features) {
            match feature.properties.get(key).and_then(Value::as_f64) {
                Some(value) => {
                    shape.fill = ShapeFill::Filled(scale.apply(value));
                    shape.interactive = config.clickable;
                    filled += 1;
                }
                None => {
                    shape.fill = ShapeFill::Blank(config.blank);
                    shape.interactive = false;
                    blank += 1;
                }
            }
        }

        debug!(layer = %self.id, key = %key, filled, blank, "Filled layer");
        Ok(FillReport {
            key: key.to_string(),
            filled,
            blank,
            scale,
        })
    }

    fn place_labels(
        &self,
        reference: &Dataset,
        data_key: &str,
        label_key: &str,
    ) -> Result<usize, LayerError> {
        let index = first_rows(reference, data_key);

        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.rendered {
            return Err(LayerError::NotRendered(self.id.clone()));
        }

        state.labels = state
            .shapes
            .iter()
            .filter_map(|shape| {
                let row = index.get(shape.id.as_str())?;
                let text = row.get(label_key).map(Value::to_string)?;
                Some(Label {
                    feature_id: shape.id.clone(),
                    text,
                    position: shape.centroid?,
                    size: 0.0,
                })
            })
            .collect();
        Ok(state.labels.len())
    }

    fn emit(&self, event: LayerEvent) {
        // No subscriber is not an error.
        let _ = self.events.send(event);
    }
}

/// Handle on a geometry layer.
///
/// Cloning is cheap: clones share the same features, shapes and queue.
#[derive(Clone)]
pub struct Layer {
    inner: Arc<LayerInner>,
}

impl Layer {
    /// Creates an empty layer. Must run inside a Tokio runtime.
    pub fn new(id: impl Into<String>, config: LayerConfig, context: LayerContext) -> Self {
        let id = id.into();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(LayerInner {
                queue: OperationQueue::new(id.clone()),
                id,
                config: RwLock::new(config),
                context,
                load_started: AtomicBool::new(false),
                geometry: Readiness::new(),
                state: RwLock::new(LayerState::default()),
                statistics: StatisticsCache::new(),
                events,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> LayerConfig {
        self.inner.config.read().clone()
    }

    pub fn context(&self) -> &LayerContext {
        &self.inner.context
    }

    /// Returns true if both handles point to the same layer.
    pub fn ptr_eq(&self, other: &Layer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Queued operations
    // -------------------------------------------------------------------------

    /// Loads geometry from `source`; resolves to the number of features.
    ///
    /// The fetch starts right away, not when the operation reaches the head
    /// of the queue. Only the first call fetches; later calls wait for that
    /// same load whatever source they name.
    pub fn load(&self, source: impl Into<String>) -> OperationHandle<usize, LayerError> {
        let source = source.into();

        if !self.inner.load_started.swap(true, Ordering::SeqCst) {
            let inner = Arc::clone(&self.inner);
            let primary = self.inner.config.read().primary.clone();
            tokio::spawn(async move {
                let decoded = match inner.context.fetcher.fetch(&source).await {
                    Ok(bytes) => decode_topology(&bytes, &primary).map_err(LayerError::from),
                    Err(e) => Err(LayerError::from(e)),
                };
                match decoded {
                    Ok(features) => {
                        info!(layer = %inner.id, source = %source, features = features.len(), "Geometry loaded");
                        inner.geometry.resolve(features);
                    }
                    Err(e) => {
                        warn!(layer = %inner.id, source = %source, error = %e, "Geometry failed to load");
                        inner.geometry.fail(e.to_string());
                    }
                }
            });
        } else {
            debug!(layer = %self.inner.id, source = %source, "Layer already loading, waiting for it");
        }

        let inner = Arc::clone(&self.inner);
        self.inner.queue.enqueue("load", move || async move {
            let features = inner
                .geometry
                .wait()
                .await
                .map_err(|e| LayerError::LoadFailure {
                    layer: inner.id.clone(),
                    reason: e.to_string(),
                })?;

            let mut state = inner.state.write();
            if !state.loaded {
                state.features = (*features).clone();
                state.loaded = true;
            }
            Ok::<_, LayerError>(state.features.len())
        })
    }

    /// Projects features into shapes; resolves to the number of shapes.
    ///
    /// With `autofit`, the shared projection is first fitted to this layer
    /// within the viewport size.
    pub fn render(&self) -> OperationHandle<usize, LayerError> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .queue
            .enqueue("render", move || async move { inner.render() })
    }

    /// Keeps a reference to `dataset` once it has loaded.
    pub fn attach(&self, dataset: &DatasetHandle) -> OperationHandle<usize, LayerError> {
        let inner = Arc::clone(&self.inner);
        let dataset = dataset.clone();
        self.inner.queue.enqueue("attach", move || async move {
            let data = dataset.ready().await?;
            let rows = data.len();
            inner.state.write().dataset = Some(data);
            Ok::<_, LayerError>(rows)
        })
    }

    /// Merges rows of `dataset` into feature properties.
    pub fn join(
        &self,
        dataset: &DatasetHandle,
        options: JoinOptions,
    ) -> OperationHandle<JoinReport, LayerError> {
        let inner = Arc::clone(&self.inner);
        let dataset = dataset.clone();
        self.inner.queue.enqueue("join", move || async move {
            let data = dataset.ready().await?;
            let primary = inner.config.read().primary.clone();
            let mut state = inner.state.write();
            if !state.loaded {
                return Err(LayerError::NotLoaded(inner.id.clone()));
            }
            Ok(join_features(&mut state.features, &data, &options, &primary))
        })
    }

    /// Computes and caches statistics of numeric properties.
    pub fn statistics<I, S>(
        &self,
        keys: I,
        kinds: &[StatisticKind],
    ) -> OperationHandle<HashMap<String, Statistics>, LayerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statistics_with(keys, kinds, StatisticsOptions::default())
    }

    /// Like [`statistics`](Self::statistics) with explicit options.
    ///
    /// Every requested kind replaces its cached value, even when no numeric
    /// value is left to compute it from.
    pub fn statistics_with<I, S>(
        &self,
        keys: I,
        kinds: &[StatisticKind],
        options: StatisticsOptions,
    ) -> OperationHandle<HashMap<String, Statistics>, LayerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let kinds = kinds.to_vec();
        let inner = Arc::clone(&self.inner);
        self.inner.queue.enqueue("statistics", move || async move {
            inner.compute_statistics(&keys, &kinds, options)
        })
    }

    /// Colors shapes from the values of `key`.
    ///
    /// Queues a fresh domain and mean computation first, then the coloring.
    pub fn fill(
        &self,
        key: impl Into<String>,
        options: FillOptions,
    ) -> OperationHandle<FillReport, LayerError> {
        let key = key.into();
        // Its failure is logged by the queue and repeated by the fill itself.
        let _ = self.statistics([key.clone()], &[StatisticKind::Domain, StatisticKind::Mean]);

        let inner = Arc::clone(&self.inner);
        self.inner
            .queue
            .enqueue("fill", move || async move { inner.fill(&key, &options) })
    }

    /// Places labels from `reference` at feature centroids.
    ///
    /// Rows are matched by `data_key` against feature ids; the text comes
    /// from `label_key`. Labels grow in after `options.delay`; resolves to
    /// the number of labels once their entrance has finished.
    pub fn labels(
        &self,
        reference: &DatasetHandle,
        data_key: impl Into<String>,
        label_key: impl Into<String>,
        options: LabelOptions,
    ) -> OperationHandle<usize, LayerError> {
        let inner = Arc::clone(&self.inner);
        let reference = reference.clone();
        let data_key = data_key.into();
        let label_key = label_key.into();
        self.inner.queue.enqueue("labels", move || async move {
            let data = reference.ready().await?;
            let count = inner.place_labels(&data, &data_key, &label_key)?;
            if count > 0 {
                animate(Timing::new(options.delay, options.duration), |t| {
                    for label in inner.state.write().labels.iter_mut() {
                        label.size = LABEL_FONT_SIZE * t;
                    }
                })
                .await;
            }
            debug!(layer = %inner.id, labels = count, "Placed labels");
            Ok::<_, LayerError>(count)
        })
    }

    /// Fades the layer in, showing it first.
    pub fn fade_in(&self, options: FadeOptions) -> OperationHandle<(), LayerError> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.enqueue("fade_in", move || async move {
            let from = {
                let mut state = inner.state.write();
                state.visible = true;
                state.opacity
            };
            animate(Timing::new(options.delay, options.duration), |t| {
                inner.state.write().opacity = from + (1.0 - from) * t;
            })
            .await;
            Ok::<_, LayerError>(())
        })
    }

    /// Fades the layer out, hiding it at the end.
    pub fn fade_out(&self, options: FadeOptions) -> OperationHandle<(), LayerError> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.enqueue("fade_out", move || async move {
            let from = inner.state.read().opacity;
            animate(Timing::new(options.delay, options.duration), |t| {
                inner.state.write().opacity = from * (1.0 - t);
            })
            .await;
            inner.state.write().visible = false;
            Ok::<_, LayerError>(())
        })
    }

    /// Waits until every operation queued so far has settled.
    pub async fn idle(&self) {
        self.inner.queue.idle().await
    }

    // -------------------------------------------------------------------------
    // Selection and interaction
    // -------------------------------------------------------------------------

    /// Marks `id` as selected; with `exclusive`, clears every other mark.
    ///
    /// Returns false if no shape has that id.
    pub fn select(&self, id: &str, exclusive: bool) -> bool {
        let mut state = self.inner.state.write();
        let mut found = false;
        for shape in state.shapes.iter_mut() {
            if shape.id == id {
                shape.selected = true;
                found = true;
            } else if exclusive {
                shape.selected = false;
            }
        }
        found
    }

    /// Clears the selection mark of `id` only.
    pub fn deselect(&self, id: &str) -> bool {
        let mut state = self.inner.state.write();
        match state.shapes.iter_mut().find(|s| s.id == id) {
            Some(shape) => {
                shape.selected = false;
                true
            }
            None => false,
        }
    }

    pub fn deselect_all(&self) {
        for shape in self.inner.state.write().shapes.iter_mut() {
            shape.selected = false;
        }
    }

    /// Ids of selected shapes.
    pub fn selected(&self) -> Vec<String> {
        self.inner
            .state
            .read()
            .shapes
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn is_clickable(&self) -> bool {
        self.inner.config.read().clickable
    }

    /// Enables or disables clicks. Blank shapes stay inert either way.
    pub fn set_clickable(&self, clickable: bool) {
        self.inner.config.write().clickable = clickable;
        for shape in self.inner.state.write().shapes.iter_mut() {
            shape.interactive = clickable && !matches!(shape.fill, ShapeFill::Blank(_));
        }
    }

    /// Dispatches a click on the shape `id`.
    ///
    /// Inert shapes and hidden layers ignore clicks. A filled shape is
    /// selected exclusively before the event is emitted.
    pub fn click(&self, id: &str, input: InputEvent) -> Option<ClickEvent> {
        let (event, selects) = {
            let state = self.inner.state.read();
            if !state.visible {
                return None;
            }
            let index = state.shapes.iter().position(|s| s.id == id)?;
            let shape = &state.shapes[index];
            if !shape.interactive {
                debug!(layer = %self.inner.id, feature = %id, "Ignoring click on inert shape");
                return None;
            }
            (
                ClickEvent {
                    event: input,
                    properties: state.features[index].properties.clone(),
                    id: shape.id.clone(),
                },
                matches!(shape.fill, ShapeFill::Filled(_)),
            )
        };

        if selects {
            self.select(id, true);
        }
        self.inner.emit(LayerEvent::Click(event.clone()));
        Some(event)
    }

    /// Dispatches a click at a screen position, through the viewport.
    pub fn click_at(&self, input: InputEvent) -> Option<ClickEvent> {
        let p = self.inner.context.viewport.transform().invert([input.x, input.y]);
        let id = {
            let state = self.inner.state.read();
            state
                .shapes
                .iter()
                .rev()
                .find(|s| s.contains(p))
                .map(|s| s.id.clone())?
        };
        self.click(&id, input)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LayerEvent> {
        self.inner.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    pub fn is_loaded(&self) -> bool {
        self.inner.state.read().loaded
    }

    pub fn is_rendered(&self) -> bool {
        self.inner.state.read().rendered
    }

    /// State of feature `id`; `None` for an unknown id once loaded.
    pub fn feature_state(&self, id: &str) -> Option<FeatureState> {
        let state = self.inner.state.read();
        if !state.loaded {
            return Some(FeatureState::Unloaded);
        }
        let index = state.features.iter().position(|f| f.id == id)?;
        if !state.rendered {
            return Some(FeatureState::Loaded);
        }
        state.shapes.get(index).map(Shape::state)
    }

    pub fn features(&self) -> Vec<Feature> {
        self.inner.state.read().features.clone()
    }

    pub fn feature(&self, id: &str) -> Option<Feature> {
        self.inner
            .state
            .read()
            .features
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    pub fn properties(&self, id: &str) -> Option<Properties> {
        self.feature(id).map(|f| f.properties)
    }

    /// Display name of `id`, from the secondary property.
    pub fn feature_name(&self, id: &str) -> Option<String> {
        let secondary = self.inner.config.read().secondary.clone()?;
        self.feature(id)?
            .properties
            .get(&secondary)
            .map(Value::to_string)
    }

    pub fn shapes(&self) -> Vec<Shape> {
        self.inner.state.read().shapes.clone()
    }

    pub fn shape(&self, id: &str) -> Option<Shape> {
        self.inner
            .state
            .read()
            .shapes
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn labels_snapshot(&self) -> Vec<Label> {
        self.inner.state.read().labels.clone()
    }

    /// Label visibility and size at the current zoom level.
    pub fn label_style(&self) -> LabelStyle {
        let k = self.inner.context.viewport.level();
        LabelStyle {
            visible: k >= LABEL_MIN_LEVEL,
            font_size: LABEL_FONT_SIZE / k,
        }
    }

    /// Last statistics computed for `key`.
    pub fn cached_statistics(&self, key: &str) -> Option<Statistics> {
        self.inner.statistics.get(key)
    }

    pub fn attached_dataset(&self) -> Option<Arc<Dataset>> {
        self.inner.state.read().dataset.clone()
    }

    pub fn opacity(&self) -> f64 {
        self.inner.state.read().opacity
    }

    pub fn set_opacity(&self, opacity: f64) {
        self.inner.state.write().opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.read().visible
    }

    pub fn projected_bounds(&self, ids: Option<&[String]>) -> BoundingBox {
        let state = self.inner.state.read();
        state
            .shapes
            .iter()
            .filter(|s| ids.map_or(true, |ids| ids.iter().any(|id| *id == s.id)))
            .fold(BoundingBox::empty(), |acc, s| acc.union(&s.bbox))
    }

    pub fn centroid(&self, id: &str) -> Option<Position> {
        self.inner
            .state
            .read()
            .shapes
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| s.centroid)
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Layer")
            .field("id", &self.inner.id)
            .field("loaded", &state.loaded)
            .field("rendered", &state.rendered)
            .field("features", &state.features.len())
            .finish()
    }
}

impl Queued for Layer {
    fn queue(&self) -> &OperationQueue {
        &self.inner.queue
    }
}

impl Renderable for Layer {
    fn is_rendered(&self) -> bool {
        Layer::is_rendered(self)
    }

    fn shapes(&self) -> Vec<Shape> {
        Layer::shapes(self)
    }

    fn opacity(&self) -> f64 {
        Layer::opacity(self)
    }

    fn set_opacity(&self, opacity: f64) {
        Layer::set_opacity(self, opacity)
    }

    fn is_visible(&self) -> bool {
        Layer::is_visible(self)
    }
}

impl Clickable for Layer {
    fn is_clickable(&self) -> bool {
        Layer::is_clickable(self)
    }

    fn set_clickable(&self, clickable: bool) {
        Layer::set_clickable(self, clickable)
    }

    fn click(&self, id: &str, input: InputEvent) -> Option<ClickEvent> {
        Layer::click(self, id, input)
    }

    fn subscribe(&self) -> broadcast::Receiver<LayerEvent> {
        Layer::subscribe(self)
    }
}

impl Positionable for Layer {
    fn projected_bounds(&self, ids: Option<&[String]>) -> BoundingBox {
        Layer::projected_bounds(self, ids)
    }

    fn centroid(&self, id: &str) -> Option<Position> {
        Layer::centroid(self, id)
    }
}
