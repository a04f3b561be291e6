//! Animated, queued control of the shared viewport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::animation::{animate, Timing, ZoomPath, DEFAULT_FRAME};
use super::{Viewport, ViewportSize, ViewportTransform, ZoomError};
use crate::geometry::BoundingBox;
use crate::layer::{Positionable, Queued};
use crate::queue::{OperationHandle, OperationQueue};

/// Default transition duration.
pub const DEFAULT_DURATION: Duration = Duration::from_millis(2000);

/// Scale extent before any programmatic zoom.
pub const DEFAULT_SCALE_EXTENT: (f64, f64) = (1.0, 15.0);

/// Scale extent restored by [`ZoomController::zoom_out`].
pub const RESET_SCALE_EXTENT: (f64, f64) = (1.0, 4.0);

/// Factor applied to the reached scale to get the new upper bound.
const EXTENT_HEADROOM: f64 = 4.0;

const EVENT_CAPACITY: usize = 256;

/// Zoom controller settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomConfig {
    pub duration: Duration,
    pub delay: Duration,
    /// Whether interactive transforms are accepted at all.
    pub zoomable: bool,
    /// Initial `(min, max)` scale accepted from interactive input.
    pub scale_extent: (f64, f64),
    /// Animation frame interval.
    pub frame: Duration,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            delay: Duration::ZERO,
            zoomable: true,
            scale_extent: DEFAULT_SCALE_EXTENT,
            frame: DEFAULT_FRAME,
        }
    }
}

impl ZoomConfig {
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_zoomable(mut self, zoomable: bool) -> Self {
        self.zoomable = zoomable;
        self
    }

    fn timing(&self) -> Timing {
        Timing::new(self.delay, self.duration).with_frame(self.frame)
    }
}

/// Emitted for every transform applied to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomEvent {
    /// Scale of the applied transform.
    pub level: f64,
    pub transform: ViewportTransform,
}

struct ZoomInner {
    viewport: Viewport,
    config: ZoomConfig,
    queue: OperationQueue,
    program_driven: AtomicBool,
    scale_extent: RwLock<(f64, f64)>,
    events: broadcast::Sender<ZoomEvent>,
}

impl ZoomInner {
    fn apply(&self, transform: ViewportTransform) {
        self.viewport.set_transform(transform);
        // No subscriber is not an error.
        let _ = self.events.send(ZoomEvent {
            level: transform.k,
            transform,
        });
    }

    /// Animates to `target`, then widens or resets the scale extent.
    async fn transition(&self, target: ViewportTransform, extent: (f64, f64)) -> ViewportTransform {
        self.program_driven.store(true, Ordering::SeqCst);

        let path = ZoomPath::new(self.viewport.transform(), target, self.viewport.size());
        let frames = animate(self.config.timing(), |t| self.apply(path.at(t))).await;

        *self.scale_extent.write() = extent;
        self.program_driven.store(false, Ordering::SeqCst);
        debug!(k = target.k, x = target.x, y = target.y, frames, "Zoom transition complete");
        target
    }
}

/// Owner of the viewport transform.
///
/// Programmatic zooms are queued and animated; while one runs, interactive
/// transforms are ignored.
#[derive(Clone)]
pub struct ZoomController {
    inner: Arc<ZoomInner>,
}

impl ZoomController {
    /// Creates a controller for `viewport`. Must run inside a Tokio runtime.
    pub fn new(name: impl Into<String>, viewport: Viewport, config: ZoomConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ZoomInner {
                viewport,
                scale_extent: RwLock::new(config.scale_extent),
                config,
                queue: OperationQueue::new(name),
                program_driven: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Transform that centers `bbox` in a viewport of `size`.
    ///
    /// The scale fits the box along its tighter dimension, times `margin`
    /// (1 frames tightly, 0.5 leaves the box covering half the viewport).
    pub fn target_transform(
        bbox: &BoundingBox,
        size: ViewportSize,
        margin: f64,
    ) -> Result<ViewportTransform, ZoomError> {
        if bbox.is_empty() {
            return Err(ZoomError::EmptySelection);
        }
        let (bw, bh) = (bbox.width(), bbox.height());
        if bw <= 0.0 && bh <= 0.0 {
            return Err(ZoomError::DegenerateBounds);
        }

        let k = (size.width / bw).min(size.height / bh) * margin;
        Ok(ViewportTransform::new(
            -bbox.x1 * k + (size.width - bw * k) / 2.0,
            -bbox.y1 * k + (size.height - bh * k) / 2.0,
            k,
        ))
    }

    /// Zooms on a box in projected coordinates.
    pub fn zoom_to(
        &self,
        bbox: BoundingBox,
        margin: f64,
    ) -> OperationHandle<ViewportTransform, ZoomError> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.enqueue("zoom_to", move || async move {
            let target = Self::target_transform(&bbox, inner.viewport.size(), margin)?;
            info!(k = target.k, "Zooming to box");
            Ok::<_, ZoomError>(inner.transition(target, upper_extent(target.k)).await)
        })
    }

    /// Zooms on features of `layer`; `None` selects all of them.
    ///
    /// Waits for the operations already queued on the layer so that the
    /// shapes exist when the box is measured.
    pub fn zoom_to_features<L>(
        &self,
        layer: &L,
        ids: Option<Vec<String>>,
        margin: f64,
    ) -> OperationHandle<ViewportTransform, ZoomError>
    where
        L: Positionable + Queued + Clone + Send + Sync + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let layer = layer.clone();
        self.inner.queue.enqueue("zoom_to_features", move || async move {
            layer.queue().idle().await;
            let bbox = layer.projected_bounds(ids.as_deref());
            let target = Self::target_transform(&bbox, inner.viewport.size(), margin)?;
            info!(layer = %layer.name(), k = target.k, "Zooming to features");
            Ok::<_, ZoomError>(inner.transition(target, upper_extent(target.k)).await)
        })
    }

    /// Animates back to the identity transform.
    pub fn zoom_out(&self) -> OperationHandle<ViewportTransform, ZoomError> {
        let inner = Arc::clone(&self.inner);
        self.inner.queue.enqueue("zoom_out", move || async move {
            info!("Zooming out");
            Ok(inner
                .transition(ViewportTransform::IDENTITY, RESET_SCALE_EXTENT)
                .await)
        })
    }

    /// Applies an interactive transform (drag, wheel).
    ///
    /// The scale is clamped to the current extent and the translate keeps
    /// the visible window inside the map area. Ignored while an animation
    /// drives the viewport, and rejected if zoom is disabled.
    pub fn user_transform(
        &self,
        transform: ViewportTransform,
    ) -> Result<ViewportTransform, ZoomError> {
        if !self.inner.config.zoomable {
            return Err(ZoomError::Disabled);
        }
        if self.is_program_driven() {
            debug!("Ignoring interactive transform during animation");
            return Err(ZoomError::ProgramDriven);
        }

        let (min, max) = *self.inner.scale_extent.read();
        let scaled = ViewportTransform {
            k: transform.k.clamp(min, max),
            ..transform
        };
        let applied = constrain_translate(scaled, self.inner.viewport.size());
        self.inner.apply(applied);
        Ok(applied)
    }

    /// Returns true while a programmatic transition runs.
    pub fn is_program_driven(&self) -> bool {
        self.inner.program_driven.load(Ordering::SeqCst)
    }

    /// Current `(min, max)` interactive scale bounds.
    pub fn scale_extent(&self) -> (f64, f64) {
        *self.inner.scale_extent.read()
    }

    pub fn transform(&self) -> ViewportTransform {
        self.inner.viewport.transform()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.inner.viewport
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.inner.config
    }

    /// Subscribes to applied transforms.
    pub fn subscribe(&self) -> broadcast::Receiver<ZoomEvent> {
        self.inner.events.subscribe()
    }

    /// Waits until every queued zoom has settled.
    pub async fn idle(&self) {
        self.inner.queue.idle().await
    }
}

/// Extent after reaching scale `k`: up to four times `k`.
fn upper_extent(k: f64) -> (f64, f64) {
    let min = DEFAULT_SCALE_EXTENT.0.min(k);
    (min, (k * EXTENT_HEADROOM).max(min))
}

/// Shifts `transform` so the area it shows stays within `[0, 0]-[width, height]`.
///
/// When the map is smaller than the viewport along an axis it is centered
/// on that axis instead.
fn constrain_translate(transform: ViewportTransform, size: ViewportSize) -> ViewportTransform {
    let axis = |offset: f64, length: f64| {
        let k = transform.k;
        // Overshoot of the visible window past each map edge, in map units.
        let before = -offset / k;
        let after = (length - offset) / k - length;
        let shift = if after > before {
            (before + after) / 2.0
        } else if before < 0.0 {
            before
        } else {
            after.max(0.0)
        };
        offset + shift * k
    };
    ViewportTransform::new(
        axis(transform.x, size.width),
        axis(transform.y, size.height),
        transform.k,
    )
}

impl std::fmt::Debug for ZoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoomController")
            .field("transform", &self.transform())
            .field("program_driven", &self.is_program_driven())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(config: ZoomConfig) -> ZoomController {
        let viewport = Viewport::new(ViewportSize::new(100.0, 100.0));
        ZoomController::new("zoom", viewport, config)
    }

    #[test]
    fn test_target_transform_centers_box() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 20.0);
        let t = ZoomController::target_transform(&bbox, ViewportSize::new(100.0, 100.0), 1.0)
            .unwrap();

        assert_eq!(t.k, 5.0);
        let top_left = t.apply([0.0, 0.0]);
        let bottom_right = t.apply([10.0, 20.0]);
        assert_eq!(top_left, [25.0, 0.0]);
        assert_eq!(bottom_right, [75.0, 100.0]);
    }

    #[test]
    fn test_target_transform_margin_and_errors() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let size = ViewportSize::new(100.0, 100.0);
        let t = ZoomController::target_transform(&bbox, size, 0.5).unwrap();
        assert_eq!(t.k, 5.0);
        assert_eq!(t.apply([5.0, 5.0]), [50.0, 50.0]);

        assert_eq!(
            ZoomController::target_transform(&BoundingBox::empty(), size, 1.0),
            Err(ZoomError::EmptySelection)
        );
        assert_eq!(
            ZoomController::target_transform(&BoundingBox::new(3.0, 3.0, 3.0, 3.0), size, 1.0),
            Err(ZoomError::DegenerateBounds)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_to_animates_and_widens_extent() {
        let zoom = controller(ZoomConfig::default());
        let mut events = zoom.subscribe();

        let handle = zoom.zoom_to(BoundingBox::new(0.0, 0.0, 10.0, 20.0), 1.0);
        let target = handle.await.unwrap();

        assert_eq!(target, ViewportTransform::new(25.0, 0.0, 5.0));
        assert_eq!(zoom.transform(), target);
        assert_eq!(zoom.scale_extent(), (1.0, 20.0));
        assert!(!zoom.is_program_driven());

        let mut last = None;
        let mut count = 0;
        while let Ok(event) = events.try_recv() {
            count += 1;
            last = Some(event.level);
        }
        assert!(count > 1);
        assert_eq!(last, Some(5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_transform_ignored_while_animating() {
        let zoom = controller(ZoomConfig::default());
        let handle = zoom.zoom_to(BoundingBox::new(0.0, 0.0, 10.0, 20.0), 1.0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(zoom.is_program_driven());
        assert_eq!(
            zoom.user_transform(ViewportTransform::new(0.0, 0.0, 2.0)),
            Err(ZoomError::ProgramDriven)
        );

        let target = handle.await.unwrap();
        assert_eq!(zoom.transform(), target);

        let applied = zoom
            .user_transform(ViewportTransform::new(1.0, 1.0, 50.0))
            .unwrap();
        assert_eq!(applied.k, 20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_out_resets_extent() {
        let zoom = controller(ZoomConfig::default().with_duration(Duration::from_millis(200)));
        zoom.zoom_to(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1.0);
        let reset = zoom.zoom_out().await.unwrap();

        assert_eq!(reset, ViewportTransform::IDENTITY);
        assert_eq!(zoom.transform(), ViewportTransform::IDENTITY);
        assert_eq!(zoom.scale_extent(), RESET_SCALE_EXTENT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zooms_run_in_issue_order() {
        let zoom = controller(ZoomConfig::default().with_duration(Duration::from_millis(300)));
        let first = zoom.zoom_to(BoundingBox::new(0.0, 0.0, 50.0, 50.0), 1.0);
        let second = zoom.zoom_to(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1.0);

        let second = second.await.unwrap();
        let first = first.await.unwrap();
        assert_eq!(first.k, 2.0);
        assert_eq!(second.k, 10.0);
        assert_eq!(zoom.transform().k, 10.0);
    }

    #[tokio::test]
    async fn test_user_pan_stays_inside_map() {
        let zoom = controller(ZoomConfig::default());

        // Dragged right past the left edge.
        let applied = zoom
            .user_transform(ViewportTransform::new(50.0, 0.0, 2.0))
            .unwrap();
        assert_eq!(applied, ViewportTransform::new(0.0, 0.0, 2.0));

        // Dragged far left and up: the window stops at the bottom right corner.
        let applied = zoom
            .user_transform(ViewportTransform::new(-300.0, -1000.0, 2.0))
            .unwrap();
        assert_eq!(applied, ViewportTransform::new(-100.0, -100.0, 2.0));
        assert_eq!(applied.invert([100.0, 100.0]), [100.0, 100.0]);
        assert_eq!(zoom.transform(), applied);

        // Inside the map nothing moves.
        let inside = ViewportTransform::new(-40.0, -60.0, 2.0);
        assert_eq!(zoom.user_transform(inside).unwrap(), inside);
    }

    #[test]
    fn test_constrain_centers_smaller_map() {
        let size = ViewportSize::new(100.0, 100.0);
        let t = constrain_translate(ViewportTransform::new(-80.0, 70.0, 0.5), size);
        assert_eq!(t, ViewportTransform::new(25.0, 25.0, 0.5));
    }

    #[tokio::test]
    async fn test_disabled_zoom_rejects_user_transform() {
        let zoom = controller(ZoomConfig::default().with_zoomable(false));
        assert_eq!(
            zoom.user_transform(ViewportTransform::new(0.0, 0.0, 2.0)),
            Err(ZoomError::Disabled)
        );
    }

    #[tokio::test]
    async fn test_empty_selection_fails_without_blocking_queue() {
        let zoom = controller(ZoomConfig::default().with_duration(Duration::ZERO));
        let failed = zoom.zoom_to(BoundingBox::empty(), 1.0);
        let next = zoom.zoom_out();

        assert_eq!(failed.await, Err(ZoomError::EmptySelection));
        assert_eq!(next.await, Ok(ViewportTransform::IDENTITY));
        assert!(!zoom.is_program_driven());
    }
}
