//! Shared viewport transform and the zoom controller driving it.
//!
//! A composition and all of its layers share one [`Viewport`]. Only the
//! [`ZoomController`] mutates it; layers read it to place and size labels
//! and to map pointer positions back to features.

pub mod animation;
mod controller;

pub use controller::{ZoomConfig, ZoomController, ZoomEvent};

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::geometry::Position;
use crate::queue::QueueError;

/// Pan and uniform zoom applied on top of projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl ViewportTransform {
    pub const IDENTITY: ViewportTransform = ViewportTransform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    /// Maps a projected position to the screen.
    pub fn apply(&self, p: Position) -> Position {
        [p[0] * self.k + self.x, p[1] * self.k + self.y]
    }

    /// Maps a screen position back to projected coordinates.
    pub fn invert(&self, p: Position) -> Position {
        [(p[0] - self.x) / self.k, (p[1] - self.y) / self.k]
    }

    /// Straight interpolation of every component.
    pub fn interpolate(&self, other: &ViewportTransform, t: f64) -> ViewportTransform {
        ViewportTransform {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            k: self.k + (other.k - self.k) * t,
        }
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Drawable size of a viewport, margins excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug)]
struct ViewportState {
    size: ViewportSize,
    transform: ViewportTransform,
}

/// Handle on a shared viewport.
#[derive(Debug, Clone)]
pub struct Viewport {
    state: Arc<RwLock<ViewportState>>,
}

impl Viewport {
    pub fn new(size: ViewportSize) -> Self {
        Self {
            state: Arc::new(RwLock::new(ViewportState {
                size,
                transform: ViewportTransform::IDENTITY,
            })),
        }
    }

    pub fn size(&self) -> ViewportSize {
        self.state.read().size
    }

    pub fn transform(&self) -> ViewportTransform {
        self.state.read().transform
    }

    /// Current zoom level.
    pub fn level(&self) -> f64 {
        self.state.read().transform.k
    }

    pub(crate) fn set_transform(&self, transform: ViewportTransform) {
        self.state.write().transform = transform;
    }

    /// Returns true if both handles share the same state.
    pub fn ptr_eq(&self, other: &Viewport) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Zoom errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ZoomError {
    /// None of the requested features has a shape.
    #[error("nothing to zoom on")]
    EmptySelection,

    /// The target box collapses to a point.
    #[error("cannot zoom on a zero-sized box")]
    DegenerateBounds,

    /// An animation is running; the interactive change was ignored.
    #[error("viewport is driven by an animation")]
    ProgramDriven,

    /// Interactive zoom is disabled.
    #[error("interactive zoom is disabled")]
    Disabled,

    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_invert() {
        let t = ViewportTransform::new(25.0, -10.0, 5.0);
        assert_eq!(t.apply([1.0, 2.0]), [30.0, 0.0]);
        assert_eq!(t.invert([30.0, 0.0]), [1.0, 2.0]);
        assert_eq!(ViewportTransform::IDENTITY.apply([3.0, 4.0]), [3.0, 4.0]);
    }

    #[test]
    fn test_interpolate() {
        let a = ViewportTransform::IDENTITY;
        let b = ViewportTransform::new(10.0, 20.0, 3.0);
        assert_eq!(a.interpolate(&b, 0.5), ViewportTransform::new(5.0, 10.0, 2.0));
    }

    #[test]
    fn test_viewport_is_shared() {
        let viewport = Viewport::new(ViewportSize::new(800.0, 600.0));
        let other = viewport.clone();
        viewport.set_transform(ViewportTransform::new(1.0, 2.0, 4.0));
        assert_eq!(other.level(), 4.0);
        assert!(other.ptr_eq(&viewport));
    }
}
