//! Capabilities shared by map entities.
//!
//! Components compose these instead of inheriting from a common base: a
//! zoom controller only needs something [`Positionable`] and [`Queued`],
//! a composition fades anything [`Renderable`].

use tokio::sync::broadcast;

use super::shape::{ClickEvent, InputEvent, LayerEvent, Shape};
use crate::geometry::{BoundingBox, Position};
use crate::queue::OperationQueue;

/// Entity owning an ordered operation queue.
pub trait Queued {
    fn queue(&self) -> &OperationQueue;

    /// Name of the owning entity.
    fn name(&self) -> &str {
        self.queue().owner()
    }

    /// Operations queued or running.
    fn pending(&self) -> u64 {
        self.queue().pending()
    }
}

/// Entity producing drawable shapes.
pub trait Renderable {
    fn is_rendered(&self) -> bool;
    fn shapes(&self) -> Vec<Shape>;
    fn opacity(&self) -> f64;
    fn set_opacity(&self, opacity: f64);
    fn is_visible(&self) -> bool;
}

/// Entity reacting to clicks.
pub trait Clickable {
    fn is_clickable(&self) -> bool;
    fn set_clickable(&self, clickable: bool);
    fn click(&self, id: &str, input: InputEvent) -> Option<ClickEvent>;
    fn subscribe(&self) -> broadcast::Receiver<LayerEvent>;
}

/// Entity occupying space in projected coordinates.
pub trait Positionable {
    /// Union of the boxes of `ids`, or of everything with `None`.
    fn projected_bounds(&self, ids: Option<&[String]>) -> BoundingBox;
    fn centroid(&self, id: &str) -> Option<Position>;
}
