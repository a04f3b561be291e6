//! Rendered state of features.

use crate::color::Color;
use crate::geometry::{BoundingBox, Geometry, Position};
use crate::value::Properties;

/// Lifecycle of a feature inside its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    /// Geometry not loaded yet.
    Unloaded,
    /// Geometry decoded, no shape yet.
    Loaded,
    /// Shape drawn, not filled.
    Rendered,
    /// Filled from the color scale.
    Filled(Color),
    /// Filled with the blank color: no value for the filled key.
    Blank(Color),
}

/// Fill applied to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFill {
    Unfilled,
    Filled(Color),
    Blank(Color),
}

/// Drawable shape of one feature, in projected coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: String,
    pub geometry: Geometry,
    pub bbox: BoundingBox,
    pub centroid: Option<Position>,
    pub fill: ShapeFill,
    /// Whether the shape reacts to clicks.
    pub interactive: bool,
    pub selected: bool,
}

impl Shape {
    pub(crate) fn new(id: String, geometry: Geometry, interactive: bool) -> Self {
        Self {
            id,
            bbox: geometry.bounding_box(),
            centroid: geometry.centroid(),
            geometry,
            fill: ShapeFill::Unfilled,
            interactive,
            selected: false,
        }
    }

    /// Hit test in projected coordinates.
    pub fn contains(&self, p: Position) -> bool {
        self.bbox.contains(p) && self.geometry.contains(p)
    }

    pub fn state(&self) -> FeatureState {
        match self.fill {
            ShapeFill::Unfilled => FeatureState::Rendered,
            ShapeFill::Filled(color) => FeatureState::Filled(color),
            ShapeFill::Blank(color) => FeatureState::Blank(color),
        }
    }
}

/// Text annotation placed at a feature centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub feature_id: String,
    pub text: String,
    /// Projected position.
    pub position: Position,
    /// Current base font size; grows to its final size on entrance.
    pub size: f64,
}

/// How labels are drawn at the current zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub visible: bool,
    /// Font size compensating the zoom scale.
    pub font_size: f64,
}

/// Pointer position of the input that triggered a click, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputEvent {
    pub x: f64,
    pub y: f64,
}

impl InputEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Payload of a feature click.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub event: InputEvent,
    /// Full property set of the feature, joined data included.
    pub properties: Properties,
    pub id: String,
}

/// Events emitted by a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Click(ClickEvent),
}
