//! Map projections
//!
//! Converts source coordinates (longitude/latitude in degrees, or planar
//! units for pre-projected sources) to screen coordinates, and fits a
//! projection so that a set of features fills a given extent.

use std::f64::consts::PI;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::geometry::{BoundingBox, Feature, Position};

/// Maximum latitude representable in Mercator.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum latitude representable in Mercator.
pub const MIN_LAT: f64 = -85.05112878;

/// Default Mercator scale: the world spans 961 pixels.
pub const DEFAULT_MERCATOR_SCALE: f64 = 961.0 / (2.0 * PI);

/// Default translation, the center of a 960×500 canvas.
pub const DEFAULT_TRANSLATE: [f64; 2] = [480.0, 250.0];

/// Scale used while measuring bounds during a fit.
const FIT_REFERENCE_SCALE: f64 = 150.0;

/// Projection errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    /// Nothing to fit: no feature has a position.
    #[error("cannot fit a projection to empty geometry")]
    EmptyBounds,

    /// The features collapse to a single point.
    #[error("cannot fit a projection to a single point")]
    DegenerateBounds,

    /// The target extent has no area.
    #[error("invalid fit extent {width}x{height}")]
    InvalidExtent { width: f64, height: f64 },
}

/// Raw projection before scale and translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Source coordinates are already planar.
    Identity,
    /// Spherical Mercator over degrees; y grows southward.
    Mercator,
}

impl ProjectionKind {
    fn forward(self, p: Position) -> Position {
        match self {
            ProjectionKind::Identity => p,
            ProjectionKind::Mercator => {
                let lat = p[1].clamp(MIN_LAT, MAX_LAT);
                let lambda = p[0] * PI / 180.0;
                let phi = lat * PI / 180.0;
                [lambda, -(PI / 4.0 + phi / 2.0).tan().ln()]
            }
        }
    }

    fn inverse(self, p: Position) -> Position {
        match self {
            ProjectionKind::Identity => p,
            ProjectionKind::Mercator => {
                let lon = p[0] * 180.0 / PI;
                let lat = (2.0 * (-p[1]).exp().atan() - PI / 2.0) * 180.0 / PI;
                [lon, lat]
            }
        }
    }
}

/// A raw projection with uniform scale and translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    kind: ProjectionKind,
    scale: f64,
    translate: [f64; 2],
}

impl Projection {
    /// Mercator with the conventional defaults.
    pub fn mercator() -> Self {
        Self {
            kind: ProjectionKind::Mercator,
            scale: DEFAULT_MERCATOR_SCALE,
            translate: DEFAULT_TRANSLATE,
        }
    }

    /// Planar pass-through projection.
    pub fn identity() -> Self {
        Self {
            kind: ProjectionKind::Identity,
            scale: 1.0,
            translate: [0.0, 0.0],
        }
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> [f64; 2] {
        self.translate
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_translate(mut self, translate: [f64; 2]) -> Self {
        self.translate = translate;
        self
    }

    /// Projects a source position to screen coordinates.
    #[inline]
    pub fn project(&self, p: Position) -> Position {
        let [x, y] = self.kind.forward(p);
        [
            x * self.scale + self.translate[0],
            y * self.scale + self.translate[1],
        ]
    }

    /// Converts screen coordinates back to a source position.
    #[inline]
    pub fn invert(&self, p: Position) -> Position {
        self.kind.inverse([
            (p[0] - self.translate[0]) / self.scale,
            (p[1] - self.translate[1]) / self.scale,
        ])
    }

    /// Screen bounding box of the given features under this projection.
    pub fn bounds<'a>(&self, features: impl IntoIterator<Item = &'a Feature>) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for feature in features {
            for p in feature.geometry.positions() {
                bbox.extend(self.project(p));
            }
        }
        bbox
    }

    /// Adjusts scale and translation so `features` fill `extent`, centered.
    ///
    /// `extent` is `[[x0, y0], [x1, y1]]` in screen coordinates.
    pub fn fit_extent<'a>(
        &mut self,
        extent: [[f64; 2]; 2],
        features: impl IntoIterator<Item = &'a Feature>,
    ) -> Result<(), ProjectionError> {
        let width = extent[1][0] - extent[0][0];
        let height = extent[1][1] - extent[0][1];
        if !(width > 0.0 && height > 0.0) {
            return Err(ProjectionError::InvalidExtent { width, height });
        }

        let reference = Projection {
            kind: self.kind,
            scale: FIT_REFERENCE_SCALE,
            translate: [0.0, 0.0],
        };
        let b = reference.bounds(features);
        if b.is_empty() {
            return Err(ProjectionError::EmptyBounds);
        }
        if b.width() <= 0.0 && b.height() <= 0.0 {
            return Err(ProjectionError::DegenerateBounds);
        }

        let k = (width / b.width()).min(height / b.height());
        let x = extent[0][0] + (width - k * (b.x2 + b.x1)) / 2.0;
        let y = extent[0][1] + (height - k * (b.y2 + b.y1)) / 2.0;

        self.scale = FIT_REFERENCE_SCALE * k;
        self.translate = [x, y];
        Ok(())
    }

    /// Fits `features` into `[[0, 0], [width, height]]`.
    pub fn fit_size<'a>(
        &mut self,
        width: f64,
        height: f64,
        features: impl IntoIterator<Item = &'a Feature>,
    ) -> Result<(), ProjectionError> {
        self.fit_extent([[0.0, 0.0], [width, height]], features)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::mercator()
    }
}

/// Projection shared by a composition and its layers.
pub type SharedProjection = Arc<RwLock<Projection>>;

/// Wraps a projection for sharing.
pub fn shared(projection: Projection) -> SharedProjection {
    Arc::new(RwLock::new(projection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::value::Properties;

    fn square(id: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Feature {
        Feature::new(id, Geometry::rectangle(x1, y1, x2, y2), Properties::new())
    }

    #[test]
    fn test_mercator_origin_maps_to_translate() {
        let projection = Projection::mercator();
        let [x, y] = projection.project([0.0, 0.0]);
        assert!((x - 480.0).abs() < 1e-9);
        assert!((y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_north_is_up() {
        let projection = Projection::mercator();
        let paris = projection.project([2.35, 48.85]);
        let lyon = projection.project([4.83, 45.76]);
        assert!(paris[1] < lyon[1], "northern points have smaller y");
        assert!(paris[0] < lyon[0]);
    }

    #[test]
    fn test_mercator_invert() {
        let projection = Projection::mercator().with_scale(2000.0).with_translate([10.0, 20.0]);
        let p = [-1.55, 47.22];
        let back = projection.invert(projection.project(p));
        assert!((back[0] - p[0]).abs() < 1e-9);
        assert!((back[1] - p[1]).abs() < 1e-9);
    }

    #[test]
    fn test_latitude_is_clamped() {
        let projection = Projection::mercator();
        let pole = projection.project([0.0, 90.0]);
        assert!(pole[1].is_finite());
    }

    #[test]
    fn test_fit_size_centers_features() {
        let features = vec![square("a", 0.0, 0.0, 10.0, 5.0)];
        let mut projection = Projection::identity();
        projection.fit_size(200.0, 200.0, &features).unwrap();

        // Width limits the scale: 10 units over 200 pixels.
        assert!((projection.scale() - 20.0).abs() < 1e-9);
        let b = projection.bounds(&features);
        assert!((b.x1 - 0.0).abs() < 1e-9 && (b.x2 - 200.0).abs() < 1e-9);
        assert!((b.y1 - 50.0).abs() < 1e-9 && (b.y2 - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_mercator_within_extent() {
        let features = vec![square("fr", -5.0, 42.0, 8.0, 51.0)];
        let mut projection = Projection::mercator();
        projection
            .fit_extent([[10.0, 10.0], [790.0, 590.0]], &features)
            .unwrap();

        let b = projection.bounds(&features);
        assert!(b.x1 >= 10.0 - 1e-6 && b.x2 <= 790.0 + 1e-6);
        assert!(b.y1 >= 10.0 - 1e-6 && b.y2 <= 590.0 + 1e-6);
        let touches_x = (b.x1 - 10.0).abs() < 1e-6 && (b.x2 - 790.0).abs() < 1e-6;
        let touches_y = (b.y1 - 10.0).abs() < 1e-6 && (b.y2 - 590.0).abs() < 1e-6;
        assert!(touches_x || touches_y);
    }

    #[test]
    fn test_fit_errors() {
        let mut projection = Projection::identity();
        let empty: Vec<Feature> = Vec::new();
        assert_eq!(
            projection.fit_size(100.0, 100.0, &empty),
            Err(ProjectionError::EmptyBounds)
        );

        let point = vec![Feature::new(
            "p",
            Geometry::from_ring(vec![[1.0, 1.0]]),
            Properties::new(),
        )];
        assert_eq!(
            projection.fit_size(100.0, 100.0, &point),
            Err(ProjectionError::DegenerateBounds)
        );
        assert!(matches!(
            projection.fit_size(0.0, 100.0, &point),
            Err(ProjectionError::InvalidExtent { .. })
        ));
    }
}
