//! Feature geometry: `geo` multipolygons plus a screen-oriented bounding box.

use geo::{
    Area, BoundingRect, Centroid, Contains, Coord, CoordsIter, LineString, MapCoords,
    MultiPolygon, Point, Polygon, Rect,
};

use crate::value::Properties;

/// A planar position `[x, y]`.
pub type Position = [f64; 2];

/// Axis-aligned bounding box.
///
/// `x1`/`y1` is the top-left corner, `x2`/`y2` the bottom-right one, in the
/// same space as the geometry it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// The empty box: union with anything yields the other operand.
    pub fn empty() -> Self {
        Self {
            x1: f64::INFINITY,
            y1: f64::INFINITY,
            x2: f64::NEG_INFINITY,
            y2: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x1 > self.x2 || self.y1 > self.y2
    }

    /// Grows the box to include `p`.
    pub fn extend(&mut self, p: Position) {
        self.x1 = self.x1.min(p[0]);
        self.y1 = self.y1.min(p[1]);
        self.x2 = self.x2.max(p[0]);
        self.y2 = self.y2.max(p[1]);
    }

    /// Returns the smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> Position {
        [(self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0]
    }

    /// Returns true if `p` lies inside or on the edge of the box.
    pub fn contains(&self, p: Position) -> bool {
        p[0] >= self.x1 && p[0] <= self.x2 && p[1] >= self.y1 && p[1] <= self.y2
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        BoundingBox::new(min.x, min.y, max.x, max.y)
    }
}

/// Builds a polygon from rings, exterior first; rings are closed as needed.
pub fn polygon_from_rings(rings: Vec<Vec<Position>>) -> Polygon<f64> {
    let mut rings = rings.into_iter().map(LineString::from);
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

/// Planar shape of a feature: zero or more polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry(MultiPolygon<f64>);

impl Default for Geometry {
    fn default() -> Self {
        Self(MultiPolygon::new(Vec::new()))
    }
}

impl From<MultiPolygon<f64>> for Geometry {
    fn from(shape: MultiPolygon<f64>) -> Self {
        Self(shape)
    }
}

impl Geometry {
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        Self(MultiPolygon::new(polygons))
    }

    /// Geometry with a single exterior ring.
    pub fn from_ring(ring: Vec<Position>) -> Self {
        Self::new(vec![polygon_from_rings(vec![ring])])
    }

    /// Axis-aligned rectangle, handy for synthetic layers.
    pub fn rectangle(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let rect = Rect::new(Coord { x: x1, y: y1 }, Coord { x: x2, y: y2 });
        Self::new(vec![rect.to_polygon()])
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.0 .0
    }

    pub fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.coords_count() == 0
    }

    /// Every position of every ring.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.0.coords_iter().map(|c| [c.x, c.y])
    }

    /// Bounding box of all positions; empty for empty geometry.
    pub fn bounding_box(&self) -> BoundingBox {
        self.0
            .bounding_rect()
            .map_or_else(BoundingBox::empty, BoundingBox::from)
    }

    /// Planar area, holes subtracted.
    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    /// Area-weighted centroid; `None` for empty geometry.
    pub fn centroid(&self) -> Option<Position> {
        self.0.centroid().map(|p| [p.x(), p.y()])
    }

    /// Returns true if `p` lies inside a polygon, outside its holes.
    pub fn contains(&self, p: Position) -> bool {
        self.0.contains(&Point::new(p[0], p[1]))
    }

    /// Returns a copy with every position transformed by `f`.
    pub fn map_positions(&self, f: impl Fn(Position) -> Position + Copy) -> Geometry {
        Self(self.0.map_coords(move |c| {
            let [x, y] = f([c.x, c.y]);
            Coord { x, y }
        }))
    }
}

/// One geographic unit of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Value of the layer's primary property, rendered as a key.
    pub id: String,
    /// Shape in source coordinates.
    pub geometry: Geometry,
    /// Attributes, extended by joins.
    pub properties: Properties,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry, properties: Properties) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Vec<Position> {
        vec![[x, y], [x + side, y], [x + side, y + side], [x, y + side]]
    }

    #[test]
    fn test_rectangle_bbox_and_centroid() {
        let geometry = Geometry::rectangle(0.0, 0.0, 10.0, 20.0);
        assert_eq!(geometry.bounding_box(), BoundingBox::new(0.0, 0.0, 10.0, 20.0));

        let [cx, cy] = geometry.centroid().unwrap();
        assert!((cx - 5.0).abs() < 1e-9);
        assert!((cy - 10.0).abs() < 1e-9);
        assert!((geometry.area() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_is_area_weighted() {
        // A big square and a tiny one far away: the centroid stays near the big one.
        let geometry = Geometry::new(vec![
            polygon_from_rings(vec![square(0.0, 0.0, 10.0)]),
            polygon_from_rings(vec![square(100.0, 0.0, 1.0)]),
        ]);
        let [cx, _] = geometry.centroid().unwrap();
        assert!(cx < 7.0, "centroid x = {}", cx);
    }

    #[test]
    fn test_hole_is_not_contained() {
        let geometry = Geometry::new(vec![polygon_from_rings(vec![
            square(0.0, 0.0, 10.0),
            square(4.0, 4.0, 2.0),
        ])]);

        assert!(geometry.contains([1.0, 1.0]));
        assert!(!geometry.contains([5.0, 5.0]));
        assert!(!geometry.contains([11.0, 5.0]));
        assert!((geometry.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_rings_are_closed() {
        let polygon = polygon_from_rings(vec![square(0.0, 0.0, 1.0)]);
        let ring = &polygon.exterior().0;
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_map_positions_keeps_structure() {
        let geometry = Geometry::new(vec![polygon_from_rings(vec![
            square(0.0, 0.0, 10.0),
            square(4.0, 4.0, 2.0),
        ])]);
        let scaled = geometry.map_positions(|[x, y]| [x * 2.0, y * 2.0 + 1.0]);

        assert_eq!(scaled.polygons()[0].interiors().len(), 1);
        assert_eq!(scaled.bounding_box(), BoundingBox::new(0.0, 1.0, 20.0, 21.0));
        assert!(!scaled.contains([10.0, 11.0]));
    }

    #[test]
    fn test_empty_geometry() {
        let geometry = Geometry::default();
        assert!(geometry.is_empty());
        assert!(geometry.bounding_box().is_empty());
        assert_eq!(geometry.centroid(), None);
    }

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(2.0, -1.0, 3.0, 0.5);
        assert_eq!(a.union(&b), BoundingBox::new(0.0, -1.0, 3.0, 1.0));
        assert_eq!(BoundingBox::empty().union(&a), a);
    }
}
