//! TopoJSON decoding.
//!
//! Only the first object declared in `objects` is decoded, in document
//! order. Arcs may be quantized (delta-encoded, with a `transform`) or carry
//! absolute positions. Polygon, MultiPolygon and GeometryCollection objects
//! produce features; other geometry kinds yield features with an empty
//! geometry so that their properties can still be joined.

use std::fmt;

use geo::Polygon;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{polygon_from_rings, Feature, Geometry, Position};

/// Positions of one stitched ring.
type Ring = Vec<Position>;
use super::GeometryError;
use crate::value::{Properties, Value};

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default, deserialize_with = "ordered_objects")]
    objects: Vec<(String, TopoGeometry)>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    arcs: serde_json::Value,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// Keeps `objects` in declaration order.
fn ordered_objects<'de, D>(deserializer: D) -> Result<Vec<(String, TopoGeometry)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ObjectsVisitor;

    impl<'de> Visitor<'de> for ObjectsVisitor {
        type Value = Vec<(String, TopoGeometry)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of topology objects")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut objects = Vec::new();
            while let Some(entry) = map.next_entry::<String, TopoGeometry>()? {
                objects.push(entry);
            }
            Ok(objects)
        }
    }

    deserializer.deserialize_map(ObjectsVisitor)
}

/// Decoded arcs, indexed by arc number.
struct Arcs {
    positions: Vec<Vec<Position>>,
}

impl Arcs {
    fn decode(raw: &[Vec<Vec<f64>>], transform: Option<Transform>) -> Result<Self, GeometryError> {
        let mut positions = Vec::with_capacity(raw.len());
        for (index, arc) in raw.iter().enumerate() {
            let mut decoded = Vec::with_capacity(arc.len());
            let (mut x, mut y) = (0.0, 0.0);
            for point in arc {
                let (px, py) = match point.as_slice() {
                    [px, py, ..] => (*px, *py),
                    _ => return Err(GeometryError::InvalidArc(index)),
                };
                match transform {
                    Some(t) => {
                        x += px;
                        y += py;
                        decoded.push([x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]]);
                    }
                    None => decoded.push([px, py]),
                }
            }
            positions.push(decoded);
        }
        Ok(Self { positions })
    }

    /// Resolves a signed arc reference; `~i` (negative) walks arc `i` backwards.
    fn resolve(&self, reference: i64) -> Result<Vec<Position>, GeometryError> {
        let (index, reversed) = if reference < 0 {
            (!reference, true)
        } else {
            (reference, false)
        };
        let arc = usize::try_from(index)
            .ok()
            .and_then(|i| self.positions.get(i))
            .ok_or(GeometryError::ArcIndex(reference))?;

        let mut points = arc.clone();
        if reversed {
            points.reverse();
        }
        Ok(points)
    }

    /// Stitches arcs into a ring, dropping the shared point between arcs.
    fn ring(&self, references: &[i64]) -> Result<Ring, GeometryError> {
        let mut ring: Ring = Vec::new();
        for reference in references {
            let points = self.resolve(*reference)?;
            if !ring.is_empty() {
                ring.pop();
            }
            ring.extend(points);
        }
        Ok(ring)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Polygon<f64>, GeometryError> {
        let rings = rings
            .iter()
            .map(|refs| self.ring(refs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(polygon_from_rings(rings))
    }
}

fn parse_arcs<T: serde::de::DeserializeOwned>(
    kind: &str,
    arcs: &serde_json::Value,
) -> Result<T, GeometryError> {
    serde_json::from_value(arcs.clone())
        .map_err(|e| GeometryError::Parse(format!("invalid {} arcs: {}", kind, e)))
}

fn decode_geometry(geometry: &TopoGeometry, arcs: &Arcs) -> Result<Geometry, GeometryError> {
    match geometry.kind.as_deref() {
        Some("Polygon") => {
            let rings: Vec<Vec<i64>> = parse_arcs("Polygon", &geometry.arcs)?;
            Ok(Geometry::new(vec![arcs.polygon(&rings)?]))
        }
        Some("MultiPolygon") => {
            let polygons: Vec<Vec<Vec<i64>>> = parse_arcs("MultiPolygon", &geometry.arcs)?;
            let polygons = polygons
                .iter()
                .map(|rings| arcs.polygon(rings))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::new(polygons))
        }
        other => {
            debug!(kind = ?other, "Ignoring non-areal topology geometry");
            Ok(Geometry::default())
        }
    }
}

fn feature_properties(geometry: &TopoGeometry) -> Properties {
    geometry
        .properties
        .as_ref()
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect()
        })
        .unwrap_or_default()
}

/// Picks the feature id: the primary property, then the topology id, then
/// `#` followed by the feature's position in the object.
///
/// The `#` prefix keeps positional ids apart from real numeric codes.
fn feature_id(properties: &Properties, topo_id: Option<&serde_json::Value>, primary: &str, index: usize) -> String {
    properties
        .get(primary)
        .and_then(Value::as_key)
        .or_else(|| topo_id.and_then(|id| Value::from(id.clone()).as_key()))
        .unwrap_or_else(|| {
            warn!(primary = %primary, index, "Feature has no id, using its position");
            format!("#{}", index)
        })
}

fn to_feature(
    geometry: &TopoGeometry,
    arcs: &Arcs,
    primary: &str,
    index: usize,
) -> Result<Feature, GeometryError> {
    let properties = feature_properties(geometry);
    let id = feature_id(&properties, geometry.id.as_ref(), primary, index);
    Ok(Feature::new(id, decode_geometry(geometry, arcs)?, properties))
}

/// Decodes the first object of a TopoJSON document into features.
///
/// `primary` names the property whose value becomes each feature's id.
pub fn decode_topology(bytes: &[u8], primary: &str) -> Result<Vec<Feature>, GeometryError> {
    let topology: Topology =
        serde_json::from_slice(bytes).map_err(|e| GeometryError::Parse(e.to_string()))?;

    if topology.kind != "Topology" {
        return Err(GeometryError::NotTopology(topology.kind));
    }

    let (name, object) = topology
        .objects
        .first()
        .ok_or(GeometryError::NoObjects)?;

    let arcs = Arcs::decode(&topology.arcs, topology.transform)?;

    let features = if object.kind.as_deref() == Some("GeometryCollection") {
        object
            .geometries
            .iter()
            .enumerate()
            .map(|(index, geometry)| to_feature(geometry, &arcs, primary, index))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![to_feature(object, &arcs, primary, 0)?]
    };

    debug!(object = %name, features = features.len(), "Decoded topology");
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit squares sharing the edge x = 1, quantized.
    const QUANTIZED: &str = r#"{
        "type": "Topology",
        "transform": {"scale": [1, 1], "translate": [0, 0]},
        "objects": {
            "zones": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "arcs": [[0, 1]], "properties": {"DEP": "01", "nom": "Ain"}},
                    {"type": "Polygon", "arcs": [[2, -1]], "properties": {"DEP": "02", "nom": "Aisne"}}
                ]
            },
            "other": {"type": "GeometryCollection", "geometries": []}
        },
        "arcs": [
            [[1, 0], [0, 1]],
            [[1, 1], [-1, 0], [0, -1], [1, 0]],
            [[1, 0], [1, 0], [0, 1], [-1, 0]]
        ]
    }"#;

    #[test]
    fn test_decodes_first_object_in_document_order() {
        // "other" sorts before "zones" but is declared second.
        let features = decode_topology(QUANTIZED.as_bytes(), "DEP").unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "01");
        assert_eq!(features[1].id, "02");
        assert_eq!(features[0].properties.get("nom"), Some(&Value::from("Ain")));
    }

    #[test]
    fn test_quantized_arcs_are_delta_decoded() {
        let features = decode_topology(QUANTIZED.as_bytes(), "DEP").unwrap();
        let bbox = features[0].geometry.bounding_box();
        assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_reversed_arc_reference() {
        let features = decode_topology(QUANTIZED.as_bytes(), "DEP").unwrap();
        let ring = &features[1].geometry.polygons()[0].exterior().0;
        // Arc 2 then arc 0 reversed: ends back on the shared edge start.
        assert_eq!(ring.first(), Some(&geo::Coord { x: 1.0, y: 0.0 }));
        assert_eq!(ring.last(), Some(&geo::Coord { x: 1.0, y: 0.0 }));
        let bbox = features[1].geometry.bounding_box();
        assert_eq!((bbox.x1, bbox.x2), (1.0, 2.0));
    }

    #[test]
    fn test_unquantized_multipolygon() {
        let doc = r#"{
            "type": "Topology",
            "objects": {"only": {"type": "GeometryCollection", "geometries": [
                {"type": "MultiPolygon", "arcs": [[[0]], [[1]]], "id": 7}
            ]}},
            "arcs": [
                [[0, 0], [1, 0], [1, 1], [0, 0]],
                [[5, 5], [6, 5], [6, 6], [5, 5]]
            ]
        }"#;
        let features = decode_topology(doc.as_bytes(), "code").unwrap();
        assert_eq!(features[0].id, "7");
        assert_eq!(features[0].geometry.polygons().len(), 2);
    }

    #[test]
    fn test_non_areal_geometry_is_empty() {
        let doc = r#"{
            "type": "Topology",
            "objects": {"pts": {"type": "GeometryCollection", "geometries": [
                {"type": "Point", "coordinates": [1, 2], "properties": {"code": 3}}
            ]}},
            "arcs": []
        }"#;
        let features = decode_topology(doc.as_bytes(), "code").unwrap();
        assert_eq!(features[0].id, "3");
        assert!(features[0].geometry.is_empty());
    }

    #[test]
    fn test_positional_id_does_not_collide_with_codes() {
        let doc = r#"{
            "type": "Topology",
            "objects": {"zones": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "arcs": [[0]], "properties": {"code": 1}},
                {"type": "Polygon", "arcs": [[0]], "properties": {"nom": "sans code"}}
            ]}},
            "arcs": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
        }"#;
        let features = decode_topology(doc.as_bytes(), "code").unwrap();
        assert_eq!(features[0].id, "1");
        assert_eq!(features[1].id, "#1");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            decode_topology(b"not json", "id"),
            Err(GeometryError::Parse(_))
        ));
        assert!(matches!(
            decode_topology(br#"{"type": "FeatureCollection", "objects": {}}"#, "id"),
            Err(GeometryError::NotTopology(_))
        ));
        assert!(matches!(
            decode_topology(br#"{"type": "Topology", "objects": {}, "arcs": []}"#, "id"),
            Err(GeometryError::NoObjects)
        ));
        let bad_arc = r#"{"type": "Topology", "objects": {"a": {"type": "Polygon", "arcs": [[4]]}}, "arcs": []}"#;
        assert!(matches!(
            decode_topology(bad_arc.as_bytes(), "id"),
            Err(GeometryError::ArcIndex(4))
        ));
    }
}
