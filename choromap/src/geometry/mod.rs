//! Geographic features, TopoJSON decoding and the layer registry.

mod registry;
mod topology;
mod types;

pub use registry::GeometryRegistry;
pub use topology::decode_topology;
pub use types::{polygon_from_rings, BoundingBox, Feature, Geometry, Position};

use thiserror::Error;

/// Errors raised while decoding geometry sources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// The source is not valid JSON or has an unexpected shape.
    #[error("failed to parse topology: {0}")]
    Parse(String),

    /// The document's `type` is not `Topology`.
    #[error("expected a Topology document, found '{0}'")]
    NotTopology(String),

    /// The topology declares no objects.
    #[error("topology declares no objects")]
    NoObjects,

    /// A geometry references an arc that does not exist.
    #[error("arc reference {0} is out of range")]
    ArcIndex(i64),

    /// An arc position has fewer than two coordinates.
    #[error("arc {0} contains an invalid position")]
    InvalidArc(usize),
}
