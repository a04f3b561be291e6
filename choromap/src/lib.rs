//! choromap - Interactive choropleth maps driven by ordered operation queues
//!
//! This library provides the core of an embeddable choropleth map: geometry
//! layers loaded on demand, joined against tabular statistics, colored from a
//! derived scale and navigated through an animated viewport.
//!
//! Every visual entity (layer, zoom controller) owns an [`queue::OperationQueue`].
//! Operations are declared synchronously and run strictly in declaration order,
//! even though each one may take an unpredictable amount of time.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use choromap::composition::{MapComposition, MapSize, CompositionOptions};
//! use choromap::dataset::{Dataset, DatasetOptions, mappers};
//! use choromap::geometry::GeometryRegistry;
//! use choromap::layer::{FillOptions, JoinOptions, LayerConfig};
//! use choromap::source::DefaultFetcher;
//!
//! let fetcher = Arc::new(DefaultFetcher::new()?);
//! let registry = Arc::new(GeometryRegistry::new());
//! let map = MapComposition::new("map", MapSize::new(800.0, 600.0), CompositionOptions::default(),
//!     registry, fetcher.clone());
//!
//! let results = Dataset::load("results", fetcher, "data/results.csv",
//!     DatasetOptions::new("id").with_mapper(mappers::numeric_except(["id"])));
//!
//! let departements = map.get_or_create_layer("departements",
//!     LayerConfig::new("DEP").with_autofit(true));
//! departements.load("geo/departements.topojson");
//! departements.render();
//! departements.join(&results, JoinOptions::default());
//! departements.fill("voix", FillOptions::default()).await?;
//! ```

pub mod color;
pub mod composition;
pub mod config;
pub mod dataset;
pub mod geometry;
pub mod join;
pub mod layer;
pub mod logging;
pub mod projection;
pub mod queue;
pub mod source;
pub mod state;
pub mod stats;
pub mod value;
pub mod viewport;

pub use value::{Properties, Value};
