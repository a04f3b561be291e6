//! Integration tests for the choropleth pipeline.
//!
//! These tests drive the public API the way an embedding application does:
//! - declare a whole layer pipeline at once and let the queue order it
//! - drill down from departments into communes loaded on demand
//! - zoom while the pipeline is still running
//!
//! Run with: `cargo test --test pipeline_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use choromap::color::Color;
use choromap::composition::{CompositionOptions, MapComposition, MapSize};
use choromap::dataset::{mappers, Dataset, DatasetHandle, DatasetOptions};
use choromap::geometry::{BoundingBox, GeometryRegistry};
use choromap::layer::{
    FeatureState, FillOptions, InputEvent, JoinOptions, LabelOptions, Layer, LayerConfig,
    LayerContext, LayerEvent, DEFAULT_BLANK,
};
use choromap::projection::{self, Projection};
use choromap::source::MemoryFetcher;
use choromap::state::{StateChange, StateStore};
use choromap::viewport::{
    Viewport, ViewportSize, ViewportTransform, ZoomConfig, ZoomController, ZoomError,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Two departments, one degree wide each.
const DEPARTEMENTS: &str = r#"{
    "type": "Topology",
    "objects": {"departements": {"type": "GeometryCollection", "geometries": [
        {"type": "Polygon", "arcs": [[0]], "properties": {"DEP": "01", "NOM": "Ain"}},
        {"type": "Polygon", "arcs": [[1]], "properties": {"DEP": "02", "NOM": "Aisne"}}
    ]}},
    "arcs": [
        [[0, 45], [1, 45], [1, 46], [0, 46], [0, 45]],
        [[1, 45], [2, 45], [2, 46], [1, 46], [1, 45]]
    ]
}"#;

/// Three communes inside department 01.
const COMMUNES_01: &str = r#"{
    "type": "Topology",
    "objects": {"communes": {"type": "GeometryCollection", "geometries": [
        {"type": "Polygon", "arcs": [[0]], "properties": {"COM": 1001, "NCC": "BOURG"}},
        {"type": "Polygon", "arcs": [[1]], "properties": {"COM": 1002, "NCC": "BELLEY"}},
        {"type": "Polygon", "arcs": [[2]], "properties": {"COM": 1003, "NCC": "GEX"}}
    ]}},
    "arcs": [
        [[0.0, 45.0], [0.5, 45.0], [0.5, 45.5], [0.0, 45.5], [0.0, 45.0]],
        [[0.5, 45.0], [1.0, 45.0], [1.0, 45.5], [0.5, 45.5], [0.5, 45.0]],
        [[0.0, 45.5], [1.0, 45.5], [1.0, 46.0], [0.0, 46.0], [0.0, 45.5]]
    ]
}"#;

const RESULTS_DEP: &str = "id,voix\n01,12.5\n02,40\n";
const RESULTS_01: &str = "insee,voix\n1001,15\n1002,35\n";
const PREFECTURES: &str = "COM,NCCENR\n1001,Bourg-en-Bresse\n";

const RED: Color = Color::rgb(0xb3, 0, 0);
const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

fn fetcher() -> Arc<MemoryFetcher> {
    Arc::new(
        MemoryFetcher::new()
            .with_source("geo/departements.topojson", DEPARTEMENTS)
            .with_source("geo/01.topojson", COMMUNES_01)
            .with_source("data/departements.csv", RESULTS_DEP)
            .with_source("data/01.csv", RESULTS_01)
            .with_source("data/prefectures.csv", PREFECTURES),
    )
}

fn map(fetcher: Arc<MemoryFetcher>) -> MapComposition {
    MapComposition::new(
        "france",
        MapSize::new(800.0, 600.0),
        CompositionOptions::default()
            .with_zoom(ZoomConfig::default().with_duration(Duration::from_millis(500))),
        Arc::new(GeometryRegistry::new()),
        fetcher,
    )
}

fn results(fetcher: &Arc<MemoryFetcher>, source: &str, key: &str) -> DatasetHandle {
    Dataset::load(
        source,
        fetcher.clone(),
        source,
        DatasetOptions::new(key).with_mapper(mappers::numeric_except([key])),
    )
}

fn communes_layer(map: &MapComposition, fetcher: &Arc<MemoryFetcher>) -> Layer {
    let communes = map.get_or_create_layer(
        "_01",
        LayerConfig::new("COM")
            .with_secondary("NCC")
            .with_class_name("communes"),
    );
    communes.load("geo/01.topojson");
    communes.render();
    communes.join(&results(fetcher, "data/01.csv", "insee"), JoinOptions::default());
    communes
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A commune with no value ends blank and ignores clicks.
#[tokio::test]
async fn test_missing_value_commune_is_blank_and_inert() {
    let fetcher = fetcher();
    let map = map(fetcher.clone());
    let communes = communes_layer(&map, &fetcher);

    let report = communes
        .fill(
            "voix",
            FillOptions::new(vec![WHITE, RED]).with_domain(15.0, 35.0),
        )
        .await
        .unwrap();

    assert_eq!((report.filled, report.blank), (2, 1));
    assert_eq!(communes.feature_state("1001"), Some(FeatureState::Filled(WHITE)));
    assert_eq!(communes.feature_state("1002"), Some(FeatureState::Filled(RED)));
    assert_eq!(
        communes.feature_state("1003"),
        Some(FeatureState::Blank(DEFAULT_BLANK))
    );

    let mut events = communes.subscribe();
    assert!(communes.click("1003", InputEvent::new(1.0, 1.0)).is_none());
    assert!(events.try_recv().is_err());

    let click = communes.click("1001", InputEvent::new(1.0, 1.0)).unwrap();
    assert_eq!(click.properties.get("NCC").map(|v| v.to_string()), Some("BOURG".into()));
    assert!(matches!(events.try_recv(), Ok(LayerEvent::Click(event)) if event.id == "1001"));
}

/// Loading the same layer twice fetches its geometry once.
#[tokio::test]
async fn test_geometry_fetched_once() {
    let fetcher = fetcher();
    let map = map(fetcher.clone());

    let first = map.get_or_create_layer("departements", LayerConfig::new("DEP"));
    let again = map.get_or_create_layer("departements", LayerConfig::new("DEP"));
    assert!(first.ptr_eq(&again));

    let a = first.load("geo/departements.topojson");
    let b = again.load("geo/departements.topojson");
    assert_eq!(a.await.unwrap(), 2);
    assert_eq!(b.await.unwrap(), 2);
    assert_eq!(fetcher.fetch_count("geo/departements.topojson"), 1);
}

/// Slow sources do not reorder a declared pipeline.
#[tokio::test(start_paused = true)]
async fn test_pipeline_order_survives_slow_sources() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .with_source("geo/departements.topojson", DEPARTEMENTS)
            .with_latency("geo/departements.topojson", Duration::from_secs(2))
            .with_source("data/departements.csv", RESULTS_DEP)
            .with_latency("data/departements.csv", Duration::from_secs(5)),
    );
    let map = map(fetcher.clone());
    let start = Instant::now();

    // Declared before anything has loaded.
    let departements =
        map.get_or_create_layer("departements", LayerConfig::new("DEP").with_autofit(true));
    departements.load("geo/departements.topojson");
    let render = departements.render();
    let join = departements.join(
        &results(&fetcher, "data/departements.csv", "id"),
        JoinOptions::default(),
    );
    let fill = departements.fill("voix", FillOptions::default());

    assert_eq!(render.await.unwrap(), 2);
    assert!(start.elapsed() >= Duration::from_secs(2));

    assert_eq!(join.await.unwrap().matched, 2);
    let report = fill.await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!((report.filled, report.blank), (2, 0));
}

/// Zooming on a feature frames it and locks out interaction meanwhile.
#[tokio::test(start_paused = true)]
async fn test_zoom_on_feature_scale_and_lock() {
    let viewport = Viewport::new(ViewportSize::new(200.0, 100.0));
    let context = LayerContext::new(
        projection::shared(Projection::identity()),
        viewport.clone(),
        Arc::new(MemoryFetcher::new().with_source(
            "square.topojson",
            r#"{"type": "Topology",
                "objects": {"o": {"type": "GeometryCollection", "geometries": [
                    {"type": "Polygon", "arcs": [[0]], "properties": {"id": "sq"}}
                ]}},
                "arcs": [[[0, 0], [20, 0], [20, 20], [0, 20], [0, 0]]]}"#,
        )),
    );
    let layer = Layer::new("square", LayerConfig::new("id"), context);
    let zoom = ZoomController::new("zoom", viewport.clone(), ZoomConfig::default());

    // Queued on the layer before the zoom: the zoom waits for the shapes.
    layer.load("square.topojson");
    layer.render();
    let handle = zoom.zoom_to_features(&layer, None, 1.0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(zoom.is_program_driven());
    assert_eq!(
        zoom.user_transform(ViewportTransform::new(0.0, 0.0, 2.0)),
        Err(ZoomError::ProgramDriven)
    );

    let target = handle.await.unwrap();
    assert_eq!(target, ViewportTransform::new(50.0, 0.0, 5.0));
    assert_eq!(viewport.transform(), target);
    assert!(!zoom.is_program_driven());
    assert_eq!(zoom.scale_extent(), (1.0, 20.0));

    let applied = zoom
        .user_transform(ViewportTransform::new(0.0, 0.0, 50.0))
        .unwrap();
    assert_eq!(applied.k, 20.0);
}

/// Drill into a department and back, driven by the state store.
#[tokio::test(start_paused = true)]
async fn test_drill_down_and_back() {
    let fetcher = fetcher();
    let map = map(fetcher.clone());
    let state = StateStore::new();
    state.register_metrics(["voix"]);
    state.register_regions(["01", "02"]);

    let departements = map.get_or_create_layer(
        "departements",
        LayerConfig::new("DEP").with_secondary("NOM").with_autofit(true),
    );
    departements.load("geo/departements.topojson");
    departements.render();
    departements.join(
        &results(&fetcher, "data/departements.csv", "id"),
        JoinOptions::default(),
    );
    departements
        .fill("voix", FillOptions::default())
        .await
        .unwrap();

    // Drill down.
    let change = state.set_region(Some("01")).unwrap();
    assert_eq!(
        change,
        StateChange::Region {
            previous: None,
            current: Some("01".into())
        }
    );
    departements.select("01", true);
    map.fade_out_layers("communes", Some("_01"));
    let communes = communes_layer(&map, &fetcher);
    communes.fill("voix", FillOptions::new(vec![WHITE, RED]).with_domain(15.0, 35.0));
    let labels = communes.labels(
        &Dataset::load(
            "prefectures",
            fetcher.clone(),
            "data/prefectures.csv",
            DatasetOptions::new("COM"),
        ),
        "COM",
        "NCCENR",
        LabelOptions::default(),
    );
    let zoomed = map.zoom_on("departements", Some("01")).unwrap().await.unwrap();

    let dep = departements.shape("01").unwrap().bbox;
    let expected =
        ZoomController::target_transform(&dep, map.size().effective(), 1.0).unwrap();
    assert_eq!(zoomed, expected);
    assert!(zoomed.k > 1.0);

    assert_eq!(labels.await.unwrap(), 1);
    assert_eq!(communes.labels_snapshot()[0].text, "Bourg-en-Bresse");
    assert_eq!(communes.feature_state("1003"), Some(FeatureState::Blank(DEFAULT_BLANK)));

    // Communes sit inside their department once projected.
    let inner = communes.projected_bounds(None);
    assert!(inner.x1 >= dep.x1 - 1e-6 && inner.x2 <= dep.x2 + 1e-6);

    // Back to the overview.
    state.set_region(None).unwrap();
    departements.deselect_all();
    for fade in map.fade_out_layers("communes", None) {
        fade.await.unwrap();
    }
    let home = map.zoom_out().await.unwrap();

    assert_eq!(home, ViewportTransform::IDENTITY);
    assert!(!communes.is_visible());
    assert!(departements.selected().is_empty());
    assert_eq!(map.zoom().scale_extent(), (1.0, 4.0));
    assert_ne!(communes.projected_bounds(None), BoundingBox::empty());
}
