//! Session-wide registry of geometry layers keyed by layer id.

use dashmap::DashMap;
use tracing::debug;

use crate::layer::Layer;

/// Registry of layers, created once per session and injected where needed.
///
/// Layers are cheap handles, so lookups return clones sharing the same
/// underlying state. A layer requested while it is still loading is returned
/// as is; callers wait on its readiness through the layer's own queue.
#[derive(Default)]
pub struct GeometryRegistry {
    layers: DashMap<String, Layer>,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the layer registered under `id`.
    pub fn get(&self, id: &str) -> Option<Layer> {
        self.layers.get(id).map(|entry| entry.value().clone())
    }

    pub fn has(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    /// Registers `layer` under `id`, returning the layer it replaced.
    pub fn add(&self, id: impl Into<String>, layer: Layer) -> Option<Layer> {
        self.layers.insert(id.into(), layer)
    }

    pub fn remove(&self, id: &str) -> Option<Layer> {
        self.layers.remove(id).map(|(_, layer)| layer)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Registered layer ids, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.layers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Returns the layer under `id`, creating it with `make` if absent.
    ///
    /// Insertion is atomic per id: concurrent callers all receive the same
    /// instance and `make` runs at most once. `make` must not access the
    /// registry.
    pub fn get_or_create<F>(&self, id: &str, make: F) -> Layer
    where
        F: FnOnce() -> Layer,
    {
        self.layers
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(layer = %id, "Creating layer");
                make()
            })
            .value()
            .clone()
    }
}

impl std::fmt::Debug for GeometryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryRegistry")
            .field("layers", &self.layers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::layer::{LayerConfig, LayerContext};

    fn make_layer(id: &str) -> Layer {
        Layer::new(id, LayerConfig::new("code"), LayerContext::detached())
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_instance() {
        let registry = GeometryRegistry::new();
        let first = registry.get_or_create("dep", || make_layer("dep"));
        let second = registry.get_or_create("dep", || make_layer("other"));

        assert!(first.ptr_eq(&second));
        assert_eq!(second.id(), "dep");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_creates_once() {
        let registry = Arc::new(GeometryRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let created = Arc::clone(&created);
                tokio::spawn(async move {
                    registry.get_or_create("region", || {
                        created.fetch_add(1, Ordering::SeqCst);
                        make_layer("region")
                    })
                })
            })
            .collect();

        let mut layers = Vec::new();
        for task in tasks {
            layers.push(task.await.unwrap());
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(layers.windows(2).all(|w| w[0].ptr_eq(&w[1])));
    }

    #[tokio::test]
    async fn test_add_remove() {
        let registry = GeometryRegistry::new();
        assert!(!registry.has("a"));
        assert!(registry.add("a", make_layer("a")).is_none());
        assert!(registry.has("a"));
        assert!(registry.get("a").is_some());
        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
        assert!(registry.get("a").is_none());
    }
}
