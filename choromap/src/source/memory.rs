//! In-memory source fetcher.
//!
//! Serves embedded assets and stands in for the network in tests. Every
//! fetch is counted per source, and an optional latency simulates slow
//! downloads.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use super::{FetchError, SourceFetcher};
use crate::queue::BoxFuture;

/// Serves sources from memory.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    sources: RwLock<HashMap<String, Vec<u8>>>,
    latencies: RwLock<HashMap<String, Duration>>,
    fetches: RwLock<HashMap<String, usize>>,
}

impl MemoryFetcher {
    /// Creates an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source.
    pub fn insert(&self, source: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.sources.write().insert(source.into(), content.into());
    }

    /// Builder variant of [`insert`](Self::insert).
    pub fn with_source(self, source: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(source, content);
        self
    }

    /// Delays every fetch of `source` by `latency`.
    pub fn with_latency(self, source: impl Into<String>, latency: Duration) -> Self {
        self.latencies.write().insert(source.into(), latency);
        self
    }

    /// Number of times `source` was fetched.
    pub fn fetch_count(&self, source: &str) -> usize {
        self.fetches.read().get(source).copied().unwrap_or(0)
    }
}

impl SourceFetcher for MemoryFetcher {
    fn fetch<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            *self.fetches.write().entry(source.to_string()).or_insert(0) += 1;

            let latency = self.latencies.read().get(source).copied();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            self.sources
                .read()
                .get(source)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(source.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_fetches() {
        let fetcher = MemoryFetcher::new().with_source("a.csv", "id\n1\n");

        assert_eq!(fetcher.fetch("a.csv").await.unwrap(), b"id\n1\n");
        assert_eq!(fetcher.fetch("a.csv").await.unwrap(), b"id\n1\n");
        assert_eq!(fetcher.fetch_count("a.csv"), 2);
        assert_eq!(fetcher.fetch_count("b.csv"), 0);
    }

    #[tokio::test]
    async fn test_unknown_source_is_not_found() {
        let fetcher = MemoryFetcher::new();
        let err = fetcher.fetch("nowhere.topojson").await.unwrap_err();
        assert_eq!(err, FetchError::NotFound("nowhere.topojson".into()));
    }
}
