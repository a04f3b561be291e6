//! Source fetching for geometry and tabular files.
//!
//! Layers and datasets never talk to the network or the filesystem directly;
//! they go through a [`SourceFetcher`]. This keeps loading injectable: the
//! application wires a [`DefaultFetcher`], tests use a [`MemoryFetcher`].

mod file;
mod http;
mod memory;

pub use file::FileFetcher;
pub use http::{HttpFetcher, DEFAULT_TIMEOUT_SECS};
pub use memory::MemoryFetcher;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::queue::BoxFuture;

/// Errors raised while fetching a source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP transport failure (DNS, TLS, timeout...).
    #[error("HTTP request for {url} failed: {message}")]
    Http { url: String, message: String },

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Filesystem failure.
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// The source is not known to this fetcher.
    #[error("Source not found: {0}")]
    NotFound(String),
}

/// Fetches the raw bytes of a source.
///
/// Uses `Pin<Box<dyn Future>>` so that fetchers can be shared as
/// `Arc<dyn SourceFetcher>`.
pub trait SourceFetcher: Send + Sync {
    /// Fetches `source` and returns its content.
    fn fetch<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

impl<T: SourceFetcher + ?Sized> SourceFetcher for Arc<T> {
    fn fetch<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        (**self).fetch(source)
    }
}

/// Routes `http://` and `https://` sources to HTTP, everything else to files.
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DefaultFetcher {
    /// Creates a fetcher with default HTTP timeout and no file base directory.
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpFetcher::new()?,
            file: FileFetcher::new(),
        })
    }

    /// Creates a fetcher with explicit components.
    pub fn with_parts(http: HttpFetcher, file: FileFetcher) -> Self {
        Self { http, file }
    }
}

/// Returns true when `source` should be fetched over HTTP.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

impl SourceFetcher for DefaultFetcher {
    fn fetch<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        if is_remote(source) {
            self.http.fetch(source)
        } else {
            self.file.fetch(source)
        }
    }
}
