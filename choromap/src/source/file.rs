//! Filesystem source fetcher.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{FetchError, SourceFetcher};
use crate::queue::BoxFuture;

/// Reads sources from the local filesystem.
///
/// Relative sources are resolved against the optional base directory.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    base_dir: Option<PathBuf>,
}

impl FileFetcher {
    /// Creates a fetcher resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher resolving relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Resolves a source to a filesystem path.
    pub fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceFetcher for FileFetcher {
    fn fetch<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let path = self.resolve(source);
            debug!(path = %path.display(), "Reading local source");
            tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
                path,
                message: e.to_string(),
            })
        })
    }
}
