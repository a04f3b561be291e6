//! HTTP source fetcher backed by reqwest.

use std::time::Duration;

use tracing::debug;

use super::{FetchError, SourceFetcher};
use crate::queue::BoxFuture;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches sources over HTTP(S).
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a fetcher with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Http {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            debug!(url, "Fetching remote source");
            let response = self.client.get(url).send().await.map_err(|e| FetchError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            if !response.status().is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| FetchError::Http {
                    url: url.to_string(),
                    message: format!("Failed to read response: {}", e),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_custom_timeout() {
        assert!(HttpFetcher::with_timeout(5).is_ok());
    }
}
