//! HTTP fetching of generated images
//!
//! Generation services usually answer with URLs. The fetcher streams the
//! body with a size cap so a misbehaving host cannot exhaust memory.

use crate::error::{Result, StickerError};
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

/// Largest accepted response body (32 MiB)
pub const DEFAULT_MAX_DOWNLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Streaming image downloader
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_bytes: usize,
}

impl ImageFetcher {
    /// Create a fetcher with a whole-request timeout
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stickerbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StickerError::network_error("Failed to create HTTP client", e))?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        })
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Download `url` into memory
    ///
    /// # Errors
    /// - Connection or timeout failures
    /// - Non-success HTTP status
    /// - Body larger than the configured cap
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("Fetching image: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StickerError::network_error(&format!("Failed to fetch {url}"), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StickerError::network_error(
                &format!("HTTP error for {url}"),
                status,
            ));
        }

        if let Some(length) = response.content_length() {
            self.check_size(url, length as usize)?;
        }

        let mut body = Vec::with_capacity(
            response
                .content_length()
                .map_or(64 * 1024, |len| len as usize),
        );
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| StickerError::network_error("Failed to read response body", e))?;
            body.extend_from_slice(&chunk);
            self.check_size(url, body.len())?;
        }

        log::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    fn check_size(&self, url: &str, size: usize) -> Result<()> {
        if size > self.max_bytes {
            return Err(StickerError::network_error(
                &format!("Response from {url} too large"),
                format!("{} bytes exceeds cap of {} bytes", size, self.max_bytes),
            ));
        }
        Ok(())
    }
}
