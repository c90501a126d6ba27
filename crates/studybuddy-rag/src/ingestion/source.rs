//! Where document bytes come from

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{Error, Result};

/// Fetches raw document bytes by locator
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Download the document; any failure is `Error::UpstreamFetch`
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Plain HTTP(S) GET
pub struct HttpDocumentSource {
    client: Client,
}

impl HttpDocumentSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        tracing::debug!("Downloading {}", locator);

        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| Error::fetch(locator, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(locator, format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::fetch(locator, format!("Failed to read body: {}", e)))?;

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), locator);
        Ok(bytes.to_vec())
    }
}
