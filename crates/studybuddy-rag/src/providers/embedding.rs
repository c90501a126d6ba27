//! Embedding provider trait and the gateway shared by ingestion and query

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text, all-mpnet-base-v2)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identity the vectors belong to
    fn model(&self) -> &str;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// The single path from text to vector
///
/// One gateway is built at startup and handed to both the ingestion
/// pipeline and the retriever, so the two can never disagree on the model.
/// Every vector is checked against the configured dimensionality.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: usize) -> Self {
        Self {
            provider,
            dimensions,
        }
    }

    /// Embed text, rejecting vectors of the wrong length
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider.embed(text).await?;
        if vector.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "model '{}' returned {} dimensions, expected {}",
                self.provider.model(),
                vector.len(),
                self.dimensions
            )));
        }
        Ok(vector)
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.provider.health_check().await
    }
}
