//! Diagram description through an external vision model
//!
//! `VisionModel` is the raw, fallible upstream call. `ImageDescriber` is
//! what ingestion talks to: it always produces a description, falling back
//! to a sentinel when the model cannot help.

pub mod describer;
pub mod gemini;
pub mod retry;

use async_trait::async_trait;
use image::DynamicImage;
use thiserror::Error;

pub use describer::{Description, RateLimitedDescriber};
pub use gemini::GeminiVision;
pub use retry::RetryPolicy;

/// Description used when a diagram could not be described
pub const SENTINEL_DESCRIPTION: &str = "Error generating description.";

/// Failures of a single vision call
#[derive(Debug, Error)]
pub enum VisionError {
    /// The service asked us to slow down (HTTP 429)
    #[error("rate limited by vision service")]
    RateLimited,

    /// The service answered without any text
    #[error("vision service returned no text")]
    EmptyResponse,

    /// No credentials were configured
    #[error("vision service is not configured")]
    Unavailable,

    /// Anything else: transport, encoding, non-success status
    #[error("{0}")]
    Request(String),
}

impl VisionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, VisionError::RateLimited)
    }
}

/// Raw vision model call
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Describe an image following an instruction
    async fn describe(&self, image: &DynamicImage, instruction: &str) -> Result<String, VisionError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Infallible describer used by ingestion
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image: &DynamicImage, instruction: &str) -> Description;
}
