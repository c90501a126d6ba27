//! Text generator trait

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt completion
///
/// No retry or rate limiting happens at this seam: a failed completion
/// fails the request that asked for it.
///
/// Implementations:
/// - `OllamaGenerator`: Local Ollama server
/// - `OpenAiCompatGenerator`: Groq or any `/v1/chat/completions` endpoint
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
