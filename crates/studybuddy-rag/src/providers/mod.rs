//! Provider abstractions for embeddings and text generation
//!
//! Trait-based so the pipeline can run against Ollama, Groq, or in-process
//! fakes without changing call sites.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai_compat;

use std::sync::Arc;

use crate::config::{LlmBackend, LlmConfig};
use crate::error::Result;

pub use embedding::{EmbeddingGateway, EmbeddingProvider};
pub use llm::TextGenerator;
pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use openai_compat::OpenAiCompatGenerator;

/// Build the configured text generator
pub fn text_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    Ok(match config.backend {
        LlmBackend::Ollama => Arc::new(OllamaGenerator::new(config)?),
        LlmBackend::OpenaiCompatible => Arc::new(OpenAiCompatGenerator::new(config)?),
    })
}
