//! Configuration for the study assistant

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Text generator configuration
    pub llm: LlmConfig,
    /// Vision model configuration
    pub vision: VisionConfig,
    /// Conversation history configuration
    pub conversation: ConversationConfig,
    /// Flashcard / quiz generation configuration
    pub study: StudyConfig,
    /// Database configuration
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup("STUDYBUDDY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("STUDYBUDDY_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = lookup("STUDYBUDDY_DATABASE") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("STUDYBUDDY_EMBED_URL") {
            self.embeddings.base_url = url;
        }
        if let Some(model) = lookup("STUDYBUDDY_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(url) = lookup("STUDYBUDDY_LLM_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("STUDYBUDDY_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.vision.api_key = Some(key);
        }
        self
    }

    /// Reject configurations that would break a pipeline invariant
    pub fn validate(&self) -> Result<()> {
        if self.embeddings.model.trim().is_empty() {
            return Err(Error::Config("embeddings.model must be set".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.conversation.prompt_turns == 0 || self.conversation.retention_cap == 0 {
            return Err(Error::Config(
                "conversation caps must be greater than zero".to_string(),
            ));
        }
        if self.conversation.prompt_turns > self.conversation.retention_cap {
            return Err(Error::Config(format!(
                "conversation.prompt_turns ({}) exceeds retention_cap ({})",
                self.conversation.prompt_turns, self.conversation.retention_cap
            )));
        }
        if self.study.flashcard_count == 0 || self.study.mcq_count == 0 {
            return Err(Error::Config("study item counts must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum JSON body size in bytes
    pub max_body_size: usize,
    /// Timeout for downloading a source document
    pub fetch_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
            fetch_timeout_secs: 120,
        }
    }
}

/// Embedding configuration
///
/// `model` is the one embedding model identity for the whole system.
/// Ingestion and query both go through the gateway built from it, and the
/// vector store pins it on first open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL serving the embedding model
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (768 for all-mpnet-base-v2 / nomic-embed-text)
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Text generator backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Any `/v1/chat/completions` endpoint (Groq, OpenAI, vLLM)
    OpenaiCompatible,
}

/// Text generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which client to use
    pub backend: LlmBackend,
    /// Base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Bearer token (OpenAI-compatible backends only)
    pub api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            api_key: None,
            temperature: 0.3,
            timeout_secs: 120,
        }
    }
}

/// Vision model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Generative Language API base URL
    pub base_url: String,
    /// Vision model name
    pub model: String,
    /// API key; without one every diagram gets the sentinel description
    pub api_key: Option<String>,
    /// Pause after every vision call, whatever its outcome
    pub inter_call_delay_ms: u64,
    /// Pause before retrying a rate-limited call
    pub rate_limit_backoff_ms: u64,
    /// Retries after a rate-limit signal
    pub max_retries: u32,
    /// Instruction sent with every diagram
    pub instruction: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            inter_call_delay_ms: 1000,
            rate_limit_backoff_ms: 5000,
            max_retries: 1,
            instruction: "Describe the diagram and explain what it represents.".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Mirror history into SQLite so it survives restarts
    pub durable: bool,
    /// Turns rendered into a chat prompt
    pub prompt_turns: usize,
    /// Turns retained per owner
    pub retention_cap: usize,
    /// Character budget of the rendered transcript
    pub transcript_max_chars: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            durable: true,
            prompt_turns: 5,
            retention_cap: 10,
            transcript_max_chars: 2000,
        }
    }
}

/// Flashcard / quiz generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Flashcards requested per call
    pub flashcard_count: usize,
    /// MCQs requested per call
    pub mcq_count: usize,
    /// Maximum characters of retrieved document text put into a prompt
    pub context_max_chars: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            flashcard_count: 10,
            mcq_count: 15,
            context_max_chars: 12_000,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding vectors, uploads, chats and quiz results
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studybuddy")
            .join("studybuddy.db");

        Self { database_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = RagConfig::default();
        assert_eq!(config.conversation.prompt_turns, 5);
        assert_eq!(config.conversation.retention_cap, 10);
        assert_eq!(config.conversation.transcript_max_chars, 2000);
        assert_eq!(config.vision.inter_call_delay_ms, 1000);
        assert_eq!(config.vision.rate_limit_backoff_ms, 5000);
        assert_eq!(config.vision.max_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml(
            r#"
            [server]
            port = 9000

            [llm]
            backend = "openai_compatible"
            base_url = "https://api.groq.com/openai"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.backend, LlmBackend::OpenaiCompatible);
        assert_eq!(config.embeddings.model, "nomic-embed-text");
    }

    #[test]
    fn test_env_overrides() {
        let config = RagConfig::default().with_overrides(|key| match key {
            "STUDYBUDDY_PORT" => Some("7000".to_string()),
            "GEMINI_API_KEY" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.vision.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_validate_rejects_inverted_caps() {
        let mut config = RagConfig::default();
        config.conversation.prompt_turns = 20;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
