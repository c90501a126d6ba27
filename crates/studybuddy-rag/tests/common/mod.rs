//! Shared fakes for integration tests
//!
//! Every external service is replaced by an in-process double so the
//! pipeline can run without Ollama, Groq, Gemini, or the network.

#![allow(dead_code)]

pub mod pdf;

#[allow(unused_imports)]
pub use pdf::{illustrated_pdf, text_pdf, ResourcePlacement, TestImage};

use async_trait::async_trait;
use image::DynamicImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use studybuddy_rag::conversation::InMemoryConversationStore;
use studybuddy_rag::ingestion::DocumentSource;
use studybuddy_rag::providers::{EmbeddingGateway, EmbeddingProvider, TextGenerator};
use studybuddy_rag::storage::{Database, SqliteStore, UploadRegistry};
use studybuddy_rag::types::UploadRecord;
use studybuddy_rag::vision::{Description, ImageDescriber};
use studybuddy_rag::{Collaborators, Error, RagConfig, Result, StudyService};

pub const DIMENSIONS: usize = 16;

/// Serves PDFs from memory keyed by URL
#[derive(Default)]
pub struct FakeSource {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeSource {
    pub fn with(self, url: &str, data: Vec<u8>) -> Self {
        self.documents.lock().insert(url.to_string(), data);
        self
    }
}

#[async_trait]
impl DocumentSource for FakeSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        self.documents
            .lock()
            .get(locator)
            .cloned()
            .ok_or_else(|| Error::fetch(locator, "HTTP 404 Not Found"))
    }
}

/// Bag-of-words embedder: each word bumps one hashed bucket
pub struct HashingEmbedder;

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.01_f32; DIMENSIONS];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let bucket = word.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % DIMENSIONS] += 1.0;
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        "hashing"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Replies with a fixed output and records every prompt it saw
pub struct ScriptedGenerator {
    output: Mutex<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(output: &str) -> Arc<Self> {
        Arc::new(Self {
            output: Mutex::new(output.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn reply_with(&self, output: &str) {
        *self.output.lock() = output.to_string();
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.output.lock().clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Counts calls and describes every image the same way
#[derive(Default)]
pub struct CountingDescriber {
    pub calls: AtomicUsize,
}

impl CountingDescriber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDescriber for CountingDescriber {
    async fn describe(&self, _image: &DynamicImage, _instruction: &str) -> Description {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Description::described("A labelled diagram.")
    }
}

/// Upload registry whose writes always fail
pub struct RejectingRegistry;

#[async_trait]
impl UploadRegistry for RejectingRegistry {
    async fn register(&self, _record: UploadRecord) -> Result<()> {
        Err(Error::storage("upload table is read-only"))
    }

    async fn list(&self, _owner_id: &str) -> Result<Vec<UploadRecord>> {
        Ok(Vec::new())
    }

    async fn remove(&self, _download_url: &str) -> Result<usize> {
        Ok(0)
    }
}

/// A service wired to fakes, with handles to inspect them
pub struct Harness {
    pub service: Arc<StudyService>,
    pub store: Arc<SqliteStore>,
    pub generator: Arc<ScriptedGenerator>,
    pub describer: Arc<CountingDescriber>,
    pub config: RagConfig,
}

impl Harness {
    pub fn new(source: FakeSource, generator_output: &str) -> Self {
        Self::build(source, generator_output, None)
    }

    /// Like `new`, but uploads are registered through `uploads`
    pub fn with_uploads(
        source: FakeSource,
        generator_output: &str,
        uploads: Arc<dyn UploadRegistry>,
    ) -> Self {
        Self::build(source, generator_output, Some(uploads))
    }

    fn build(
        source: FakeSource,
        generator_output: &str,
        uploads: Option<Arc<dyn UploadRegistry>>,
    ) -> Self {
        let config = RagConfig::default();
        let store = Arc::new(SqliteStore::new(Database::in_memory().unwrap()));
        let generator = ScriptedGenerator::new(generator_output);
        let describer = Arc::new(CountingDescriber::default());

        let parts = Collaborators {
            source: Arc::new(source),
            describer: describer.clone(),
            gateway: EmbeddingGateway::new(Arc::new(HashingEmbedder), DIMENSIONS),
            vectors: store.clone(),
            uploads: uploads.unwrap_or_else(|| store.clone() as Arc<dyn UploadRegistry>),
            quiz_results: store.clone(),
            conversations: Arc::new(InMemoryConversationStore::new()),
            generator: generator.clone(),
        };

        Self {
            service: Arc::new(StudyService::new(parts, &config)),
            store,
            generator,
            describer,
            config,
        }
    }
}
