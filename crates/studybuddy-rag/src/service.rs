//! Study operations: ingestion, retrieval-grounded chat, flashcards, quizzes
//!
//! Every operation validates its request before touching a collaborator,
//! builds its own `RequestContext`, and runs inside a span carrying the
//! request id and owner.

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::config::RagConfig;
use crate::conversation::{ConversationManager, ConversationStore, InMemoryConversationStore};
use crate::error::{Error, Result};
use crate::generation::{flashcards_from_output, mcqs_from_output, PromptBuilder};
use crate::ingestion::{ContentExtractor, DocumentSource, HttpDocumentSource};
use crate::providers::{self, EmbeddingGateway, OllamaEmbedder, TextGenerator};
use crate::retrieval::{RequestContext, Retriever};
use crate::storage::{Database, QuizResultStore, SqliteStore, UploadRegistry, VectorStore};
use crate::types::request::{
    ChatRequest, DeleteUploadRequest, GenerateVectorsRequest, OwnerRequest, QuizResultRequest,
    TopicRequest,
};
use crate::types::{
    ChatResponse, ChatsResponse, Degradation, FlashcardsResponse, IngestResponse, McqsResponse,
    StatusResponse, StoredVector, UploadRecord, UploadsResponse, VectorsExistResponse,
};
use crate::vision::{GeminiVision, ImageDescriber, RateLimitedDescriber, RetryPolicy};

/// External collaborators a `StudyService` is assembled from
pub struct Collaborators {
    pub source: Arc<dyn DocumentSource>,
    pub describer: Arc<dyn ImageDescriber>,
    pub gateway: EmbeddingGateway,
    pub vectors: Arc<dyn VectorStore>,
    pub uploads: Arc<dyn UploadRegistry>,
    pub quiz_results: Arc<dyn QuizResultStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub generator: Arc<dyn TextGenerator>,
}

impl Collaborators {
    /// Real collaborators built from configuration
    ///
    /// Opens the SQLite store and pins the embedding model in it.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let db = Database::new(&config.storage.database_path)?;
        db.pin_embedding_model(&config.embeddings.model, config.embeddings.dimensions)?;
        let store = Arc::new(SqliteStore::new(db));

        let embedder = Arc::new(OllamaEmbedder::new(&config.embeddings)?);
        let gateway = EmbeddingGateway::new(embedder, config.embeddings.dimensions);

        let vision = Arc::new(GeminiVision::new(&config.vision)?);
        let describer = Arc::new(RateLimitedDescriber::new(
            vision,
            RetryPolicy::from(&config.vision),
        ));

        let conversations: Arc<dyn ConversationStore> = if config.conversation.durable {
            store.clone()
        } else {
            Arc::new(InMemoryConversationStore::new())
        };

        Ok(Self {
            source: Arc::new(HttpDocumentSource::new(Duration::from_secs(
                config.server.fetch_timeout_secs,
            ))?),
            describer,
            gateway,
            vectors: store.clone(),
            uploads: store.clone(),
            quiz_results: store,
            conversations,
            generator: providers::text_generator(&config.llm)?,
        })
    }
}

/// The study assistant
pub struct StudyService {
    source: Arc<dyn DocumentSource>,
    extractor: ContentExtractor,
    gateway: EmbeddingGateway,
    vectors: Arc<dyn VectorStore>,
    uploads: Arc<dyn UploadRegistry>,
    quiz_results: Arc<dyn QuizResultStore>,
    conversations: ConversationManager,
    retriever: Retriever,
    generator: Arc<dyn TextGenerator>,
    flashcard_count: usize,
    mcq_count: usize,
}

impl StudyService {
    pub fn new(parts: Collaborators, config: &RagConfig) -> Self {
        Self {
            extractor: ContentExtractor::new(parts.describer, config.vision.instruction.clone()),
            retriever: Retriever::new(
                parts.gateway.clone(),
                parts.vectors.clone(),
                config.study.context_max_chars,
            ),
            conversations: ConversationManager::new(parts.conversations, &config.conversation),
            source: parts.source,
            gateway: parts.gateway,
            vectors: parts.vectors,
            uploads: parts.uploads,
            quiz_results: parts.quiz_results,
            generator: parts.generator,
            flashcard_count: config.study.flashcard_count,
            mcq_count: config.study.mcq_count,
        }
    }

    /// Build the service with real collaborators
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self::new(Collaborators::from_config(config)?, config))
    }

    pub fn gateway(&self) -> &EmbeddingGateway {
        &self.gateway
    }

    pub fn generator(&self) -> &Arc<dyn TextGenerator> {
        &self.generator
    }

    /// Download, extract, embed and store one document for an owner
    ///
    /// Slow for documents with many diagrams: each vision call is paced.
    pub async fn ingest(&self, request: GenerateVectorsRequest) -> Result<IngestResponse> {
        let command = request.validate()?;
        let ctx = RequestContext::new(&command.owner_id);

        async {
            tracing::info!("Ingesting {}", command.locator);

            let data = self.source.fetch(&command.locator).await?;
            let content = self.extractor.extract(data).await?;
            let corpus = content.combined_corpus();

            tracing::info!(
                "Extracted {} chars, {} math expressions, {} diagrams ({} failed)",
                corpus.chars().count(),
                content.math_expressions.len(),
                content.diagram_descriptions.len(),
                content.diagrams_failed
            );

            let embedding = self.gateway.embed(&corpus).await?;
            self.vectors
                .put(StoredVector::new(
                    command.locator.clone(),
                    corpus.clone(),
                    embedding,
                    ctx.owner_id.clone(),
                ))
                .await?;

            let file_name = command
                .file_name
                .clone()
                .unwrap_or_else(|| UploadRecord::file_name_from_locator(&command.locator));
            if let Err(e) = self
                .uploads
                .register(UploadRecord::new(
                    ctx.owner_id.clone(),
                    file_name,
                    command.locator.clone(),
                ))
                .await
            {
                tracing::error!("Upload registration failed, removing stored vectors: {}", e);
                if let Err(cleanup) = self
                    .vectors
                    .delete_by_owner_document(&ctx.owner_id, &command.locator)
                    .await
                {
                    tracing::error!("Could not remove vectors of {}: {}", command.locator, cleanup);
                }
                return Err(e);
            }

            let mut degraded = Vec::new();
            if content.diagrams_failed > 0 {
                tracing::warn!("{} diagrams got a sentinel description", content.diagrams_failed);
                degraded.push(Degradation::DiagramDescriptionFailed);
            }

            tracing::info!("Stored vectors for {}", command.locator);
            Ok(IngestResponse {
                status: "success".to_string(),
                message: "Vectors generated and stored successfully".to_string(),
                document_id: command.locator.clone(),
                corpus_chars: corpus.chars().count(),
                math_expressions: content.math_expressions.len(),
                diagrams_described: content.diagrams_described(),
                diagrams_failed: content.diagrams_failed,
                degraded,
            })
        }
        .instrument(ctx.span("ingest"))
        .await
    }

    /// Whether the owner has any stored document
    pub async fn vectors_exist(&self, request: OwnerRequest) -> Result<VectorsExistResponse> {
        let owner_id = request.validate()?;
        let exists = self.vectors.exists(&owner_id).await?;
        Ok(VectorsExistResponse {
            status: "success".to_string(),
            exists,
        })
    }

    /// Flashcards grounded in the owner's nearest document
    pub async fn flashcards(&self, request: TopicRequest) -> Result<FlashcardsResponse> {
        let command = request.validate()?;
        let mut ctx = RequestContext::new(&command.owner_id);
        let span = ctx.span("flashcards");

        async {
            let retrieved = self.retriever.retrieve(&mut ctx, &command.topic).await?;
            let prompt =
                PromptBuilder::flashcard_prompt(&retrieved.content, &command.topic, self.flashcard_count);
            let raw = self.complete(&prompt).await?;

            let (flashcards, placeholder) = flashcards_from_output(&raw);

            let mut degraded = Vec::new();
            if retrieved.is_fallback() {
                degraded.push(Degradation::NoRelevantMatch);
            }
            if placeholder {
                degraded.push(Degradation::PlaceholderFlashcards);
            }

            tracing::info!("Generated {} flashcards on '{}'", flashcards.len(), command.topic);
            Ok(FlashcardsResponse {
                flashcards,
                degraded,
            })
        }
        .instrument(span)
        .await
    }

    /// Multiple-choice questions grounded in the owner's nearest document
    ///
    /// Fails when no valid question can be recovered.
    pub async fn mcqs(&self, request: TopicRequest) -> Result<McqsResponse> {
        let command = request.validate()?;
        let mut ctx = RequestContext::new(&command.owner_id);
        let span = ctx.span("mcqs");

        async {
            let retrieved = self.retriever.retrieve(&mut ctx, &command.topic).await?;
            let prompt = PromptBuilder::mcq_prompt(&retrieved.content, &command.topic, self.mcq_count);
            let raw = self.complete(&prompt).await?;

            let mcqs = mcqs_from_output(&raw).map_err(|e| {
                tracing::error!("MCQ extraction failed: {}", e);
                e
            })?;

            let mut degraded = Vec::new();
            if retrieved.is_fallback() {
                degraded.push(Degradation::NoRelevantMatch);
            }

            tracing::info!("Generated {} MCQs on '{}'", mcqs.len(), command.topic);
            Ok(McqsResponse { mcqs, degraded })
        }
        .instrument(span)
        .await
    }

    /// Answer a message using the nearest document and recent history
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let command = request.validate()?;
        let mut ctx = RequestContext::new(&command.owner_id);
        let span = ctx.span("chat");

        async {
            let retrieved = self.retriever.retrieve(&mut ctx, &command.message).await?;
            let transcript = self.conversations.transcript(&ctx.owner_id).await?;
            let prompt =
                PromptBuilder::chat_prompt(&retrieved.content, &transcript, &command.message);

            let output = self.complete(&prompt).await?;
            self.conversations
                .append(&ctx.owner_id, &command.message, &output)
                .await?;

            let mut degraded = Vec::new();
            if retrieved.is_fallback() {
                degraded.push(Degradation::NoRelevantMatch);
            }
            Ok(ChatResponse { output, degraded })
        }
        .instrument(span)
        .await
    }

    /// The turns a chat prompt would see, oldest first
    pub async fn chats(&self, request: OwnerRequest) -> Result<ChatsResponse> {
        let owner_id = request.validate()?;
        let chats = self.conversations.prompt_turns(&owner_id).await?;
        Ok(ChatsResponse { chats })
    }

    /// Record a finished quiz
    pub async fn save_quiz_result(&self, request: QuizResultRequest) -> Result<StatusResponse> {
        let result = request.validate()?;
        tracing::info!(
            owner_id = %result.owner_id,
            "Quiz on '{}': {}/{}",
            result.topic,
            result.correct_answers,
            result.total_questions
        );
        self.quiz_results.save(result).await?;
        Ok(StatusResponse::success("Quiz results saved successfully"))
    }

    /// Uploads registered for an owner
    pub async fn list_uploads(&self, request: OwnerRequest) -> Result<UploadsResponse> {
        let owner_id = request.validate()?;
        let uploads = self
            .uploads
            .list(&owner_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(UploadsResponse {
            status: "success".to_string(),
            uploads,
        })
    }

    /// Delete an upload and the vectors ingested from it
    ///
    /// An unknown URL is `NotFound` and leaves the vector store untouched.
    pub async fn delete_upload(&self, request: DeleteUploadRequest) -> Result<StatusResponse> {
        let command = request.validate()?;
        tracing::info!("Deleting upload {}", command.relative_path);

        let removed = self.uploads.remove(&command.download_url).await?;
        if removed == 0 {
            return Err(Error::not_found("File metadata not found"));
        }

        let vectors_removed = match &command.owner_id {
            Some(owner_id) => {
                self.vectors
                    .delete_by_owner_document(owner_id, &command.download_url)
                    .await?
            }
            None => self.vectors.delete(&command.download_url).await?,
        };

        tracing::info!(
            "Deleted {} upload records and {} vectors for {}",
            removed,
            vectors_removed,
            command.relative_path
        );
        Ok(StatusResponse::success("File and associated data deleted successfully"))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let raw = self.generator.complete(prompt).await.map_err(|e| {
            tracing::error!("{} failed: {}", self.generator.name(), e);
            if matches!(e, Error::UpstreamGeneration(_)) {
                e
            } else {
                Error::generation(e.to_string())
            }
        })?;
        tracing::debug!("Generator output: {}", raw);
        Ok(raw)
    }
}
