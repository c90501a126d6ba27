//! Persistent storage: vectors, upload registry, quiz results
//!
//! Async traits are the seams the service talks to; `SqliteStore`
//! implements all of them (and the durable `ConversationStore`) on one
//! SQLite database.

mod database;
mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::request::QuizResult;
use crate::types::{NearestMatch, StoredVector, UploadRecord};

pub use database::{cosine_distance, Database, EmbeddingPin};
pub use sqlite::SqliteStore;

/// Owner-scoped vector storage with top-1 nearest lookup
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a row; duplicates of `document_id` are allowed
    async fn put(&self, vector: StoredVector) -> Result<()>;

    /// Whether the owner has at least one row
    async fn exists(&self, owner_id: &str) -> Result<bool>;

    /// Closest row owned by `owner_id`, or `None` when the owner has no rows
    async fn nearest(&self, owner_id: &str, query: &[f32]) -> Result<Option<NearestMatch>>;

    /// Delete all rows of a document; deleting nothing is not an error
    async fn delete(&self, document_id: &str) -> Result<usize>;

    /// Delete one owner's rows of a document
    async fn delete_by_owner_document(&self, owner_id: &str, document_id: &str) -> Result<usize>;
}

/// Registry of uploaded documents
#[async_trait]
pub trait UploadRegistry: Send + Sync {
    async fn register(&self, record: UploadRecord) -> Result<()>;

    /// Uploads of an owner, oldest first
    async fn list(&self, owner_id: &str) -> Result<Vec<UploadRecord>>;

    /// Remove records by URL, returning how many were removed
    async fn remove(&self, download_url: &str) -> Result<usize>;
}

/// Write-through quiz score storage
#[async_trait]
pub trait QuizResultStore: Send + Sync {
    async fn save(&self, result: QuizResult) -> Result<()>;

    /// Results of an owner, oldest first
    async fn list(&self, owner_id: &str) -> Result<Vec<QuizResult>>;
}
