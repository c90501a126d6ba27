//! Async store implementations over the SQLite database

use async_trait::async_trait;

use crate::conversation::ConversationStore;
use crate::error::{Error, Result};
use crate::types::request::QuizResult;
use crate::types::{ConversationTurn, NearestMatch, StoredVector, UploadRecord};

use super::database::Database;
use super::{QuizResultStore, UploadRegistry, VectorStore};

/// SQLite-backed store; every call runs on the blocking pool
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn put(&self, vector: StoredVector) -> Result<()> {
        self.blocking(move |db| db.insert_vector(&vector)).await
    }

    async fn exists(&self, owner_id: &str) -> Result<bool> {
        let owner_id = owner_id.to_string();
        self.blocking(move |db| db.owner_has_vectors(&owner_id)).await
    }

    async fn nearest(&self, owner_id: &str, query: &[f32]) -> Result<Option<NearestMatch>> {
        let owner_id = owner_id.to_string();
        let query = query.to_vec();
        self.blocking(move |db| db.nearest_vector(&owner_id, &query))
            .await
    }

    async fn delete(&self, document_id: &str) -> Result<usize> {
        let document_id = document_id.to_string();
        self.blocking(move |db| db.delete_vectors(&document_id)).await
    }

    async fn delete_by_owner_document(&self, owner_id: &str, document_id: &str) -> Result<usize> {
        let owner_id = owner_id.to_string();
        let document_id = document_id.to_string();
        self.blocking(move |db| db.delete_owner_document_vectors(&owner_id, &document_id))
            .await
    }
}

#[async_trait]
impl UploadRegistry for SqliteStore {
    async fn register(&self, record: UploadRecord) -> Result<()> {
        self.blocking(move |db| db.insert_upload(&record)).await
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<UploadRecord>> {
        let owner_id = owner_id.to_string();
        self.blocking(move |db| db.list_uploads(&owner_id)).await
    }

    async fn remove(&self, download_url: &str) -> Result<usize> {
        let download_url = download_url.to_string();
        self.blocking(move |db| db.delete_upload(&download_url)).await
    }
}

#[async_trait]
impl QuizResultStore for SqliteStore {
    async fn save(&self, result: QuizResult) -> Result<()> {
        self.blocking(move |db| db.insert_quiz_result(&result)).await
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<QuizResult>> {
        let owner_id = owner_id.to_string();
        self.blocking(move |db| db.list_quiz_results(&owner_id)).await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append(&self, owner_id: &str, turn: ConversationTurn) -> Result<()> {
        let owner_id = owner_id.to_string();
        self.blocking(move |db| db.append_chat(&owner_id, &turn)).await
    }

    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let owner_id = owner_id.to_string();
        self.blocking(move |db| db.recent_chats(&owner_id, limit)).await
    }

    async fn evict_beyond(&self, owner_id: &str, keep: usize) -> Result<usize> {
        let owner_id = owner_id.to_string();
        self.blocking(move |db| db.evict_chats(&owner_id, keep)).await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversationConfig;
    use crate::conversation::ConversationManager;
    use std::sync::Arc;

    fn store() -> SqliteStore {
        SqliteStore::new(Database::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_vector_store_contract() {
        let store = store();
        store
            .put(StoredVector::new("doc", "photosynthesis", vec![1.0, 0.0], "u1"))
            .await
            .unwrap();

        assert!(store.exists("u1").await.unwrap());
        assert!(!store.exists("u2").await.unwrap());
        assert!(store.nearest("u2", &[1.0, 0.0]).await.unwrap().is_none());

        let hit = store.nearest("u1", &[0.9, 0.1]).await.unwrap().unwrap();
        assert_eq!(hit.vector.text_content, "photosynthesis");

        assert_eq!(store.delete("missing").await.unwrap(), 0);
        assert_eq!(store.delete_by_owner_document("u1", "doc").await.unwrap(), 1);
        assert!(!store.exists("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_durable_history_respects_cap() {
        let store = Arc::new(store());
        let manager = ConversationManager::new(store.clone(), &ConversationConfig::default());

        for i in 0..11 {
            manager.append("u1", &format!("q{}", i), "a").await.unwrap();
        }

        assert_eq!(store.database().count_chats("u1").unwrap(), 10);
        let recent = manager.prompt_turns("u1").await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent.last().unwrap().user_message, "q10");
    }

    #[tokio::test]
    async fn test_upload_registry() {
        let store = store();
        store
            .register(UploadRecord::new("u1", "a.pdf", "https://h/uploads/u1/a.pdf"))
            .await
            .unwrap();

        assert_eq!(UploadRegistry::list(&store, "u1").await.unwrap().len(), 1);
        assert_eq!(store.remove("https://h/uploads/u1/a.pdf").await.unwrap(), 1);
        assert!(UploadRegistry::list(&store, "u1").await.unwrap().is_empty());
    }
}
