//! SQLite database for vectors, uploads, chat history and quiz results

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::request::QuizResult;
use crate::types::{ConversationTurn, NearestMatch, StoredVector, UploadRecord};

/// SQLite-backed store shared by every owner
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Embedding model the stored vectors belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingPin {
    pub model: String,
    pub dimensions: usize,
}

impl Database {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate(true)?;
        tracing::info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate(false)?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self, on_disk: bool) -> Result<()> {
        let conn = self.conn.lock();

        if on_disk {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                "#,
            )
            .map_err(|e| Error::storage(format!("Failed to set pragmas: {}", e)))?;
        }

        conn.execute_batch(
            r#"
            -- One row per ingested document per owner; re-ingestion adds rows
            CREATE TABLE IF NOT EXISTS vectors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                text_content TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_vectors_owner ON vectors(owner_id);
            CREATE INDEX IF NOT EXISTS idx_vectors_document ON vectors(document_id);

            -- Upload registry
            CREATE TABLE IF NOT EXISTS uploads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                download_url TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_uploads_owner ON uploads(owner_id);
            CREATE INDEX IF NOT EXISTS idx_uploads_url ON uploads(download_url);

            -- Durable conversation mirror
            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chats_owner_time ON chats(owner_id, created_at);

            -- Quiz results (write-through)
            CREATE TABLE IF NOT EXISTS quiz_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                correct_answers INTEGER NOT NULL,
                total_questions INTEGER NOT NULL,
                time_taken REAL NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_quiz_results_owner ON quiz_results(owner_id);

            -- Store-wide settings
            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Database migrations complete");
        Ok(())
    }

    // ==================== Embedding model pin ====================

    /// Get the embedding model recorded for this store, if any
    pub fn embedding_pin(&self) -> Result<Option<EmbeddingPin>> {
        let conn = self.conn.lock();
        let meta = |key: &str| -> Result<Option<String>> {
            Ok(conn
                .query_row(
                    "SELECT value FROM store_meta WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        };

        match (meta("embedding_model")?, meta("embedding_dimensions")?) {
            (Some(model), Some(dimensions)) => {
                let dimensions = dimensions.parse().map_err(|_| {
                    Error::storage(format!("Corrupt embedding_dimensions '{}'", dimensions))
                })?;
                Ok(Some(EmbeddingPin { model, dimensions }))
            }
            _ => Ok(None),
        }
    }

    /// Record the embedding model on first use, reject a different one later
    pub fn pin_embedding_model(&self, model: &str, dimensions: usize) -> Result<()> {
        if let Some(pin) = self.embedding_pin()? {
            if pin.model != model || pin.dimensions != dimensions {
                return Err(Error::Config(format!(
                    "Store holds vectors from '{}' ({} dims) but the configured model is '{}' ({} dims)",
                    pin.model, pin.dimensions, model, dimensions
                )));
            }
            return Ok(());
        }

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO store_meta (key, value) VALUES ('embedding_model', ?1), ('embedding_dimensions', ?2)",
            params![model, dimensions.to_string()],
        )?;
        tracing::info!("Pinned embedding model {} ({} dims)", model, dimensions);
        Ok(())
    }

    // ==================== Vectors ====================

    /// Insert a vector row (no upsert)
    pub fn insert_vector(&self, vector: &StoredVector) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO vectors (document_id, owner_id, text_content, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![
                vector.document_id,
                vector.owner_id,
                vector.text_content,
                encode_embedding(&vector.embedding),
            ],
        )?;
        Ok(())
    }

    /// Whether the owner has at least one vector
    pub fn owner_has_vectors(&self, owner_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM vectors WHERE owner_id = ?1 LIMIT 1",
                params![owner_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Closest row of one owner by cosine distance
    ///
    /// Only the owner's rows are read. Ties go to the earliest inserted row.
    pub fn nearest_vector(&self, owner_id: &str, query: &[f32]) -> Result<Option<NearestMatch>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT document_id, owner_id, text_content, embedding FROM vectors WHERE owner_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![owner_id], |row| {
            let blob: Vec<u8> = row.get(3)?;
            Ok(StoredVector {
                document_id: row.get(0)?,
                owner_id: row.get(1)?,
                text_content: row.get(2)?,
                embedding: decode_embedding(&blob),
            })
        })?;

        let mut best: Option<NearestMatch> = None;
        for row in rows {
            let vector = row?;
            if vector.embedding.len() != query.len() {
                tracing::warn!(
                    "Skipping vector of {} with {} dims (query has {})",
                    vector.document_id,
                    vector.embedding.len(),
                    query.len()
                );
                continue;
            }
            let distance = cosine_distance(&vector.embedding, query);
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(NearestMatch { vector, distance });
            }
        }

        Ok(best)
    }

    /// Delete every vector row of a document, across owners
    pub fn delete_vectors(&self, document_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(
            "DELETE FROM vectors WHERE document_id = ?1",
            params![document_id],
        )?)
    }

    /// Delete one owner's vector rows of a document
    pub fn delete_owner_document_vectors(&self, owner_id: &str, document_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(
            "DELETE FROM vectors WHERE owner_id = ?1 AND document_id = ?2",
            params![owner_id, document_id],
        )?)
    }

    // ==================== Uploads ====================

    /// Register an upload
    pub fn insert_upload(&self, record: &UploadRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO uploads (owner_id, file_name, download_url, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.owner_id,
                record.file_name,
                record.download_url,
                format_timestamp(&record.created_at),
            ],
        )?;
        Ok(())
    }

    /// Uploads of an owner, oldest first
    pub fn list_uploads(&self, owner_id: &str) -> Result<Vec<UploadRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT owner_id, file_name, download_url, created_at FROM uploads WHERE owner_id = ?1 ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![owner_id], |row| {
                Ok(UploadRecord {
                    owner_id: row.get(0)?,
                    file_name: row.get(1)?,
                    download_url: row.get(2)?,
                    created_at: parse_timestamp(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Delete upload records by URL
    pub fn delete_upload(&self, download_url: &str) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(
            "DELETE FROM uploads WHERE download_url = ?1",
            params![download_url],
        )?)
    }

    // ==================== Chats ====================

    /// Append a conversation turn
    pub fn append_chat(&self, owner_id: &str, turn: &ConversationTurn) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chats (owner_id, prompt, response, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                owner_id,
                turn.user_message,
                turn.assistant_message,
                format_timestamp(&turn.timestamp),
            ],
        )?;
        Ok(())
    }

    /// Most recent `limit` turns of an owner, oldest first
    pub fn recent_chats(&self, owner_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT prompt, response, created_at FROM chats WHERE owner_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;

        let mut turns = stmt
            .query_map(params![owner_id, limit as i64], |row| {
                Ok(ConversationTurn {
                    user_message: row.get(0)?,
                    assistant_message: row.get(1)?,
                    timestamp: parse_timestamp(&row.get::<_, String>(2)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        turns.reverse();
        Ok(turns)
    }

    /// Delete all but the `keep` most recent turns of an owner
    pub fn evict_chats(&self, owner_id: &str, keep: usize) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(
            "DELETE FROM chats WHERE owner_id = ?1 AND id NOT IN (
                SELECT id FROM chats WHERE owner_id = ?1
                ORDER BY created_at DESC, id DESC LIMIT ?2
            )",
            params![owner_id, keep as i64],
        )?)
    }

    /// Number of stored turns of an owner
    pub fn count_chats(&self, owner_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chats WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ==================== Quiz results ====================

    /// Record a quiz result
    pub fn insert_quiz_result(&self, result: &QuizResult) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO quiz_results (owner_id, topic, correct_answers, total_questions, time_taken, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.owner_id,
                result.topic,
                result.correct_answers,
                result.total_questions,
                result.time_taken,
                format_timestamp(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Quiz results of an owner, oldest first
    pub fn list_quiz_results(&self, owner_id: &str) -> Result<Vec<QuizResult>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT owner_id, topic, correct_answers, total_questions, time_taken
             FROM quiz_results WHERE owner_id = ?1 ORDER BY id",
        )?;

        let results = stmt
            .query_map(params![owner_id], |row| {
                Ok(QuizResult {
                    owner_id: row.get(0)?,
                    topic: row.get(1)?,
                    correct_answers: row.get(2)?,
                    total_questions: row.get(3)?,
                    time_taken: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(results)
    }
}

/// Little-endian f32 blob
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// 1 - cosine similarity; zero vectors are maximally distant
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Fixed-width RFC 3339 so that text order is time order
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn vector(document_id: &str, owner_id: &str, embedding: Vec<f32>) -> StoredVector {
        StoredVector::new(document_id, format!("text of {}", document_id), embedding, owner_id)
    }

    #[test]
    fn test_exists_is_owner_scoped() {
        let db = Database::in_memory().unwrap();
        db.insert_vector(&vector("doc-a", "u1", vec![1.0, 0.0])).unwrap();

        assert!(db.owner_has_vectors("u1").unwrap());
        assert!(!db.owner_has_vectors("u2").unwrap());
    }

    #[test]
    fn test_nearest_never_crosses_owners() {
        let db = Database::in_memory().unwrap();
        db.insert_vector(&vector("mine", "u1", vec![0.0, 1.0])).unwrap();
        db.insert_vector(&vector("theirs", "u2", vec![1.0, 0.0])).unwrap();

        // The query is identical to u2's row, but u1 only sees its own
        let hit = db.nearest_vector("u1", &[1.0, 0.0]).unwrap().unwrap();
        assert_eq!(hit.vector.document_id, "mine");
        assert_eq!(hit.vector.owner_id, "u1");

        assert!(db.nearest_vector("u3", &[1.0, 0.0]).unwrap().is_none());
    }

    #[test]
    fn test_nearest_picks_closest_and_first_on_tie() {
        let db = Database::in_memory().unwrap();
        db.insert_vector(&vector("far", "u1", vec![0.0, 1.0])).unwrap();
        db.insert_vector(&vector("close-1", "u1", vec![3.0, 4.0])).unwrap();
        db.insert_vector(&vector("close-2", "u1", vec![3.0, 4.0])).unwrap();

        let hit = db.nearest_vector("u1", &[0.6, 0.8]).unwrap().unwrap();
        assert_eq!(hit.vector.document_id, "close-1");
        assert!(hit.distance < 1e-5);
        assert_eq!(hit.vector.embedding, vec![3.0, 4.0]);
    }

    #[test]
    fn test_duplicate_documents_are_kept() {
        let db = Database::in_memory().unwrap();
        db.insert_vector(&vector("doc", "u1", vec![1.0])).unwrap();
        db.insert_vector(&vector("doc", "u1", vec![1.0])).unwrap();

        assert_eq!(db.delete_vectors("doc").unwrap(), 2);
        assert_eq!(db.delete_vectors("doc").unwrap(), 0);
    }

    #[test]
    fn test_owner_document_delete_leaves_other_owners() {
        let db = Database::in_memory().unwrap();
        db.insert_vector(&vector("doc", "u1", vec![1.0])).unwrap();
        db.insert_vector(&vector("doc", "u2", vec![1.0])).unwrap();

        assert_eq!(db.delete_owner_document_vectors("u1", "doc").unwrap(), 1);
        assert!(!db.owner_has_vectors("u1").unwrap());
        assert!(db.owner_has_vectors("u2").unwrap());
    }

    #[test]
    fn test_recent_chats_oldest_first_and_eviction() {
        let db = Database::in_memory().unwrap();
        let start = Utc::now();
        for i in 0..12 {
            let mut turn = ConversationTurn::new(format!("q{}", i), format!("a{}", i));
            turn.timestamp = start + Duration::seconds(i);
            db.append_chat("u1", &turn).unwrap();
        }
        db.append_chat("u2", &ConversationTurn::new("other", "owner")).unwrap();

        let recent = db.recent_chats("u1", 5).unwrap();
        let prompts: Vec<_> = recent.iter().map(|t| t.user_message.as_str()).collect();
        assert_eq!(prompts, ["q7", "q8", "q9", "q10", "q11"]);

        assert_eq!(db.evict_chats("u1", 10).unwrap(), 2);
        assert_eq!(db.count_chats("u1").unwrap(), 10);
        assert_eq!(db.recent_chats("u1", 10).unwrap()[0].user_message, "q2");
        assert_eq!(db.count_chats("u2").unwrap(), 1);
    }

    #[test]
    fn test_uploads_round_trip_and_delete() {
        let db = Database::in_memory().unwrap();
        let url = "https://x.supabase.co/storage/v1/object/public/uploads/u1/a.pdf";
        db.insert_upload(&UploadRecord::new("u1", "a.pdf", url)).unwrap();

        let uploads = db.list_uploads("u1").unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "a.pdf");
        assert!(db.list_uploads("u2").unwrap().is_empty());

        assert_eq!(db.delete_upload(url).unwrap(), 1);
        assert_eq!(db.delete_upload(url).unwrap(), 0);
    }

    #[test]
    fn test_quiz_results() {
        let db = Database::in_memory().unwrap();
        db.insert_quiz_result(&QuizResult {
            owner_id: "u1".into(),
            topic: "cells".into(),
            correct_answers: 12,
            total_questions: 15,
            time_taken: 95.5,
        })
        .unwrap();

        let results = db.list_quiz_results("u1").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].correct_answers, 12);
    }

    #[test]
    fn test_embedding_model_pin() {
        let db = Database::in_memory().unwrap();
        assert!(db.embedding_pin().unwrap().is_none());

        db.pin_embedding_model("nomic-embed-text", 768).unwrap();
        db.pin_embedding_model("nomic-embed-text", 768).unwrap();

        let err = db.pin_embedding_model("all-minilm", 384).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_pin_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        Database::new(&path)
            .unwrap()
            .pin_embedding_model("nomic-embed-text", 768)
            .unwrap();

        let reopened = Database::new(&path).unwrap();
        assert_eq!(
            reopened.embedding_pin().unwrap(),
            Some(EmbeddingPin {
                model: "nomic-embed-text".into(),
                dimensions: 768
            })
        );
        assert!(reopened.pin_embedding_model("other-model", 768).is_err());
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
