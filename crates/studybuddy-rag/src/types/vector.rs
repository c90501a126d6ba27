//! Stored document vectors and upload records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per ingested document per owner
///
/// Created on successful ingestion and never updated; the only mutation is
/// full deletion when the source upload is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    /// Canonical locator of the source document (its download URL)
    pub document_id: String,
    /// Flattened extraction that produced the embedding
    pub text_content: String,
    /// Embedding of `text_content`
    pub embedding: Vec<f32>,
    /// Owner scoping every read, write and delete
    pub owner_id: String,
}

impl StoredVector {
    /// Create a new row
    pub fn new(
        document_id: impl Into<String>,
        text_content: impl Into<String>,
        embedding: Vec<f32>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            text_content: text_content.into(),
            embedding,
            owner_id: owner_id.into(),
        }
    }
}

/// Result of a nearest-neighbor lookup
#[derive(Debug, Clone)]
pub struct NearestMatch {
    /// The closest row
    pub vector: StoredVector,
    /// Cosine distance to the query (0.0 = identical direction)
    pub distance: f32,
}

/// A registered upload belonging to an owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Owner of the upload
    pub owner_id: String,
    /// Display name
    pub file_name: String,
    /// Unique download URL, also the `document_id` of its vectors
    pub download_url: String,
    /// When the upload was registered
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Create a record stamped with the current time
    pub fn new(
        owner_id: impl Into<String>,
        file_name: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            file_name: file_name.into(),
            download_url: download_url.into(),
            created_at: Utc::now(),
        }
    }

    /// Derive a display name from the last path segment of a locator
    pub fn file_name_from_locator(locator: &str) -> String {
        let path = locator.split(['?', '#']).next().unwrap_or(locator);
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("document.pdf")
            .to_string()
    }
}
