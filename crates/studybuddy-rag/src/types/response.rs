//! Response bodies
//!
//! Successful responses carry a `degraded` list when part of the result is
//! a placeholder rather than a genuine answer, so that "nothing found" is
//! never confused with "request failed".

use serde::{Deserialize, Serialize};

use super::conversation::ConversationTurn;
use super::study::{Flashcard, Mcq};
use super::vector::UploadRecord;

/// A non-error partial outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// The owner has no stored vectors; the prompt used the fallback marker
    NoRelevantMatch,
    /// No valid flashcards were recovered; a placeholder card was returned
    PlaceholderFlashcards,
    /// At least one diagram got a sentinel description
    DiagramDescriptionFailed,
}

/// Generic `{status, message}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// POST /generate_vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    /// Locator stored as the row's document id
    pub document_id: String,
    /// Characters in the combined corpus
    pub corpus_chars: usize,
    pub math_expressions: usize,
    pub diagrams_described: usize,
    pub diagrams_failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

/// POST /check_vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorsExistResponse {
    pub status: String,
    pub exists: bool,
}

/// POST /generate_flashcards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardsResponse {
    pub flashcards: Vec<Flashcard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

/// POST /generate_mcqs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqsResponse {
    pub mcqs: Vec<Mcq>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

/// POST /chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

/// POST /get_chats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatsResponse {
    /// Most recent turns, oldest first
    pub chats: Vec<ConversationTurn>,
}

/// One entry of POST /list_user_uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub name: String,
    pub download_url: String,
}

impl From<UploadRecord> for UploadSummary {
    fn from(record: UploadRecord) -> Self {
        Self {
            name: record.file_name,
            download_url: record.download_url,
        }
    }
}

/// POST /list_user_uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsResponse {
    pub status: String,
    pub uploads: Vec<UploadSummary>,
}
