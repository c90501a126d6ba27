//! studybuddy-rag: a study assistant grounded in the user's own documents
//!
//! PDFs are flattened into one corpus (body text, inline math, diagram
//! descriptions from a vision model), embedded, and stored per owner.
//! Chat, flashcard and quiz requests retrieve the owner's nearest document
//! and ground the generator's prompt in it; flashcard and quiz output is
//! recovered into validated structured items.

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;
pub mod vision;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use service::{Collaborators, StudyService};
pub use types::{ConversationTurn, Flashcard, Mcq, StoredVector};
