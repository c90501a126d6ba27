//! Generated study items
//!
//! Items are produced per request and never persisted.

use serde::{Deserialize, Serialize};

/// Number of options every multiple-choice question must carry
pub const MCQ_OPTION_COUNT: usize = 4;

/// A question/answer flashcard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Concise question or keyword
    pub front: String,
    /// Short explanation or answer
    pub back: String,
}

impl Flashcard {
    /// Placeholder returned when no valid flashcards could be recovered
    pub fn placeholder() -> Self {
        Self {
            front: "No valid flashcards generated.".to_string(),
            back: String::new(),
        }
    }
}

/// A multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl Mcq {
    /// Exactly four options, and the answer is literally one of them
    pub fn is_valid(&self) -> bool {
        self.options.len() == MCQ_OPTION_COUNT && self.options.contains(&self.correct_answer)
    }
}
