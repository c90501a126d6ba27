//! Prompt assembly and structured-output recovery

pub mod prompt;
pub mod structured;

pub use prompt::PromptBuilder;
pub use structured::{
    extract, flashcards_from_output, mcqs_from_output, ExtractionError, ExtractionStage,
    Extraction, StructuredItem,
};
