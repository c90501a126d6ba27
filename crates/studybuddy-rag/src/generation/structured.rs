//! Recovering validated study items from free-form generator output
//!
//! Extraction walks through explicit stages, each with its own failure:
//!
//! ```text
//! Raw -> FenceStripped -> CandidateLocated -> Parsed -> Validated
//! ```
//!
//! Locating a candidate never fails (without a match the whole stripped
//! text is the candidate); parsing fails on malformed JSON or a non-array;
//! validation fails when no item survives.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

use crate::error::Error;
use crate::types::{Flashcard, Mcq};

/// The fallible transition an extraction stopped at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// CandidateLocated -> Parsed
    Parse,
    /// Parsed -> Validated
    Validate,
}

/// Why an extraction stopped
#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("Failed to parse LLM response as valid JSON: {0}")]
    InvalidJson(String),

    #[error("LLM response is not a JSON array")]
    NotAnArray,

    #[error("No valid {0} found in the response")]
    NoValidItems(&'static str),
}

impl ExtractionError {
    pub fn stage(&self) -> ExtractionStage {
        match self {
            ExtractionError::InvalidJson(_) | ExtractionError::NotAnArray => {
                ExtractionStage::Parse
            }
            ExtractionError::NoValidItems(_) => ExtractionStage::Validate,
        }
    }
}

/// An item type the extractor can validate
pub trait StructuredItem: DeserializeOwned {
    /// Plural name used in messages
    const KIND: &'static str;

    /// Whether the item satisfies its invariants
    fn is_valid(&self) -> bool;

    /// Key two items are duplicates under
    fn dedup_key(&self) -> String;
}

impl StructuredItem for Flashcard {
    const KIND: &'static str = "flashcards";

    fn is_valid(&self) -> bool {
        !self.front.trim().is_empty()
    }

    fn dedup_key(&self) -> String {
        self.front.trim().to_lowercase()
    }
}

impl StructuredItem for Mcq {
    const KIND: &'static str = "MCQs";

    fn is_valid(&self) -> bool {
        Mcq::is_valid(self) && !self.question.trim().is_empty()
    }

    fn dedup_key(&self) -> String {
        self.question.trim().to_lowercase()
    }
}

/// Items that survived validation
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub items: Vec<T>,
    /// Elements dropped as malformed, invalid or duplicate
    pub dropped: usize,
}

/// Raw -> FenceStripped
pub fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]").expect("Invalid regex"))
}

/// FenceStripped -> CandidateLocated
///
/// Greedy: from the first `[{` to the last `}]`, dropping surrounding prose.
pub fn locate_candidate(stripped: &str) -> &str {
    array_pattern()
        .find(stripped)
        .map(|m| m.as_str())
        .unwrap_or(stripped)
}

/// CandidateLocated -> Parsed
pub fn parse_candidate(candidate: &str) -> Result<Vec<Value>, ExtractionError> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(elements)) => Ok(elements),
        Ok(_) => Err(ExtractionError::NotAnArray),
        Err(e) => Err(ExtractionError::InvalidJson(e.to_string())),
    }
}

/// Parsed -> Validated
///
/// Drops elements that do not deserialize, break an invariant, or repeat
/// an earlier item. Never corrects an item.
pub fn validate_items<T: StructuredItem>(
    elements: Vec<Value>,
) -> Result<Extraction<T>, ExtractionError> {
    let total = elements.len();
    let mut seen = HashSet::new();
    let items: Vec<T> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value::<T>(element).ok())
        .filter(|item| item.is_valid())
        .filter(|item| seen.insert(item.dedup_key()))
        .collect();

    if items.is_empty() {
        return Err(ExtractionError::NoValidItems(T::KIND));
    }

    Ok(Extraction {
        dropped: total - items.len(),
        items,
    })
}

/// Run every stage on raw generator text
pub fn extract<T: StructuredItem>(raw: &str) -> Result<Extraction<T>, ExtractionError> {
    let stripped = strip_fences(raw);
    let candidate = locate_candidate(&stripped);
    let elements = parse_candidate(candidate)?;
    validate_items(elements)
}

/// Flashcards, falling back to a single placeholder card
///
/// Returns the cards and whether the placeholder was used.
pub fn flashcards_from_output(raw: &str) -> (Vec<Flashcard>, bool) {
    match extract::<Flashcard>(raw) {
        Ok(extraction) => {
            if extraction.dropped > 0 {
                tracing::debug!("Dropped {} flashcards", extraction.dropped);
            }
            (extraction.items, false)
        }
        Err(e) => {
            tracing::warn!("Returning placeholder flashcard: {}", e);
            (vec![Flashcard::placeholder()], true)
        }
    }
}

/// MCQs; any failure is an `Error::Parse` carrying the raw text
pub fn mcqs_from_output(raw: &str) -> crate::error::Result<Vec<Mcq>> {
    match extract::<Mcq>(raw) {
        Ok(extraction) => {
            if extraction.dropped > 0 {
                tracing::debug!("Dropped {} MCQs", extraction.dropped);
            }
            Ok(extraction.items)
        }
        Err(e) => Err(Error::parse(e.to_string(), raw)),
    }
}
