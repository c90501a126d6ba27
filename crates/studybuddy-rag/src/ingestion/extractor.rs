//! Content extraction: body text, inline math and diagram descriptions

use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::vision::{Description, ImageDescriber};

use super::pdf::{PdfPage, PdfReader};

/// Single-dollar inline math, e.g. `$E = mc^2$`
fn math_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$([^$]+)\$").expect("valid math regex"))
}

/// Inline math spans of one page, in encounter order, without delimiters
pub fn scan_math(text: &str) -> impl Iterator<Item = &str> {
    math_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Everything pulled out of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Page texts concatenated in page order, with no separator added
    pub body_text: String,
    /// Inline math across all pages, in encounter order
    pub math_expressions: Vec<String>,
    /// One description per embedded image, in encounter order
    pub diagram_descriptions: Vec<String>,
    /// How many of `diagram_descriptions` are the sentinel
    pub diagrams_failed: usize,
}

impl ExtractedContent {
    /// The text that gets embedded and stored
    ///
    /// Body, then newline-joined math, then newline-joined descriptions.
    pub fn combined_corpus(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.body_text,
            self.math_expressions.join("\n"),
            self.diagram_descriptions.join("\n")
        )
    }

    pub fn diagrams_described(&self) -> usize {
        self.diagram_descriptions.len() - self.diagrams_failed
    }
}

/// Turns PDF bytes into an `ExtractedContent`
pub struct ContentExtractor {
    describer: Arc<dyn ImageDescriber>,
    instruction: String,
}

impl ContentExtractor {
    pub fn new(describer: Arc<dyn ImageDescriber>, instruction: impl Into<String>) -> Self {
        Self {
            describer,
            instruction: instruction.into(),
        }
    }

    /// Read a PDF and extract its content
    ///
    /// PDF parsing runs on the blocking pool; diagrams are then described
    /// one at a time, so this takes at least one vision pacing delay per
    /// decodable image.
    pub async fn extract(&self, data: Vec<u8>) -> Result<ExtractedContent> {
        let pages = tokio::task::spawn_blocking(move || PdfReader::read(&data))
            .await
            .map_err(|e| Error::internal(format!("PDF reader task failed: {}", e)))??;

        tracing::debug!("Loaded {} pages", pages.len());
        Ok(self.extract_pages(pages).await)
    }

    /// Extract content from already loaded pages
    pub async fn extract_pages(&self, pages: Vec<PdfPage>) -> ExtractedContent {
        let mut content = ExtractedContent::default();

        for page in pages {
            content
                .math_expressions
                .extend(scan_math(&page.text).map(str::to_string));
            content.body_text.push_str(&page.text);

            for (index, image) in page.images.into_iter().enumerate() {
                let description = match image {
                    Ok(image) => self.describer.describe(&image, &self.instruction).await,
                    Err(e) => {
                        tracing::warn!(
                            "Skipping image {} on page {}: {}",
                            index + 1,
                            page.number,
                            e
                        );
                        Description::sentinel()
                    }
                };
                if description.is_sentinel {
                    content.diagrams_failed += 1;
                }
                content.diagram_descriptions.push(description.text);
            }
        }

        content
    }
}
