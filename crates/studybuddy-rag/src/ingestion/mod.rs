//! Document ingestion: download, PDF loading and content extraction

mod extractor;
pub mod pdf;
mod source;

pub use extractor::{scan_math, ContentExtractor, ExtractedContent};
pub use pdf::{ImageSlot, PdfPage, PdfReader};
pub use source::{DocumentSource, HttpDocumentSource};
