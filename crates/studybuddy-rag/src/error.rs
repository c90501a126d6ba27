//! Error types for the study assistant

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for study assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Study assistant errors
///
/// Every failure is scoped to the request that produced it. Partial
/// successes (placeholder flashcards, sentinel diagram descriptions, an
/// empty retrieval match) are not errors and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed request fields; no external call was made
    #[error("{0}")]
    Validation(String),

    /// The source document could not be downloaded
    #[error("Failed to download '{locator}': {message}")]
    UpstreamFetch { locator: String, message: String },

    /// The text generator failed
    #[error("Generation failed: {0}")]
    UpstreamGeneration(String),

    /// Structured output could not be recovered from generator text
    #[error("{message}")]
    Parse { message: String, raw: String },

    /// A user-facing delete targeted something that does not exist
    #[error("{0}")]
    NotFound(String),

    /// The downloaded bytes are not a readable document
    #[error("Failed to read document: {0}")]
    Document(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Database error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a document locator
    pub fn fetch(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamFetch {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::UpstreamGeneration(message.into())
    }

    /// Create a parse error carrying the raw generator text
    pub fn parse(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Machine-readable error kind, stable across releases
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::UpstreamFetch { .. } => "upstream_fetch_error",
            Error::UpstreamGeneration(_) => "upstream_generation_error",
            Error::Parse { .. } => "parse_error",
            Error::NotFound(_) => "not_found",
            Error::Document(_) => "document_error",
            Error::Embedding(_) => "embedding_error",
            Error::Storage(_) => "storage_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status used when this error reaches a client
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::UpstreamFetch { .. }
            | Error::UpstreamGeneration(_)
            | Error::Parse { .. }
            | Error::Embedding(_)
            | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        }

        let mut error = json!({
            "type": self.kind(),
            "message": self.to_string(),
        });
        if let Error::Parse { raw, .. } = &self {
            error["raw_response"] = json!(raw);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
