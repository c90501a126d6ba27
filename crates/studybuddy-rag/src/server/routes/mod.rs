//! API routes for the study server

pub mod documents;
pub mod quiz;
pub mod study;

use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post},
    Json, Router,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Build all study routes
pub fn study_routes() -> Router<AppState> {
    Router::new()
        // Documents
        .route("/generate_vectors", post(documents::generate_vectors))
        .route("/check_vectors", post(documents::check_vectors))
        .route("/list_user_uploads", post(documents::list_user_uploads))
        .route("/delete_user_uploads", post(documents::delete_user_uploads))
        // Study
        .route("/generate_flashcards", post(study::generate_flashcards))
        .route("/generate_mcqs", post(study::generate_mcqs))
        .route("/chat", post(study::chat))
        .route("/get_chats", post(study::get_chats))
        // Quiz
        .route("/save_quiz_results", post(quiz::save_quiz_results))
        // Info
        .route("/api/info", get(info))
}

/// Unwrap a JSON body, reporting a malformed one as a validation error
pub(crate) fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| Error::validation(format!("Invalid JSON body: {}", e.body_text())))
}

/// API info endpoint
async fn info(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "studybuddy-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Study assistant grounded in uploaded documents",
        "embedding_model": config.embeddings.model,
        "embedding_dimensions": config.embeddings.dimensions,
        "generator_model": config.llm.model,
        "vision_model": config.vision.model,
        "endpoints": {
            "POST /generate_vectors": "Ingest a document for a user",
            "POST /check_vectors": "Whether a user has ingested documents",
            "POST /list_user_uploads": "List a user's uploads",
            "POST /delete_user_uploads": "Delete an upload and its vectors",
            "POST /generate_flashcards": "Flashcards on a topic",
            "POST /generate_mcqs": "Multiple-choice quiz on a topic",
            "POST /chat": "Chat grounded in the user's documents",
            "POST /get_chats": "Recent chat history",
            "POST /save_quiz_results": "Record a quiz score",
            "GET /health": "Liveness"
        }
    }))
}
