//! Chat, flashcard and quiz generation endpoints

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{
    ChatRequest, ChatResponse, ChatsResponse, FlashcardsResponse, McqsResponse, OwnerRequest,
    TopicRequest,
};

use super::parse_body;

/// POST /generate_flashcards
pub async fn generate_flashcards(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TopicRequest>, JsonRejection>,
) -> Result<Json<FlashcardsResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().flashcards(request).await?))
}

/// POST /generate_mcqs
pub async fn generate_mcqs(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TopicRequest>, JsonRejection>,
) -> Result<Json<McqsResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().mcqs(request).await?))
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().chat(request).await?))
}

/// POST /get_chats - Most recent turns, oldest first
pub async fn get_chats(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OwnerRequest>, JsonRejection>,
) -> Result<Json<ChatsResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().chats(request).await?))
}
