//! Quiz result endpoint

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QuizResultRequest, StatusResponse};

use super::parse_body;

/// POST /save_quiz_results
pub async fn save_quiz_results(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuizResultRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().save_quiz_result(request).await?))
}
