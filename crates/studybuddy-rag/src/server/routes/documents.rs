//! Document ingestion and upload management endpoints

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{
    CheckVectorsRequest, DeleteUploadRequest, GenerateVectorsRequest, IngestResponse,
    OwnerRequest, StatusResponse, UploadsResponse, VectorsExistResponse,
};

use super::parse_body;

/// POST /generate_vectors - Ingest a document
///
/// Blocks until the document is stored; diagram-heavy PDFs take a while.
pub async fn generate_vectors(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateVectorsRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().ingest(request).await?))
}

/// POST /check_vectors - Whether the user has any stored document
pub async fn check_vectors(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CheckVectorsRequest>, JsonRejection>,
) -> Result<Json<VectorsExistResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().vectors_exist(request).await?))
}

/// POST /list_user_uploads
pub async fn list_user_uploads(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OwnerRequest>, JsonRejection>,
) -> Result<Json<UploadsResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().list_uploads(request).await?))
}

/// POST /delete_user_uploads
pub async fn delete_user_uploads(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DeleteUploadRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>> {
    let request = parse_body(payload)?;
    Ok(Json(state.service().delete_upload(request).await?))
}
