//! HTTP surface: status codes and error envelopes

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{FakeSource, Harness};
use studybuddy_rag::server::RagServer;

fn router(harness: &Harness) -> Router {
    RagServer::with_service(harness.config.clone(), harness.service.clone()).router()
}

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new(FakeSource::default(), "unused");

    let response = router(&harness)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_api_info_lists_models() {
    let harness = Harness::new(FakeSource::default(), "unused");

    let response = router(&harness)
        .oneshot(Request::builder().uri("/api/info").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let info: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info["embedding_model"], harness.config.embeddings.model.as_str());
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let harness = Harness::new(FakeSource::default(), "unused");

    for uri in [
        "/generate_vectors",
        "/check_vectors",
        "/list_user_uploads",
        "/delete_user_uploads",
        "/generate_flashcards",
        "/generate_mcqs",
        "/chat",
        "/get_chats",
        "/save_quiz_results",
    ] {
        let (status, body) = post_json(router(&harness), uri, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["type"], "validation_error", "{}", uri);
    }

    // Nothing reached the generator
    assert!(harness.generator.last_prompt().is_none());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let harness = Harness::new(FakeSource::default(), "unused");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router(&harness).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_vectors_for_new_owner() {
    let harness = Harness::new(FakeSource::default(), "unused");

    let (status, body) =
        post_json(router(&harness), "/check_vectors", json!({"user_id": "u1"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success", "exists": false}));
}

#[tokio::test]
async fn test_delete_unknown_upload_is_not_found() {
    let harness = Harness::new(FakeSource::default(), "unused");

    let (status, body) = post_json(
        router(&harness),
        "/delete_user_uploads",
        json!({"download_url": "https://files.test/storage/v1/object/public/uploads/u1/missing.pdf"}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
    assert_eq!(body["error"]["message"], "File metadata not found");
}

#[tokio::test]
async fn test_chat_reports_degradation() {
    let harness = Harness::new(FakeSource::default(), "Hello there!");

    let (status, body) = post_json(
        router(&harness),
        "/chat",
        json!({"message": "hi", "user_id": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "Hello there!");
    assert_eq!(body["degraded"], json!(["no_relevant_match"]));
}

#[tokio::test]
async fn test_unparseable_mcqs_surface_raw_output() {
    let harness = Harness::new(FakeSource::default(), "no json here");

    let (status, body) = post_json(
        router(&harness),
        "/generate_mcqs",
        json!({"topic": "cells", "user_id": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "parse_error");
    assert_eq!(body["error"]["raw_response"], "no json here");
}
