//! Integration tests for `POST /search` through the full router.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use toolscout_integration_tests::TestPipeline;
use toolscout_server::middleware::REQUEST_ID_HEADER;
use toolscout_server::router;
use toolscout_server::state::AppState;
use tower::ServiceExt;

fn app() -> axum::Router {
    let (pipeline, _) = TestPipeline::new().build();
    router(AppState::new(pipeline))
}

fn search_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn test_search_returns_camel_case_output() {
    let response = app()
        .oneshot(search_request(&json!({ "query": "free cli tools", "limit": 3 })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let candidates = body["candidates"].as_array().expect("candidates");
    assert!(!candidates.is_empty());
    assert!(candidates.len() <= 3);
    assert_eq!(candidates[0]["id"], "aider");
    assert!(candidates[0]["score"].is_number());
    assert!(candidates[0]["metadata"]["name"].is_string());

    let stats = &body["executionStats"];
    assert!(stats["vectorQueriesExecuted"].as_u64().is_some_and(|n| n >= 2));
    assert!(stats["terminalState"].is_string());
    assert!(stats["latencyMs"].is_number());
    assert!(body["confidence"].is_number());
}

#[tokio::test]
async fn test_default_limit_applies() {
    let response = app()
        .oneshot(search_request(&json!({ "query": "code editor" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let count = body["candidates"].as_array().map_or(0, Vec::len);
    assert!(count > 0 && count <= 20);
}

#[tokio::test]
async fn test_out_of_range_limit_is_clamped() {
    let response = app()
        .oneshot(search_request(&json!({ "query": "code editor", "limit": -4 })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["candidates"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_overlong_query_is_rejected() {
    let query = "a".repeat(513);
    let response = app()
        .oneshot(search_request(&json!({ "query": query })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.contains("512"))
    );
}

#[tokio::test]
async fn test_empty_query_is_not_an_error() {
    let response = app()
        .oneshot(search_request(&json!({ "query": "" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["candidates"], json!([]));
    assert_eq!(body["confidence"], json!(0.0));
}

#[tokio::test]
async fn test_missing_query_field_is_client_error() {
    let response = app()
        .oneshot(search_request(&json!({ "limit": 5 })))
        .await
        .expect("response");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let mut request = search_request(&json!({ "query": "free cli tools" }));
    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER, "req-123".parse().expect("header value"));
    let response = app().oneshot(request).await.expect("response");

    assert_eq!(
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
}

#[tokio::test]
async fn test_get_is_not_allowed() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/search")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
