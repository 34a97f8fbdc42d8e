//! Integration tests for the HTTP router, driven in-process with `oneshot`.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use lumen_abstraction::GatewayError;
use lumen_core::pipeline::Pipeline;
use lumen_core::server::logging::REQUEST_ID_HEADER;
use lumen_core::server::{AppState, router};
use lumen_models::MockGateway;
use serde_json::{Value, json};
use tower::ServiceExt;

const APPLE_EXPANSION: &str =
    "{\"image_prompt\": \"A photorealistic red apple resting on a wooden table, white background\"}";

fn app_with(mock: &Arc<MockGateway>, static_dir: &Path) -> Router {
    router(AppState::new(Pipeline::new(mock.clone())), static_dir)
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/userquery")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_userquery_success_shape() {
    let dir = tempfile::tempdir().unwrap();
    let image = vec![1u8, 2, 3, 4, 5];
    let mock = Arc::new(
        MockGateway::new("mock".to_string())
            .with_text_reply(APPLE_EXPANSION)
            .with_image(image.clone())
            .with_judge_reply("```json\n{\"match\": true}\n```"),
    );

    let response = app_with(&mock, dir.path())
        .oneshot(post_json(r#"{"query": "a red apple on a table"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let body = body_json(response).await;
    assert_eq!(body["mime"], "image/jpeg");
    assert_eq!(
        body["prompt_text"],
        "A photorealistic red apple resting on a wooden table, white background"
    );
    assert_eq!(body["verification"], json!({"match": true}));
    assert!(body["tokens"]["text_tokens"].is_u64());
    assert!(body["tokens"]["image_tokens"].is_u64());
    let decoded = STANDARD.decode(body["image_base64"].as_str().unwrap()).unwrap();
    assert_eq!(decoded, image);
}

#[tokio::test]
async fn test_userquery_empty_query_is_422() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    let response =
        app_with(&mock, dir.path()).oneshot(post_json(r#"{"query": "   "}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error_type"], "validation_error");
    assert!(body.get("image_base64").is_none());
    assert_eq!(mock.calls().total(), 0);
}

#[tokio::test]
async fn test_userquery_missing_field_is_422() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    let response =
        app_with(&mock, dir.path()).oneshot(post_json(r#"{"prompt": "apple"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error_type"], "validation_error");
    assert_eq!(mock.calls().total(), 0);
}

#[tokio::test]
async fn test_userquery_non_string_and_malformed_bodies_are_422() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    for body in [r#"{"query": 42}"#, "{not json", ""] {
        let response = app_with(&mock, dir.path()).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "body {body:?}");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/userquery")
        .body(Body::from(r#"{"query": "apple"}"#))
        .unwrap();
    let response = app_with(&mock, dir.path()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(mock.calls().total(), 0);
}

#[tokio::test]
async fn test_userquery_image_transport_error_is_502() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockGateway::new("mock".to_string())
            .with_text_reply(APPLE_EXPANSION)
            .with_image_error(GatewayError::transport("connection refused")),
    );

    let response = app_with(&mock, dir.path())
        .oneshot(post_json(r#"{"query": "a red apple on a table"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error_type"], "image_synthesis_error");
    assert!(body.get("image_base64").is_none());
    assert_eq!(mock.calls().judge, 0);
}

#[tokio::test]
async fn test_userquery_prompt_expansion_failure_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let mock =
        Arc::new(MockGateway::new("mock".to_string()).with_text_reply("{\"prompt\": \"apple\"}"));

    let response =
        app_with(&mock, dir.path()).oneshot(post_json(r#"{"query": "apple"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error_type"], "prompt_expansion_error");
    assert_eq!(body.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_index_served_at_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>lumen</html>").unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    let response = app_with(&mock, dir.path()).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<html>lumen</html>");
}

#[tokio::test]
async fn test_root_without_index_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    let response = app_with(&mock, dir.path()).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_asset_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('lumen');").unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    let response = app_with(&mock, dir.path()).oneshot(get("/static/app.js")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"console.log('lumen');");

    let missing = app_with(&mock, dir.path()).oneshot(get("/static/missing.css")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));

    let response = app_with(&mock, dir.path()).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok", "backend": "mock"}));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockGateway::new("mock".to_string()));
    let request =
        Request::builder().uri("/health").header(REQUEST_ID_HEADER, "req-42").body(Body::empty()).unwrap();

    let response = app_with(&mock, dir.path()).oneshot(request).await.unwrap();

    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
}
