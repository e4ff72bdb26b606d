// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the HTTP API.
//!
//! Runs the full router over in-memory storage and the mock LLM backend,
//! driving it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use scribe_core::application::service_factory::{create_unit_of_work_factory, ScribeServices};
use scribe_core::domain::config::{LlmProviderKind, ScribeConfigManifest};
use scribe_core::infrastructure::secrets_manager::StaticSecretStore;
use scribe_core::presentation::api::app;

const TENANT: &str = "acme.scribe.app";

fn router() -> Router {
    let mut config = ScribeConfigManifest::default();
    config.spec.llm.provider = LlmProviderKind::Mock;
    let services = ScribeServices::build(
        &config,
        create_unit_of_work_factory(None),
        Arc::new(StaticSecretStore::new()),
    )
    .unwrap();
    app(services)
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-tenant-id", TENANT);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(router: &Router, title: &str, content: &str) -> String {
    let (status, body) = send(
        router,
        request("POST", "/api/documents", Some(json!({ "title": title, "content_html": content }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_healthz_needs_no_tenant() {
    let response = router()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_missing_tenant_is_forbidden() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/api/documents")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "MissingTenant");
    assert_eq!(body["status_code"], 403);
    assert_eq!(body["request_id"], "req-42");
    assert_eq!(body["path"], "/api/documents");
}

#[tokio::test]
async fn test_document_lifecycle() {
    let router = router();
    let id = create(&router, "Quarterly report", "<p>Revenue grew.</p>").await;

    let (status, body) = send(&router, request("GET", &format!("/api/documents/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Quarterly report");
    assert_eq!(body["has_summary"], false);

    let (status, body) = send(
        &router,
        request(
            "PUT",
            &format!("/api/documents/{id}"),
            Some(json!({ "title": "Q3 report", "content_html": "<p>Revenue grew 4%.</p>" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Q3 report");

    let (status, body) = send(&router, request("GET", "/api/documents", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, _) = send(&router, request("DELETE", &format!("/api/documents/{id}"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&router, request("GET", &format!("/api/documents/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ResourceNotFound");
    assert_eq!(body["path"], format!("/api/documents/{id}"));

    let (_, body) = send(&router, request("GET", "/api/documents", None)).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_documents_are_tenant_scoped() {
    let router = router();
    let id = create(&router, "Private", "<p>secret</p>").await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/documents/{id}"))
                .header("x-tenant-id", "globex")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let router = router();
    let (status, body) = send(
        &router,
        request("POST", "/api/documents", Some(json!({ "title": "", "content_html": "<p>x</p>" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, _) = send(&router, request("POST", "/api/documents", Some(json!({ "title": "x" })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, request("GET", "/api/documents/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summary_crud() {
    let router = router();
    let id = create(&router, "Doc", "<p>body</p>").await;
    let summary_uri = format!("/api/documents/{id}/summary");

    let (status, _) = send(&router, request("GET", &summary_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, request("POST", &summary_uri, Some(json!({ "content_html": "<p>s1</p>" })))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["command"], "save_summary");

    let (status, _) = send(&router, request("PUT", &summary_uri, Some(json!({ "content_html": "<p>s2</p>" })))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, request("GET", &summary_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary_html"], "<p>s2</p>");

    let (status, _) = send(&router, request("DELETE", &summary_uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, request("DELETE", &summary_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn stream(router: &Router, uri: &str, body: Value) -> (axum::http::HeaderMap, String) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("x-tenant-id", TENANT)
                .header("x-request-id", "req-stream")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (headers, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_summary_stream_frames() {
    let router = router();
    let id = create(&router, "Doc", "<p>body</p>").await;

    let (headers, text) = stream(
        &router,
        &format!("/api/documents/{id}/summary/stream"),
        json!({ "mock_text": "```html\n<p>Short summary.</p>```" }),
    )
    .await;

    assert!(headers["content-type"].to_str().unwrap().starts_with("text/event-stream"));
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let open = text.find("event: open").unwrap();
    let chunk = text.find("event: chunk").unwrap();
    let done = text.find("event: done").unwrap();
    assert!(open < chunk && chunk < done);
    assert!(text.contains("\"request_id\":\"req-stream\""));
    assert!(text.contains("<p>Short summary.</p>"));
    assert!(!text.contains("```"));
    assert!(!text.contains("event: error"));
}

#[tokio::test]
async fn test_summary_stream_unknown_document() {
    let router = router();
    let (_, text) = stream(
        &router,
        &format!("/api/documents/{}/summary/stream", uuid::Uuid::new_v4()),
        json!({}),
    )
    .await;

    assert!(text.contains("event: open"));
    assert!(text.contains("event: error"));
    assert!(text.contains("Document not found."));
    assert!(!text.contains("event: done"));
}

#[tokio::test]
async fn test_summary_stream_huge_timeout_completes() {
    let router = router();
    let id = create(&router, "Doc", "<p>body</p>").await;

    let (_, text) = stream(
        &router,
        &format!("/api/documents/{id}/summary/stream"),
        json!({ "timeout_s": 1e30, "mock_text": "<p>Done.</p>" }),
    )
    .await;

    assert!(text.contains("event: open"));
    assert!(text.contains("<p>Done.</p>"));
    assert!(text.contains("event: done"));
    assert!(!text.contains("event: error"));
}

/// First SSE event on an open feed, waiting at most a few seconds
async fn next_event(body: &mut axum::body::BodyDataStream) -> String {
    use futures::StreamExt;
    let bytes = tokio::time::timeout(std::time::Duration::from_secs(5), body.next())
        .await
        .expect("no event within 5s")
        .unwrap()
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_tenant_event_feed() {
    let router = router();
    let response = router
        .clone()
        .oneshot(request("GET", "/api/documents/events", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    let mut feed = response.into_body().into_data_stream();

    let foreign = Request::builder()
        .method("POST")
        .uri("/api/documents")
        .header("x-tenant-id", "globex")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "title": "Other", "content_html": "<p>o</p>" }).to_string()))
        .unwrap();
    let (status, _) = send(&router, foreign).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = create(&router, "Mine", "<p>m</p>").await;

    let event = next_event(&mut feed).await;
    assert!(event.starts_with("event: document_created\n"), "{event}");
    assert!(event.contains(&id));
    assert!(event.contains(TENANT));
}

#[tokio::test]
async fn test_document_event_feed() {
    let router = router();
    let id = create(&router, "Doc", "<p>a</p>").await;
    let other = create(&router, "Other", "<p>b</p>").await;

    let response = router
        .clone()
        .oneshot(request("GET", &format!("/api/documents/{id}/events"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut feed = response.into_body().into_data_stream();

    let (status, _) = send(
        &router,
        request("POST", &format!("/api/documents/{other}/summary"), Some(json!({ "content_html": "<p>s</p>" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &router,
        request("POST", &format!("/api/documents/{id}/summary"), Some(json!({ "content_html": "<p>s</p>" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let event = next_event(&mut feed).await;
    assert!(event.starts_with("event: summary_saved\n"), "{event}");
    assert!(event.contains(&id));
}

#[tokio::test]
async fn test_document_event_feed_requires_visible_document() {
    let router = router();
    let (status, body) = send(
        &router,
        request("GET", &format!("/api/documents/{}/events", uuid::Uuid::new_v4()), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ResourceNotFound");
}
