//! HTTP API tests driven through the router without a socket
//!
//! Run with: cargo test --test web_api_test

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use shortgrab::download::postprocess::{FfmpegTranscoder, PostProcessAction};
use shortgrab::download::probe::{FfprobeInspector, MediaProbe};
use shortgrab::download::source::ExecutorSet;
use shortgrab::download::{FetchMethod, MediaKind, Pipeline, PipelineOutput};
use shortgrab::storage::TaskStatus;
use shortgrab::web::{router, WebState};

fn state(root: &Path) -> WebState {
    // No executors: any run ends as unsupported or exhausted
    let pipeline = Pipeline::new(
        ExecutorSet::new(),
        Arc::new(FfprobeInspector::default()),
        Arc::new(FfmpegTranscoder::default()),
    );
    WebState::new(Arc::new(pipeline), root)
}

fn video_output(artifact: PathBuf, file_size: u64) -> PipelineOutput {
    PipelineOutput {
        artifact,
        kind: MediaKind::Video,
        gallery: Vec::new(),
        file_size,
        probe: Some(MediaProbe {
            width: Some(720),
            height: Some(1280),
            codec: Some("h264".to_string()),
            has_audio: true,
        }),
        method: FetchMethod::YtDlp,
        post_process: PostProcessAction::None,
    }
}

/// Registers a completed task whose artifact has `size` bytes.
async fn completed_task(state: &WebState, name: &str, size: u64) -> String {
    let (record, arena) = state.store.create("https://youtu.be/abc").await.unwrap();
    let path = arena.dir().join(name);
    if size <= 64 {
        std::fs::write(&path, &b"0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"[..size as usize])
            .unwrap();
    } else {
        std::fs::File::create(&path).unwrap().set_len(size).unwrap();
    }
    state.store.complete(&record.task_id, &video_output(path, size));
    record.task_id
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_and_index_respond() {
    let dir = TempDir::new().unwrap();
    let app = router(state(dir.path()));

    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, headers, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(String::from_utf8_lossy(&body).contains("/api/download"));
}

#[tokio::test]
async fn submit_without_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = router(state(dir.path()));

    let (status, _, body) = send(&app, post_json("/api/download", r#"{"url":"look at this"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string());

    let (status, _, _) = send(&app, post_json("/api/download", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_submission_body_gets_json_error() {
    let dir = TempDir::new().unwrap();
    let app = router(state(dir.path()));

    let (status, headers, body) = send(&app, post_json("/api/download", "not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("application/json"));
    assert!(json(&body)["error"].is_string());

    let plain = Request::builder()
        .method("POST")
        .uri("/api/download")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("https://youtu.be/abc"))
        .unwrap();
    let (status, _, body) = send(&app, plain).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string());
}

#[tokio::test]
async fn unsupported_submission_ends_failed() {
    let dir = TempDir::new().unwrap();
    let app = router(state(dir.path()));

    let (status, _, body) = send(
        &app,
        post_json("/api/download", r#"{"url":"see https://example.org/v/1 now"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let submitted = json(&body);
    assert_eq!(submitted["extracted_url"], "https://example.org/v/1");
    let task_id = submitted["task_id"].as_str().unwrap().to_string();

    let mut record = Value::Null;
    for _ in 0..50 {
        let (_, _, body) = send(&app, get(&format!("/api/status/{task_id}"))).await;
        record = json(&body);
        if record["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(record["status"], "failed");
    assert!(record["error"].as_str().unwrap().starts_with("Unsupported URL"));
}

#[tokio::test]
async fn status_and_file_for_unknown_task_are_404() {
    let dir = TempDir::new().unwrap();
    let app = router(state(dir.path()));

    let (status, _, _) = send(&app, get("/api/status/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = send(&app, get("/api/file/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_for_unfinished_task_is_400() {
    let dir = TempDir::new().unwrap();
    let state = state(dir.path());
    let (record, _arena) = state.store.create("https://youtu.be/abc").await.unwrap();
    let app = router(state);

    let (status, _, body) = send(&app, get(&format!("/api/file/{}", record.task_id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Download not ready");
}

#[tokio::test]
async fn oversized_artifact_is_refused_with_413() {
    let dir = TempDir::new().unwrap();
    let state = state(dir.path());
    let task_id = completed_task(&state, "clip.mp4", 80 * 1024 * 1024).await;
    let app = router(state.clone());

    let (status, _, body) = send(&app, get(&format!("/api/status/{task_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "completed");
    assert_eq!(state.store.get(&task_id).unwrap().status, TaskStatus::Completed);

    let (status, _, body) = send(&app, get(&format!("/api/file/{task_id}"))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body = json(&body);
    assert_eq!(body["error"], "too_large");
    assert_eq!(body["file_size"], 80 * 1024 * 1024);
    assert_eq!(body["limit"], 50 * 1024 * 1024);
}

#[tokio::test]
async fn file_route_serves_ranges_as_attachment() {
    let dir = TempDir::new().unwrap();
    let state = state(dir.path());
    let task_id = completed_task(&state, "clip.mp4", 32).await;
    let app = router(state);

    let request = Request::builder()
        .uri(format!("/api/file/{task_id}"))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, b"0123");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"clip.mp4\""));

    let (status, headers, body) = send(&app, get(&format!("/api/preview/{task_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 32);
    assert!(headers[header::CONTENT_DISPOSITION].to_str().unwrap().starts_with("inline;"));
}

#[tokio::test]
async fn metrics_endpoint_exposes_text() {
    let dir = TempDir::new().unwrap();
    let app = router(state(dir.path()));

    let (status, headers, _) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
}
