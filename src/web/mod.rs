//! Web API and single-page front end.
//!
//! Routes:
//! - `GET  /`                    page
//! - `GET  /health`              liveness
//! - `GET  /metrics`             Prometheus text
//! - `POST /api/download`        submit `{url}` (free text is fine)
//! - `GET  /api/status/{id}`     task record
//! - `GET  /api/file/{id}`       artifact as attachment (Range aware)
//! - `GET  /api/preview/{id}`    artifact inline (Range aware)

pub mod page;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::core::config;
use crate::core::metrics;
use crate::core::utils::{extract_first_url, truncate_chars};
use crate::download::arena::TaskArena;
use crate::download::delivery::{check_delivery_size, DeliveryError};
use crate::download::pipeline::Pipeline;
use crate::download::progress::PipelineStage;
use crate::download::source::FetchRequest;
use crate::storage::tasks::{TaskStatus, TaskStore};

/// Shared state for the web server.
#[derive(Clone)]
pub struct WebState {
    pub store: TaskStore,
    pub pipeline: Arc<Pipeline>,
    /// Delivery ceiling applied by the file routes
    pub max_file_size: u64,
}

impl WebState {
    pub fn new(pipeline: Arc<Pipeline>, root: impl Into<PathBuf>) -> Self {
        Self {
            store: TaskStore::new(root),
            pipeline,
            max_file_size: config::delivery::MAX_FILE_SIZE_BYTES,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub url: String,
}

/// Builds the router; split out from [`start_web_server`] so tests can drive it.
pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/download", post(submit_handler))
        .route("/api/status/{task_id}", get(status_handler))
        .route("/api/file/{task_id}", get(file_handler))
        .route("/api/preview/{task_id}", get(preview_handler))
        .with_state(state)
}

/// Start the web server.
pub async fn start_web_server(port: u16, state: WebState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /                   - Downloader page");
    log::info!("  /api/download       - Submit a URL");
    log::info!("  /api/status/{{id}}    - Task status");
    log::info!("  /api/file/{{id}}      - Download artifact");
    log::info!("  /metrics            - Prometheus metrics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// GET /: the downloader page.
async fn index_handler() -> Html<&'static str> {
    Html(page::INDEX_HTML)
}

/// GET /health: simple health check.
async fn health_handler() -> &'static str {
    "ok"
}

/// GET /metrics: Prometheus text exposition.
async fn metrics_handler() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_text(),
    )
        .into_response()
}

/// POST /api/download: extracts the first URL, sweeps expired tasks and
/// starts a background run.
async fn submit_handler(
    State(state): State<WebState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            log::warn!("Rejected submission: {}", rejection.body_text());
            return error_json(StatusCode::BAD_REQUEST, "Request body must be JSON like {\"url\": \"...\"}");
        }
    };
    let Some(url) = extract_first_url(&body.url) else {
        return error_json(StatusCode::BAD_REQUEST, "No URL found in the text");
    };

    state.store.sweep_expired(config::web::retention()).await;

    let (record, arena) = match state.store.create(&url).await {
        Ok(created) => created,
        Err(e) => {
            log::error!("Failed to create task directory: {}", e);
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Could not create task");
        }
    };

    log::info!("📨 Task {} submitted for {}", record.task_id, url);
    tokio::spawn(run_task(state.clone(), record.task_id.clone(), url.clone(), arena));

    Json(json!({ "task_id": record.task_id, "extracted_url": url })).into_response()
}

/// Drives one task to a terminal status. The pipeline runs in its own task so
/// a panic inside it is caught here and recorded as a failure.
pub async fn run_task(state: WebState, task_id: String, url: String, arena: TaskArena) {
    state.store.mark_downloading(&task_id);

    let (stage_tx, mut stage_rx) = watch::channel(PipelineStage::Queued);
    let progress_store = state.store.clone();
    let progress_id = task_id.clone();
    let progress = tokio::spawn(async move {
        while stage_rx.changed().await.is_ok() {
            let label = stage_rx.borrow_and_update().label();
            progress_store.set_progress(&progress_id, label);
        }
    });

    let pipeline = Arc::clone(&state.pipeline);
    let request = FetchRequest::new(url, arena.dir());
    let run = tokio::spawn(async move { pipeline.run(&request, &stage_tx).await });

    let outcome = run.await;
    let _ = progress.await;

    match outcome {
        Ok(Ok(output)) => state.store.complete(&task_id, &output),
        Ok(Err(e)) => state.store.fail(&task_id, e.user_message()),
        Err(join_err) => {
            log::error!("Task {} crashed: {}", task_id, join_err);
            let message = format!("Unexpected error: {}", join_err);
            state.store.fail(
                &task_id,
                truncate_chars(&message, config::delivery::ERROR_DETAIL_MAX_CHARS),
            );
        }
    }
}

/// GET /api/status/{id}
async fn status_handler(State(state): State<WebState>, Path(task_id): Path<String>) -> Response {
    match state.store.get(&task_id) {
        Some(record) => Json(record).into_response(),
        None => error_json(StatusCode::NOT_FOUND, "Task not found"),
    }
}

/// GET /api/file/{id}
async fn file_handler(State(state): State<WebState>, Path(task_id): Path<String>, request: Request) -> Response {
    serve_artifact(&state, &task_id, request, Disposition::Attachment).await
}

/// GET /api/preview/{id}
async fn preview_handler(State(state): State<WebState>, Path(task_id): Path<String>, request: Request) -> Response {
    serve_artifact(&state, &task_id, request, Disposition::Inline).await
}

#[derive(Clone, Copy)]
enum Disposition {
    Attachment,
    Inline,
}

fn content_disposition(disposition: Disposition, file_name: &str) -> Option<HeaderValue> {
    let kind = match disposition {
        Disposition::Attachment => "attachment",
        Disposition::Inline => "inline",
    };
    let ascii: String = file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        ascii,
        urlencoding::encode(file_name)
    ))
    .ok()
}

/// Shared body of the file routes: task checks, size gate, then a
/// Range-aware file response.
async fn serve_artifact(state: &WebState, task_id: &str, request: Request, disposition: Disposition) -> Response {
    let Some(record) = state.store.get(task_id) else {
        return error_json(StatusCode::NOT_FOUND, "Task not found");
    };
    if record.status != TaskStatus::Completed {
        return error_json(StatusCode::BAD_REQUEST, "Download not ready");
    }
    let Some(path) = record.file_path.filter(|p| p.is_file()) else {
        return error_json(StatusCode::NOT_FOUND, "File not found");
    };

    match check_delivery_size(&path, state.max_file_size).await {
        Ok(_) => {}
        Err(DeliveryError::TooLarge { size, limit }) => {
            log::warn!("Task {} artifact is {} bytes, over the {} limit", task_id, size, limit);
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "too_large", "file_size": size, "limit": limit })),
            )
                .into_response();
        }
        Err(DeliveryError::Missing(_)) => return error_json(StatusCode::NOT_FOUND, "File not found"),
    }

    let file_name = record.file_name.unwrap_or_else(|| "video.mp4".to_string());
    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Failed to serve {}: {}", path.display(), e);
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file");
        }
    };

    let mut response = response.map(Body::new);
    if let Some(value) = content_disposition(disposition, &file_name) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
