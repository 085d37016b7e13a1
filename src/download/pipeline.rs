//! Task orchestrator.
//!
//! Runs one request end to end:
//!   select methods → fetch (with fallback) → locate → probe → post-process
//!
//! The fallback chain is a data list produced by the strategy selector; this
//! module owns the single loop that walks it. Every failure inside the run is
//! caught here and mapped onto [`PipelineError`]; callers never see a raw
//! tool error. The delivery size gate is not part of the run: front ends
//! apply it when they hand the artifact out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;

use crate::core::config;
use crate::core::metrics;
use crate::core::utils::truncate_chars;
use crate::download::locator::locate_artifact_async;
use crate::download::postprocess::{post_process, FfmpegTranscoder, PostProcessAction, Transcoder};
use crate::download::probe::{FfprobeInspector, MediaProbe, MediaProber};
use crate::download::progress::PipelineStage;
use crate::download::source::{ExecutorSet, FetchMethod, FetchRequest, FetchResult, MediaKind};
use crate::download::strategy::{select_methods, Selection};

/// Why a run ended without an artifact.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported URL: {url}")]
    Unsupported { url: String },

    #[error("All download methods failed ({})", attempted_list(.attempted))]
    FetchExhausted { attempted: Vec<FetchMethod> },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

fn attempted_list(methods: &[FetchMethod]) -> String {
    methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
}

impl PipelineError {
    /// Text safe to show a user, capped at 100 characters.
    pub fn user_message(&self) -> String {
        truncate_chars(&self.to_string(), config::delivery::ERROR_DETAIL_MAX_CHARS)
    }

    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            PipelineError::Unsupported { .. } => "unsupported",
            PipelineError::FetchExhausted { .. } => "fetch_failed",
            PipelineError::Unexpected(_) => "unexpected",
        }
    }
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// File to deliver. For picture posts, the first image.
    pub artifact: PathBuf,
    pub kind: MediaKind,
    /// Every image of a picture post, in order. Empty for videos.
    pub gallery: Vec<PathBuf>,
    pub file_size: u64,
    /// Probe of the final video; `None` for images.
    pub probe: Option<MediaProbe>,
    pub method: FetchMethod,
    pub post_process: PostProcessAction,
}

impl PipelineOutput {
    pub fn file_name(&self) -> String {
        self.artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn media_count(&self) -> usize {
        self.gallery.len().max(1)
    }
}

/// Artifact accepted from one executor run.
struct Fetched {
    artifact: PathBuf,
    kind: MediaKind,
    gallery: Vec<PathBuf>,
    method: FetchMethod,
}

async fn non_empty_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .filter(|meta| meta.is_file() && meta.len() > 0)
        .map(|meta| meta.len())
}

/// Orchestrates executors, prober and transcoder for one request at a time.
#[derive(Clone)]
pub struct Pipeline {
    executors: ExecutorSet,
    prober: Arc<dyn MediaProber>,
    transcoder: Arc<dyn Transcoder>,
}

impl Pipeline {
    pub fn new(executors: ExecutorSet, prober: Arc<dyn MediaProber>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            executors,
            prober,
            transcoder,
        }
    }

    /// Pipeline backed by the configured external tools.
    pub fn with_system_tools() -> Self {
        Self::new(
            ExecutorSet::system(),
            Arc::new(FfprobeInspector::default()),
            Arc::new(FfmpegTranscoder::default()),
        )
    }

    /// Runs the request, publishing stage changes on `stage`.
    pub async fn run(
        &self,
        request: &FetchRequest,
        stage: &watch::Sender<PipelineStage>,
    ) -> Result<PipelineOutput, PipelineError> {
        let started = Instant::now();
        let result = self.run_inner(request, stage).await;
        stage.send_replace(PipelineStage::Finished);

        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.outcome(),
        };
        metrics::PIPELINE_OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
        metrics::PIPELINE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(output) => log::info!(
                "✅ Pipeline finished for {} via {} in {:.1}s: {} ({} bytes)",
                request.url,
                output.method,
                started.elapsed().as_secs_f64(),
                output.artifact.display(),
                output.file_size
            ),
            Err(e) => log::warn!("❌ Pipeline failed for {}: {}", request.url, e),
        }
        result
    }

    async fn run_inner(
        &self,
        request: &FetchRequest,
        stage: &watch::Sender<PipelineStage>,
    ) -> Result<PipelineOutput, PipelineError> {
        let methods = match select_methods(&request.url) {
            Selection::Methods { platform, methods } => {
                log::info!("🧭 {:?} URL, trying {}", platform, attempted_list(&methods));
                methods
            }
            Selection::Unsupported => {
                return Err(PipelineError::Unsupported {
                    url: request.url.clone(),
                })
            }
        };

        let fetched = self
            .fetch_with_fallback(request, &methods, stage)
            .await
            .ok_or(PipelineError::FetchExhausted { attempted: methods })?;

        if fetched.kind == MediaKind::Image {
            let file_size = non_empty_size(&fetched.artifact)
                .await
                .ok_or_else(|| PipelineError::Unexpected("Downloaded image disappeared".to_string()))?;
            return Ok(PipelineOutput {
                artifact: fetched.artifact,
                kind: MediaKind::Image,
                gallery: fetched.gallery,
                file_size,
                probe: None,
                method: fetched.method,
                post_process: PostProcessAction::None,
            });
        }

        stage.send_replace(PipelineStage::Probing);
        let probe = self.prober.probe(&fetched.artifact).await;

        stage.send_replace(PipelineStage::PostProcessing);
        let processed = post_process(
            self.transcoder.as_ref(),
            &request.target_dir,
            &fetched.artifact,
            &probe,
        )
        .await;

        let probe = match processed.action {
            PostProcessAction::Merged | PostProcessAction::Reencoded => self.prober.probe(&processed.artifact).await,
            _ => probe,
        };

        let file_size = non_empty_size(&processed.artifact).await.ok_or_else(|| {
            PipelineError::Unexpected(format!(
                "Artifact {} is missing or empty after post-processing",
                processed.artifact.display()
            ))
        })?;

        Ok(PipelineOutput {
            artifact: processed.artifact,
            kind: MediaKind::Video,
            gallery: Vec::new(),
            file_size,
            probe: Some(probe),
            method: fetched.method,
            post_process: processed.action,
        })
    }

    /// Tries each method once, in order, until one yields a non-empty file.
    async fn fetch_with_fallback(
        &self,
        request: &FetchRequest,
        methods: &[FetchMethod],
        stage: &watch::Sender<PipelineStage>,
    ) -> Option<Fetched> {
        for &method in methods {
            let Some(executor) = self.executors.get(method) else {
                log::warn!("No executor registered for {}, skipping", method);
                continue;
            };

            stage.send_replace(PipelineStage::Fetching(method));
            let result = executor.fetch(request).await;
            if let Err(e) = &result {
                log::warn!("{} failed ({}): {}", method, e.subcategory(), e);
            }

            stage.send_replace(PipelineStage::Locating);
            match self.accept(request, method, result).await {
                Some(fetched) => {
                    metrics::FETCH_ATTEMPTS_TOTAL
                        .with_label_values(&[method.as_str(), "artifact"])
                        .inc();
                    return Some(fetched);
                }
                None => {
                    metrics::FETCH_ATTEMPTS_TOTAL
                        .with_label_values(&[method.as_str(), "empty"])
                        .inc();
                    log::info!("{} produced no artifact, falling back", method);
                }
            }
        }
        None
    }

    /// Picks the artifact of one executor run: the path it reported if that
    /// file is non-empty, otherwise whatever the locator finds in the target
    /// directory (tools sometimes leave a usable file after an error).
    async fn accept(
        &self,
        request: &FetchRequest,
        method: FetchMethod,
        result: Result<FetchResult, crate::download::error::DownloadError>,
    ) -> Option<Fetched> {
        if let Ok(FetchResult {
            artifact_path: Some(path),
            kind,
            gallery,
        }) = result
        {
            if non_empty_size(&path).await.is_some() {
                return Some(Fetched {
                    artifact: path,
                    kind: if kind == MediaKind::None { MediaKind::Video } else { kind },
                    gallery,
                    method,
                });
            }
            log::warn!("{} reported {} but it is missing or empty", method, path.display());
        }

        let located = locate_artifact_async(&request.target_dir).await?;
        non_empty_size(&located).await?;
        Some(Fetched {
            artifact: located,
            kind: MediaKind::Video,
            gallery: Vec::new(),
            method,
        })
    }
}
