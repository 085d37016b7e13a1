//! Fetch executors.
//!
//! Provides the `FetchExecutor` trait shared by every way of turning a URL
//! into a media file, and an `ExecutorSet` that maps each [`FetchMethod`] to
//! its implementation. The pipeline walks the selector's method list and asks
//! the set for each executor in turn.
//!
//! Built-in executors:
//! - `VideodlExecutor`: generic multi-platform downloader CLI
//! - `YtDlpExecutor`: yt-dlp with a Telegram-friendly format ladder
//! - `XhsExecutor`: headless browser capture for Xiaohongshu notes
//!
//! `http` holds the direct media fetch used by the browser executor.

pub mod http;
pub mod videodl;
pub mod xhs;
pub mod ytdlp;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::download::error::DownloadError;
pub use crate::download::strategy::FetchMethod;

/// What to fetch and where to put it. Immutable for the request's lifetime.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub target_dir: PathBuf,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            target_dir: target_dir.into(),
        }
    }
}

/// Kind of media an executor produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    None,
}

/// Output of one executor run.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Best artifact, if the executor knows it. `None` asks the pipeline to
    /// scan the target directory instead.
    pub artifact_path: Option<PathBuf>,
    pub kind: MediaKind,
    /// All images of a picture post, in order. Empty for videos.
    pub gallery: Vec<PathBuf>,
}

impl FetchResult {
    /// Executor finished; the produced file must be located by scanning.
    pub fn unlocated() -> Self {
        Self {
            artifact_path: None,
            kind: MediaKind::None,
            gallery: Vec::new(),
        }
    }

    pub fn video(path: PathBuf) -> Self {
        Self {
            artifact_path: Some(path),
            kind: MediaKind::Video,
            gallery: Vec::new(),
        }
    }

    /// Picture post; the first image doubles as the primary artifact.
    pub fn images(paths: Vec<PathBuf>) -> Self {
        Self {
            artifact_path: paths.first().cloned(),
            kind: if paths.is_empty() { MediaKind::None } else { MediaKind::Image },
            gallery: paths,
        }
    }
}

/// One fetch strategy.
///
/// Implementations run to completion or their own timeout and write zero or
/// more files into `request.target_dir`. An `Err` means the step failed; the
/// pipeline still scans the directory afterwards since some tools leave a
/// usable file behind when they report an error.
#[async_trait]
pub trait FetchExecutor: Send + Sync {
    fn method(&self) -> FetchMethod;

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DownloadError>;
}

/// Executors keyed by method.
#[derive(Clone, Default)]
pub struct ExecutorSet {
    executors: HashMap<FetchMethod, Arc<dyn FetchExecutor>>,
}

impl ExecutorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an executor under its own method, replacing any previous one.
    pub fn register(&mut self, executor: Arc<dyn FetchExecutor>) {
        self.executors.insert(executor.method(), executor);
    }

    pub fn with(mut self, executor: Arc<dyn FetchExecutor>) -> Self {
        self.register(executor);
        self
    }

    pub fn get(&self, method: FetchMethod) -> Option<Arc<dyn FetchExecutor>> {
        self.executors.get(&method).cloned()
    }

    /// The production executors backed by the configured external tools.
    pub fn system() -> Self {
        Self::new()
            .with(Arc::new(videodl::VideodlExecutor::default()))
            .with(Arc::new(ytdlp::YtDlpExecutor::default()))
            .with(Arc::new(xhs::XhsExecutor::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_set_covers_every_method() {
        let set = ExecutorSet::system();
        for method in [FetchMethod::GenericCli, FetchMethod::YtDlp, FetchMethod::Browser] {
            let executor = set.get(method).expect("executor registered");
            assert_eq!(executor.method(), method);
        }
    }

    #[test]
    fn test_images_result_uses_first_as_artifact() {
        let result = FetchResult::images(vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
        assert_eq!(result.kind, MediaKind::Image);
        assert_eq!(result.artifact_path, Some(PathBuf::from("a.jpg")));
        assert_eq!(result.gallery.len(), 2);

        let empty = FetchResult::images(Vec::new());
        assert_eq!(empty.kind, MediaKind::None);
        assert!(empty.artifact_path.is_none());
    }
}
