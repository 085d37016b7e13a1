//! Artifact locator: finds the media file a tool left in a directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Video extensions in priority order. An mp4 anywhere beats an mkv anywhere.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov"];

/// Audio extensions a downloader may leave next to a silent video.
pub const AUDIO_EXTENSIONS: &[&str] = &["m4a", "aac", "mp3", "opus", "ogg", "wav", "flac"];

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Every regular file under `dir`, in a stable order.
///
/// Entries are sorted by file name at each level, so repeated scans of an
/// unchanged directory visit files identically.
fn files_sorted(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Returns the first file matching the extension priority list, or `None`.
pub fn locate_artifact(dir: &Path) -> Option<PathBuf> {
    let files = files_sorted(dir);
    VIDEO_EXTENSIONS
        .iter()
        .find_map(|ext| files.iter().find(|path| has_extension(path, ext)).cloned())
}

/// Returns the first audio-only file in `dir` that is not `exclude`.
pub fn locate_audio_companion(dir: &Path, exclude: &Path) -> Option<PathBuf> {
    let files = files_sorted(dir);
    AUDIO_EXTENSIONS.iter().find_map(|ext| {
        files
            .iter()
            .find(|path| path.as_path() != exclude && has_extension(path, ext))
            .cloned()
    })
}

/// Async wrapper for use from the pipeline; the walk runs on the blocking pool.
pub async fn locate_artifact_async(dir: &Path) -> Option<PathBuf> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || locate_artifact(&dir))
        .await
        .unwrap_or_else(|e| {
            log::error!("Artifact scan task failed: {}", e);
            None
        })
}
