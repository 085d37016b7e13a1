//! yt-dlp executor.
//!
//! Asks for a progressive mp4 first (itag 22 = 720p, itag 18 = 360p), then any
//! mp4, then whatever is best, and forces an mp4 merge container. Retries and
//! socket timeouts are delegated to yt-dlp itself.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use crate::core::config;
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;
use crate::download::source::{FetchExecutor, FetchMethod, FetchRequest, FetchResult};

/// Format preference ladder passed to `-f`.
pub const FORMAT_LADDER: &str = "22/18/best[ext=mp4]/best";

pub struct YtDlpExecutor {
    bin: String,
    timeout: std::time::Duration,
}

impl Default for YtDlpExecutor {
    fn default() -> Self {
        Self::new(config::YTDL_BIN.as_str())
    }
}

impl YtDlpExecutor {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            timeout: config::download::ytdlp_timeout(),
        }
    }
}

/// Builds the yt-dlp argument list for one URL.
pub fn build_args(url: &str, target_dir: &Path) -> Vec<String> {
    let template = target_dir.join("%(title).50s.%(ext)s");
    vec![
        "-f".to_string(),
        FORMAT_LADDER.to_string(),
        "--merge-output-format".to_string(),
        config::encoding::CONTAINER.to_string(),
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
        "--no-playlist".to_string(),
        "--socket-timeout".to_string(),
        config::download::YTDLP_SOCKET_TIMEOUT_SECS.to_string(),
        "--retries".to_string(),
        config::download::YTDLP_RETRIES.to_string(),
        url.to_string(),
    ]
}

#[async_trait]
impl FetchExecutor for YtDlpExecutor {
    fn method(&self) -> FetchMethod {
        FetchMethod::YtDlp
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DownloadError> {
        log::info!("📥 yt-dlp: {}", request.url);
        let mut cmd = Command::new(&self.bin);
        cmd.args(build_args(&request.url, &request.target_dir));

        let output = run_with_timeout(&mut cmd, self.timeout).await?;
        if !output.status.success() {
            return Err(DownloadError::Tool(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr_tail(&output, 300)
            )));
        }
        Ok(FetchResult::unlocated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_args() {
        let args = build_args("https://youtu.be/abc", Path::new("/tmp/task"));
        assert_eq!(
            args,
            vec![
                "-f",
                "22/18/best[ext=mp4]/best",
                "--merge-output-format",
                "mp4",
                "-o",
                "/tmp/task/%(title).50s.%(ext)s",
                "--no-playlist",
                "--socket-timeout",
                "30",
                "--retries",
                "3",
                "https://youtu.be/abc",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_process_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = YtDlpExecutor::new("definitely-not-a-real-yt-dlp");
        let result = executor
            .fetch(&FetchRequest::new("https://youtu.be/abc", dir.path()))
            .await;
        assert!(matches!(result, Err(DownloadError::Process(_))));
    }
}
