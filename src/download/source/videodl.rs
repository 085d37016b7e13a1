//! Generic downloader CLI executor.
//!
//! `videodl -i <url>` runs with the target directory as its working directory
//! and writes whatever it downloads there under names it chooses itself, so
//! this executor never knows the artifact path: the pipeline locates it.

use async_trait::async_trait;
use tokio::process::Command;

use crate::core::config;
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;
use crate::download::source::{FetchExecutor, FetchMethod, FetchRequest, FetchResult};

pub struct VideodlExecutor {
    bin: String,
    timeout: std::time::Duration,
}

impl Default for VideodlExecutor {
    fn default() -> Self {
        Self::new(config::VIDEODL_BIN.as_str())
    }
}

impl VideodlExecutor {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            timeout: config::download::generic_timeout(),
        }
    }
}

#[async_trait]
impl FetchExecutor for VideodlExecutor {
    fn method(&self) -> FetchMethod {
        FetchMethod::GenericCli
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DownloadError> {
        log::info!("📥 videodl: {}", request.url);
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-i").arg(&request.url).current_dir(&request.target_dir);

        let output = run_with_timeout(&mut cmd, self.timeout).await?;
        if !output.status.success() {
            return Err(DownloadError::Tool(format!(
                "videodl exited with {}: {}",
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
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_binary_fails_without_artifact() {
        let dir = TempDir::new().unwrap();
        let executor = VideodlExecutor::new("definitely-not-a-real-videodl");
        let request = FetchRequest::new("https://www.tiktok.com/@u/video/1", dir.path());
        let result = executor.fetch(&request).await;
        assert!(matches!(result, Err(DownloadError::Process(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_tool_error() {
        let dir = TempDir::new().unwrap();
        let executor = VideodlExecutor::new("false");
        let request = FetchRequest::new("https://www.tiktok.com/@u/video/1", dir.path());
        let result = executor.fetch(&request).await;
        assert!(matches!(result, Err(DownloadError::Tool(_))));
    }
}
