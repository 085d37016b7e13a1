//! Process execution utilities with timeout support
//!
//! Every external tool (videodl, yt-dlp, ffmpeg, ffprobe) runs through
//! [`run_with_timeout`] so a hung process cannot stall a request's pipeline.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::download::error::DownloadError;

/// Run an async Command with a timeout.
///
/// stdout/stderr are captured and stdin is closed. The child is spawned with
/// `kill_on_drop`, so on timeout the dropped future kills and reaps it.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, DownloadError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(DownloadError::Process(format!("Failed to run {}: {}", program, e))),
        Err(_) => {
            log::warn!("{} timed out after {}s, killed", program, timeout.as_secs());
            Err(DownloadError::Timeout(format!(
                "{} timed out after {}s",
                program,
                timeout.as_secs()
            )))
        }
    }
}

/// Last `max_chars` characters of a tool's stderr, for logs.
pub fn stderr_tail(output: &Output, max_chars: usize) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let started = std::time::Instant::now();
        let result = run_with_timeout(&mut cmd, Duration::from_millis(200)).await;
        assert!(matches!(result, Err(DownloadError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let output = run_with_timeout(&mut cmd, Duration::from_secs(5)).await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_binary_is_process_error() {
        let mut cmd = Command::new("definitely-not-a-real-binary-shortgrab");
        let result = run_with_timeout(&mut cmd, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(DownloadError::Process(_))));
    }
}
