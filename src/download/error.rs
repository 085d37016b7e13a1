use std::fmt;

/// Structured error type for fetch executors and external tools.
///
/// Categorized so the pipeline can label metrics and logs without parsing
/// message text. None of these reach a user directly: the orchestrator maps
/// them onto its own failure taxonomy.
#[derive(Debug)]
pub enum DownloadError {
    /// External tool spawned but exited non-zero (videodl, yt-dlp)
    Tool(String),
    /// FFmpeg processing failures (merge, re-encode)
    Ffmpeg(String),
    /// A bounded step ran past its timeout
    Timeout(String),
    /// Direct media fetch failed (status, transport, body)
    Http(String),
    /// Headless browser launch, navigation or capture failed
    Browser(String),
    /// Process could not be spawned or waited on
    Process(String),
    /// Catch-all for uncategorized errors
    Other(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns subcategory for metrics
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::Tool(_) => "tool",
            DownloadError::Ffmpeg(_) => "ffmpeg",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Http(_) => "http",
            DownloadError::Browser(_) => "browser",
            DownloadError::Process(_) => "process",
            DownloadError::Other(_) => "other",
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        match self {
            DownloadError::Tool(msg)
            | DownloadError::Ffmpeg(msg)
            | DownloadError::Timeout(msg)
            | DownloadError::Http(msg)
            | DownloadError::Browser(msg)
            | DownloadError::Process(msg)
            | DownloadError::Other(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Http(err.to_string())
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::Process(err.to_string())
    }
}

/// Plain strings become `DownloadError::Other`
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        DownloadError::Other(s)
    }
}

impl From<&str> for DownloadError {
    fn from(s: &str) -> Self {
        DownloadError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_display() {
        let err = DownloadError::Tool("yt-dlp exited with status 1".into());
        assert_eq!(err.to_string(), "yt-dlp exited with status 1");
    }

    #[test]
    fn test_download_error_subcategory() {
        assert_eq!(DownloadError::Tool("".into()).subcategory(), "tool");
        assert_eq!(DownloadError::Ffmpeg("".into()).subcategory(), "ffmpeg");
        assert_eq!(DownloadError::Timeout("".into()).subcategory(), "timeout");
        assert_eq!(DownloadError::Browser("".into()).subcategory(), "browser");
        assert_eq!(DownloadError::Other("".into()).subcategory(), "other");
    }

    #[test]
    fn test_from_string() {
        let err: DownloadError = "test error".to_string().into();
        assert!(matches!(err, DownloadError::Other(_)));
        assert_eq!(err.message(), "test error");
    }
}
