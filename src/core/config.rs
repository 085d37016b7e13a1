use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Bot token
/// Read from TELEGRAM_BOT_TOKEN, BOT_TOKEN or TELOXIDE_TOKEN environment variable
/// Empty when none is set; the chat front end refuses to start in that case
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("TELEGRAM_BOT_TOKEN")
        .or_else(|_| env::var("BOT_TOKEN"))
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_default()
});

/// Web API port
/// Read from PORT environment variable
/// Default: 8000
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000)
});

/// Root folder for per-request download directories
/// Read from DOWNLOAD_FOLDER environment variable
/// Supports tilde (~) expansion for home directory
/// Default: downloads (relative to the working directory)
pub static DOWNLOAD_FOLDER: Lazy<PathBuf> = Lazy::new(|| {
    let raw = env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "downloads".to_string());
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Generic downloader CLI binary path
/// Read from VIDEODL_BIN environment variable or defaults to "videodl"
pub static VIDEODL_BIN: Lazy<String> =
    Lazy::new(|| env::var("VIDEODL_BIN").unwrap_or_else(|_| "videodl".to_string()));

/// ffmpeg binary path (FFMPEG_BIN, default "ffmpeg")
pub static FFMPEG_BIN: Lazy<String> = Lazy::new(|| env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()));

/// ffprobe binary path (FFPROBE_BIN, default "ffprobe")
pub static FFPROBE_BIN: Lazy<String> =
    Lazy::new(|| env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string()));

/// Chrome/Chromium executable for the browser scraper
/// Read from CHROME_BIN environment variable
/// When unset, headless_chrome autodetects an installed browser
pub static CHROME_BIN: Lazy<Option<PathBuf>> = Lazy::new(|| {
    env::var("CHROME_BIN")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| PathBuf::from(shellexpand::tilde(&value).into_owned()))
});

/// Session cookies seeded into the Xiaohongshu browser context
/// Read from XHS_COOKIES environment variable as `name=value; name=value`
/// Default: only the public web app marker, which is enough for most public notes
pub static XHS_COOKIES: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    let raw = env::var("XHS_COOKIES").unwrap_or_else(|_| "xsecappid=xhs-pc-web".to_string());
    parse_cookie_list(&raw)
});

/// Parses a `name=value; name=value` list, skipping malformed pairs.
pub fn parse_cookie_list(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Download and fetch configuration
pub mod download {
    use super::Duration;

    /// Timeout for the generic downloader CLI (in seconds)
    pub const GENERIC_TIMEOUT_SECS: u64 = 300;

    /// Timeout for yt-dlp (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 300;

    /// Socket timeout handed to yt-dlp itself (in seconds)
    pub const YTDLP_SOCKET_TIMEOUT_SECS: u64 = 30;

    /// Retry count handed to yt-dlp itself
    pub const YTDLP_RETRIES: u32 = 3;

    /// Timeout for a merge or re-encode step (in seconds)
    pub const POSTPROCESS_TIMEOUT_SECS: u64 = 600;

    /// Timeout for each ffprobe query (in seconds)
    pub const PROBE_TIMEOUT_SECS: u64 = 10;

    /// Page navigation timeout in the browser scraper (in seconds)
    pub const BROWSER_NAVIGATION_TIMEOUT_SECS: u64 = 60;

    /// Settle period after navigation so the page's player issues its media requests
    pub const BROWSER_SETTLE_SECS: u64 = 5;

    /// Timeout for resolving a short link in the browser (in seconds)
    pub const SHORT_LINK_TIMEOUT_SECS: u64 = 30;

    /// Wait after short-link navigation for client-side redirects (in seconds)
    pub const SHORT_LINK_SETTLE_SECS: u64 = 2;

    /// Hard bound on the whole browser capture including launch (in seconds)
    pub const BROWSER_TOTAL_TIMEOUT_SECS: u64 = 120;

    /// HTTP timeout for fetching a captured video URL (in seconds)
    pub const VIDEO_HTTP_TIMEOUT_SECS: u64 = 120;

    /// HTTP timeout for fetching a captured image URL (in seconds)
    pub const IMAGE_HTTP_TIMEOUT_SECS: u64 = 60;

    /// Maximum number of captured images downloaded for one post
    pub const MAX_IMAGES: usize = 10;

    pub fn generic_timeout() -> Duration {
        Duration::from_secs(GENERIC_TIMEOUT_SECS)
    }

    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    pub fn postprocess_timeout() -> Duration {
        Duration::from_secs(POSTPROCESS_TIMEOUT_SECS)
    }

    pub fn probe_timeout() -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }

    pub fn browser_settle() -> Duration {
        Duration::from_secs(BROWSER_SETTLE_SECS)
    }
}

/// Delivery format required by Telegram clients
pub mod encoding {
    /// Container extension of a delivery-compatible artifact
    pub const CONTAINER: &str = "mp4";

    /// Codec name ffprobe reports for a delivery-compatible video stream
    pub const REQUIRED_VIDEO_CODEC: &str = "h264";

    /// Encoder used to produce REQUIRED_VIDEO_CODEC
    pub const VIDEO_ENCODER: &str = "libx264";

    pub const PRESET: &str = "fast";

    /// Constant rate factor for libx264
    pub const CRF: u8 = 23;

    pub const AUDIO_ENCODER: &str = "aac";

    pub const AUDIO_BITRATE: &str = "128k";
}

/// Delivery limits
pub mod delivery {
    /// Largest file the Bot API accepts for upload (50 MB)
    pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

    /// Error detail shown to users is cut to this many characters
    pub const ERROR_DETAIL_MAX_CHARS: usize = 100;
}

/// Web API configuration
pub mod web {
    use super::Duration;

    /// How long finished tasks and their files are kept (in seconds)
    pub const RETENTION_SECS: u64 = 3600;

    pub fn retention() -> Duration {
        Duration::from_secs(RETENTION_SECS)
    }
}

/// Animation configuration
pub mod animation {
    use super::Duration;

    /// Interval between status message edits (in milliseconds)
    pub const UPDATE_INTERVAL_MS: u64 = 800;

    /// Animation update interval duration
    pub fn update_interval() -> Duration {
        Duration::from_millis(UPDATE_INTERVAL_MS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Large enough for a 50 MB video upload on a slow link
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    /// Browser-like user agent used by the scraper and its HTTP fetches
    pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_list() {
        let cookies = parse_cookie_list("a1=abc; webId=def ;xsecappid=xhs-pc-web");
        assert_eq!(
            cookies,
            vec![
                ("a1".to_string(), "abc".to_string()),
                ("webId".to_string(), "def".to_string()),
                ("xsecappid".to_string(), "xhs-pc-web".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_cookie_list_skips_malformed() {
        assert!(parse_cookie_list("").is_empty());
        assert_eq!(parse_cookie_list("novalue; =x; k=v").len(), 1);
    }

    #[test]
    fn test_delivery_limit_is_50_mb() {
        assert_eq!(delivery::MAX_FILE_SIZE_BYTES, 52_428_800);
    }
}
