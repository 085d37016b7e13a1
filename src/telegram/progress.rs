//! Texts of the evolving status message and the final replies.

use std::time::Duration;

use crate::core::utils::{format_elapsed, format_size};

const MB: f64 = 1024.0 * 1024.0;

/// `/start` and `/help` reply.
pub fn welcome_text() -> String {
    [
        "👋 Send me a link and I'll send the video back.",
        "",
        "Supported: TikTok, Douyin, Xiaohongshu, YouTube, Bilibili, Instagram, X, Weibo, Kuaishou and more.",
        "Share text works too, I'll find the link in it.",
    ]
    .join("\n")
}

pub fn no_url_text() -> &'static str {
    "🔗 I couldn't find a link in that message. Paste a video URL or the platform's share text."
}

/// Animated status: dots cycle with `tick`, then the stage and elapsed time.
pub fn status_text(source: &str, tick: usize, elapsed: Duration, stage: &str) -> String {
    let dots = ".".repeat(tick % 3 + 1);
    format!(
        "⏳ Downloading from {}{}\n{}\n⏱ {}",
        source,
        dots,
        stage,
        format_elapsed(elapsed)
    )
}

pub fn success_text(size_bytes: u64, elapsed: Duration) -> String {
    format!(
        "✅ Downloaded {} in {}, uploading...",
        format_size(size_bytes),
        format_elapsed(elapsed)
    )
}

pub fn too_large_text(size_bytes: u64, limit_bytes: u64) -> String {
    format!(
        "❌ The file is {:.1} MB, over the {:.0} MB Telegram limit.",
        size_bytes as f64 / MB,
        limit_bytes as f64 / MB
    )
}

/// `detail` is already capped by the caller.
pub fn failure_text(detail: &str) -> String {
    format!("❌ Download failed: {}", detail)
}

pub fn upload_failed_text() -> &'static str {
    "❌ Downloaded, but Telegram rejected the upload. Please try again later."
}
