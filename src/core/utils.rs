use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Matches an http(s) URL inside free text, stopping at whitespace, quotes,
/// angle brackets and the other characters share sheets wrap links in.
#[allow(clippy::expect_used)]
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("URL pattern is a valid regex"));

/// Extracts the first http(s) URL from text that may contain extra content.
///
/// Share buttons on Douyin, Xiaohongshu and TikTok paste a caption around the
/// link, so the whole message is scanned rather than parsed as a URL.
///
/// # Example
///
/// ```
/// use shortgrab::core::utils::extract_first_url;
///
/// let text = "Look at this 😂 https://v.douyin.com/iRNBho5/ copy and open";
/// assert_eq!(extract_first_url(text).as_deref(), Some("https://v.douyin.com/iRNBho5/"));
/// assert_eq!(extract_first_url("no link here"), None);
/// ```
pub fn extract_first_url(text: &str) -> Option<String> {
    URL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Cuts `text` to at most `max_chars` characters, respecting UTF-8 boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Formats a byte count as B/KB/MB/GB with two decimals.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} TB", value)
}

/// Formats elapsed time: `12.3s` below a minute, `2m 5s` above.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let total = elapsed.as_secs();
        format!("{}m {}s", total / 60, total % 60)
    }
}
