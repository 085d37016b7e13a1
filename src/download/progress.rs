use serde::Serialize;
use url::Url;

use crate::download::strategy::FetchMethod;

/// Returns a display name for the source (host) of a URL.
pub fn source_display_name(url: &str) -> &'static str {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()));
    match host.as_deref() {
        Some(h) if h.contains("xiaohongshu") || h.contains("xhslink") => "Xiaohongshu",
        Some(h) if h.contains("douyin") => "Douyin",
        Some(h) if h.contains("tiktok") => "TikTok",
        Some(h) if h.contains("youtube") || h.contains("youtu.be") => "YouTube",
        Some(h) if h.contains("bilibili") || h.contains("b23.tv") => "Bilibili",
        Some(h) if h.contains("instagram") => "Instagram",
        Some(h) if h.contains("twitter") || h == "x.com" || h.ends_with(".x.com") => "X",
        Some(h) if h.contains("weibo") => "Weibo",
        Some(h) if h.contains("kuaishou") => "Kuaishou",
        Some(h) if h.contains("vimeo") => "Vimeo",
        Some(h) if h.contains("reddit") => "Reddit",
        _ => "Web",
    }
}

/// Internal pipeline step, published through a `watch` channel.
///
/// Only the four task statuses are externally meaningful; the stage is a
/// human-readable label shown next to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "method")]
pub enum PipelineStage {
    Queued,
    Fetching(FetchMethod),
    Locating,
    Probing,
    PostProcessing,
    Finished,
}

impl PipelineStage {
    /// Short label for status messages.
    pub fn label(&self) -> String {
        match self {
            PipelineStage::Queued => "Queued".to_string(),
            PipelineStage::Fetching(method) => format!("Downloading via {}", method),
            PipelineStage::Locating => "Looking for the file".to_string(),
            PipelineStage::Probing => "Inspecting video".to_string(),
            PipelineStage::PostProcessing => "Converting for Telegram".to_string(),
            PipelineStage::Finished => "Done".to_string(),
        }
    }
}
