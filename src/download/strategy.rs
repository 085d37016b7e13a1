//! Download strategy selection.
//!
//! Classifies a URL by host and returns the ordered fallback chain of fetch
//! methods to attempt. The chain is plain data in [`PLATFORM_RULES`]: adding a
//! platform or re-ordering strategies never touches the dispatch loop in
//! the pipeline.

use serde::Serialize;
use std::fmt;
use url::Url;

/// One way of turning a URL into a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMethod {
    /// Generic multi-platform downloader CLI (videodl)
    GenericCli,
    /// Dedicated multi-site downloader (yt-dlp)
    YtDlp,
    /// Headless browser capture of media CDN traffic
    Browser,
}

impl FetchMethod {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::GenericCli => "videodl",
            FetchMethod::YtDlp => "yt-dlp",
            FetchMethod::Browser => "browser",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform family a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Xiaohongshu: captcha-protected, needs the browser scraper
    Xiaohongshu,
    /// Sites yt-dlp serves better than the generic downloader
    MultiSite,
    /// Short-video platforms the generic downloader handles
    ShortVideo,
}

/// Host allowlist for a platform and the methods to try, in order.
pub struct PlatformRule {
    pub platform: Platform,
    pub domains: &'static [&'static str],
    pub methods: &'static [FetchMethod],
}

/// Rules are checked top to bottom; the first whose allowlist matches wins.
pub const PLATFORM_RULES: &[PlatformRule] = &[
    PlatformRule {
        platform: Platform::Xiaohongshu,
        domains: &["xiaohongshu.com", "xhslink.com"],
        methods: &[FetchMethod::Browser, FetchMethod::GenericCli],
    },
    PlatformRule {
        platform: Platform::MultiSite,
        domains: &[
            "youtube.com",
            "youtu.be",
            "bilibili.com",
            "b23.tv",
            "twitter.com",
            "x.com",
            "instagram.com",
            "facebook.com",
            "fb.watch",
            "vimeo.com",
            "reddit.com",
            "twitch.tv",
            "dailymotion.com",
            "nicovideo.jp",
        ],
        methods: &[FetchMethod::YtDlp, FetchMethod::GenericCli],
    },
    PlatformRule {
        platform: Platform::ShortVideo,
        domains: &[
            "tiktok.com",
            "douyin.com",
            "iesdouyin.com",
            "weibo.com",
            "weibo.cn",
            "kuaishou.com",
            "pipix.com",
            "ixigua.com",
            "toutiao.com",
            "zhihu.com",
            "acfun.cn",
            "meipai.com",
            "pearvideo.com",
        ],
        methods: &[FetchMethod::GenericCli],
    },
];

/// Outcome of classifying a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Ordered, non-empty fallback chain; each method is tried at most once
    Methods { platform: Platform, methods: Vec<FetchMethod> },
    /// Host matches no known platform allowlist
    Unsupported,
}

/// Returns true if `host` is `domain` or a subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .map(|prefix| prefix.ends_with('.'))
            .unwrap_or(false)
}

/// Finds the platform rule whose allowlist contains the URL's host.
pub fn classify(url: &Url) -> Option<&'static PlatformRule> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.to_lowercase();
    PLATFORM_RULES
        .iter()
        .find(|rule| rule.domains.iter().any(|domain| host_matches(&host, domain)))
}

/// Chooses the ordered fetch methods for a raw URL string.
///
/// Deterministic: the same input always yields the same list, in rule order.
pub fn select_methods(raw_url: &str) -> Selection {
    let Ok(url) = Url::parse(raw_url.trim()) else {
        return Selection::Unsupported;
    };
    match classify(&url) {
        Some(rule) => Selection::Methods {
            platform: rule.platform,
            methods: rule.methods.to_vec(),
        },
        None => Selection::Unsupported,
    }
}

/// Short-link host for the captcha-protected platform.
pub fn is_xhs_short_link(url: &Url) -> bool {
    url.host_str()
        .map(|host| host_matches(&host.to_lowercase(), "xhslink.com"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn methods_for(url: &str) -> Vec<FetchMethod> {
        match select_methods(url) {
            Selection::Methods { methods, .. } => methods,
            Selection::Unsupported => Vec::new(),
        }
    }

    #[test]
    fn test_xiaohongshu_uses_browser_then_generic() {
        assert_eq!(
            methods_for("https://www.xiaohongshu.com/explore/64f1a2b3c4d5e6f708192a3b"),
            vec![FetchMethod::Browser, FetchMethod::GenericCli]
        );
        assert_eq!(
            methods_for("http://xhslink.com/a/AbCdEf"),
            vec![FetchMethod::Browser, FetchMethod::GenericCli]
        );
    }

    #[test]
    fn test_multi_site_prefers_ytdlp() {
        for url in [
            "https://www.youtube.com/shorts/abc123",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://m.bilibili.com/video/BV1xx411c7mD",
            "https://x.com/user/status/1",
        ] {
            assert_eq!(methods_for(url), vec![FetchMethod::YtDlp, FetchMethod::GenericCli], "{}", url);
        }
    }

    #[test]
    fn test_short_video_uses_generic_only() {
        assert_eq!(
            methods_for("https://www.tiktok.com/@user/video/7234567890"),
            vec![FetchMethod::GenericCli]
        );
        assert_eq!(methods_for("https://v.douyin.com/iRNBho5/"), vec![FetchMethod::GenericCli]);
    }

    #[test]
    fn test_unsupported_hosts() {
        for url in [
            "https://example.com/video.mp4",
            "https://notyoutube.com/watch?v=1",
            "ftp://youtube.com/file",
            "not a url",
            "",
        ] {
            assert_eq!(select_methods(url), Selection::Unsupported, "{}", url);
        }
    }

    #[test]
    fn test_host_match_is_case_insensitive() {
        assert_eq!(methods_for("https://WWW.YouTube.COM/watch?v=1"), vec![
            FetchMethod::YtDlp,
            FetchMethod::GenericCli
        ]);
    }

    #[test]
    fn test_selection_is_deterministic_and_unique() {
        for rule in PLATFORM_RULES {
            assert!(!rule.methods.is_empty());
            let mut seen = std::collections::HashSet::new();
            assert!(rule.methods.iter().all(|m| seen.insert(*m)), "duplicate method in chain");
        }
        let url = "https://www.instagram.com/reel/Cxyz/";
        assert_eq!(select_methods(url), select_methods(url));
    }

    #[test]
    fn test_is_xhs_short_link() {
        assert!(is_xhs_short_link(&Url::parse("http://xhslink.com/a/x").unwrap()));
        assert!(!is_xhs_short_link(
            &Url::parse("https://www.xiaohongshu.com/explore/abc").unwrap()
        ));
    }
}
