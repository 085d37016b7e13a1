//! Xiaohongshu executor: headless browser capture of media CDN traffic.
//!
//! Xiaohongshu serves a captcha to plain HTTP clients, so the note page is
//! opened in a real browser seeded with session cookies. Every response whose
//! URL looks like a video or image on the media CDN is recorded while the
//! page's player loads; the recorded URLs are then fetched directly.
//!
//! A video beats images: if any video URL was seen only the first one is
//! downloaded. Otherwise up to `MAX_IMAGES` images are downloaded and the
//! post is delivered as a gallery.

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::{CookieParam, GetResponseBodyReturnObject};
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::core::config;
use crate::download::error::DownloadError;
use crate::download::source::http::MediaFetcher;
use crate::download::source::{FetchExecutor, FetchMethod, FetchRequest, FetchResult};
use crate::download::strategy::is_xhs_short_link;

/// Domain the session cookies are scoped to.
const XHS_COOKIE_DOMAIN: &str = ".xiaohongshu.com";

/// Referer the media CDN expects.
pub const XHS_REFERER: &str = "https://www.xiaohongshu.com/";

#[allow(clippy::expect_used)]
static NOTE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:explore|discovery/item)/([0-9a-fA-F]+)").expect("note id pattern is a valid regex"));

/// What a captured CDN URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturedKind {
    Video,
    Image,
}

/// Classifies a response URL seen by the browser, or `None` for anything
/// that is not note media.
pub fn classify_media_url(url: &str) -> Option<CapturedKind> {
    if url.contains("sns-video") && url.contains(".mp4") {
        return Some(CapturedKind::Video);
    }
    if (url.contains("sns-webpic") || url.contains("sns-img"))
        && [".jpg", ".png", ".webp"].iter().any(|ext| url.contains(ext))
    {
        return Some(CapturedKind::Image);
    }
    None
}

/// Captured media URLs split by kind, de-duplicated in first-seen order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CapturedMedia {
    pub videos: Vec<String>,
    pub images: Vec<String>,
}

impl CapturedMedia {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut media = Self::default();
        for url in urls {
            let url = url.as_ref();
            let Some(kind) = classify_media_url(url) else {
                continue;
            };
            if !seen.insert(url.to_string()) {
                continue;
            }
            match kind {
                CapturedKind::Video => media.videos.push(url.to_string()),
                CapturedKind::Image => media.images.push(url.to_string()),
            }
        }
        media
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.images.is_empty()
    }
}

/// Note id from `/explore/<hex>` or `/discovery/item/<hex>`.
pub fn note_id(url: &str) -> Option<String> {
    NOTE_ID_PATTERN.captures(url).map(|c| c[1].to_string())
}

/// `xhs_<note id>.mp4`, or `xhs_video.mp4` when the URL carries no id.
pub fn video_file_name(url: &str) -> String {
    format!("xhs_{}.mp4", note_id(url).unwrap_or_else(|| "video".to_string()))
}

/// `xhs_image_<n>.<ext>` with the extension taken from the URL (jpg if unclear).
pub fn image_file_name(index: usize, url: &str) -> String {
    let ext = [("png", ".png"), ("webp", ".webp"), ("jpg", ".jpg")]
        .iter()
        .find(|(_, needle)| url.contains(needle))
        .map(|(ext, _)| *ext)
        .unwrap_or("jpg");
    format!("xhs_image_{}.{}", index + 1, ext)
}

/// Browser seam: short-link resolution and passive capture of response URLs.
#[async_trait]
pub trait PageCapture: Send + Sync {
    /// Follows a short link and returns the page URL it lands on.
    async fn resolve(&self, url: &str) -> Result<String, DownloadError>;

    /// Opens `url`, waits for the page to settle and returns every response URL seen.
    async fn capture(&self, url: &str) -> Result<Vec<String>, DownloadError>;
}

/// [`PageCapture`] driving a local Chrome/Chromium through headless_chrome.
///
/// headless_chrome is synchronous, so each call runs on the blocking pool
/// with its own browser and an isolated context.
pub struct ChromeCapture {
    chrome_bin: Option<PathBuf>,
    cookies: Vec<(String, String)>,
}

impl Default for ChromeCapture {
    fn default() -> Self {
        Self::new(config::CHROME_BIN.clone(), config::XHS_COOKIES.clone())
    }
}

type BrowserResult<T> = Result<T, anyhow::Error>;

impl ChromeCapture {
    pub fn new(chrome_bin: Option<PathBuf>, cookies: Vec<(String, String)>) -> Self {
        Self { chrome_bin, cookies }
    }

    /// Session cookies scoped to the site, so neither the CDN nor third-party
    /// origins receive them and cookies the site sets itself survive.
    fn session_cookies(&self) -> Vec<CookieParam> {
        self.cookies
            .iter()
            .map(|(name, value)| CookieParam {
                name: name.clone(),
                value: value.clone(),
                url: None,
                domain: Some(XHS_COOKIE_DOMAIN.to_string()),
                path: Some("/".to_string()),
                secure: None,
                http_only: None,
                same_site: None,
                expires: None,
                priority: None,
                same_party: None,
                source_scheme: None,
                source_port: None,
                partition_key: None,
            })
            .collect()
    }

    fn launch(chrome_bin: Option<PathBuf>) -> BrowserResult<Browser> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(chrome_bin)
            .idle_browser_timeout(Duration::from_secs(config::download::BROWSER_TOTAL_TIMEOUT_SECS))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build launch options: {}", e))?;
        Browser::new(options)
    }

    /// Runs a blocking browser session under the overall capture bound.
    async fn run_session<T, F>(&self, label: &'static str, session: F) -> Result<T, DownloadError>
    where
        T: Send + 'static,
        F: FnOnce(Option<PathBuf>, Vec<CookieParam>) -> BrowserResult<T> + Send + 'static,
    {
        let chrome_bin = self.chrome_bin.clone();
        let cookies = self.session_cookies();
        let bound = Duration::from_secs(config::download::BROWSER_TOTAL_TIMEOUT_SECS);
        let task = tokio::task::spawn_blocking(move || session(chrome_bin, cookies));

        match tokio::time::timeout(bound, task).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(DownloadError::Browser(format!("{} failed: {}", label, e))),
            Ok(Err(join_err)) => Err(DownloadError::Browser(format!("{} task panicked: {}", label, join_err))),
            Err(_) => Err(DownloadError::Timeout(format!(
                "{} exceeded {}s",
                label,
                bound.as_secs()
            ))),
        }
    }
}

fn seed_cookies(tab: &Tab, cookies: Vec<CookieParam>) -> BrowserResult<()> {
    if !cookies.is_empty() {
        tab.set_cookies(cookies)?;
    }
    Ok(())
}

#[async_trait]
impl PageCapture for ChromeCapture {
    async fn resolve(&self, url: &str) -> Result<String, DownloadError> {
        let url = url.to_string();
        self.run_session("short link resolution", move |chrome_bin, cookies| {
            let browser = Self::launch(chrome_bin)?;
            let context = browser.new_context()?;
            let tab = context.new_tab()?;
            tab.set_default_timeout(Duration::from_secs(config::download::SHORT_LINK_TIMEOUT_SECS));
            tab.set_user_agent(config::network::BROWSER_USER_AGENT, None, None)?;
            seed_cookies(&tab, cookies)?;
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            std::thread::sleep(Duration::from_secs(config::download::SHORT_LINK_SETTLE_SECS));
            Ok(tab.get_url())
        })
        .await
    }

    async fn capture(&self, url: &str) -> Result<Vec<String>, DownloadError> {
        let url = url.to_string();
        self.run_session("page capture", move |chrome_bin, cookies| {
            let browser = Self::launch(chrome_bin)?;
            let context = browser.new_context()?;
            let tab = context.new_tab()?;
            tab.set_default_timeout(Duration::from_secs(config::download::BROWSER_NAVIGATION_TIMEOUT_SECS));
            tab.set_user_agent(config::network::BROWSER_USER_AGENT, None, None)?;
            seed_cookies(&tab, cookies)?;

            let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            tab.register_response_handling(
                "media-capture",
                Box::new(
                    move |params: ResponseReceivedEventParams,
                          _body: &dyn Fn() -> Result<GetResponseBodyReturnObject, anyhow::Error>| {
                        let response_url = params.response.url;
                        if classify_media_url(&response_url).is_some() {
                            let mut urls = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                            urls.push(response_url);
                        }
                    },
                ),
            )?;

            tab.navigate_to(&url)?;
            if let Err(e) = tab.wait_until_navigated() {
                log::warn!("Navigation to {} did not finish cleanly: {}", url, e);
            }
            std::thread::sleep(config::download::browser_settle());

            let urls = seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone();
            Ok(urls)
        })
        .await
    }
}

/// Browser-capture executor for Xiaohongshu notes.
pub struct XhsExecutor {
    capture: Arc<dyn PageCapture>,
    referer: String,
}

impl Default for XhsExecutor {
    fn default() -> Self {
        Self::new(Arc::new(ChromeCapture::default()))
    }
}

impl XhsExecutor {
    pub fn new(capture: Arc<dyn PageCapture>) -> Self {
        Self {
            capture,
            referer: XHS_REFERER.to_string(),
        }
    }

    /// Resolves xhslink.com short links; any failure falls back to the input URL.
    pub async fn canonical_url(&self, raw: &str) -> String {
        let is_short = Url::parse(raw).map(|u| is_xhs_short_link(&u)).unwrap_or(false);
        if !is_short {
            return raw.to_string();
        }
        match self.capture.resolve(raw).await {
            Ok(resolved) if !resolved.is_empty() && resolved != "about:blank" => {
                log::info!("🔗 Resolved {} -> {}", raw, resolved);
                resolved
            }
            Ok(_) => {
                log::warn!("Short link {} resolved to nothing, using it as is", raw);
                raw.to_string()
            }
            Err(e) => {
                log::warn!("Short link resolution failed for {}, using it as is: {}", raw, e);
                raw.to_string()
            }
        }
    }

    async fn download_images(
        &self,
        fetcher: &MediaFetcher,
        images: &[String],
        dir: &Path,
    ) -> Result<FetchResult, DownloadError> {
        let timeout = Duration::from_secs(config::download::IMAGE_HTTP_TIMEOUT_SECS);
        let mut saved = Vec::new();
        for (index, image_url) in images.iter().take(config::download::MAX_IMAGES).enumerate() {
            let dest = dir.join(image_file_name(index, image_url));
            match fetcher.download_to(image_url, &dest, timeout).await {
                Ok(_) => saved.push(dest),
                Err(e) => log::warn!("Image {} failed: {}", index + 1, e),
            }
        }
        if saved.is_empty() {
            return Err(DownloadError::Http("No captured image could be downloaded".to_string()));
        }
        log::info!("🖼️ Downloaded {} image(s)", saved.len());
        Ok(FetchResult::images(saved))
    }
}

#[async_trait]
impl FetchExecutor for XhsExecutor {
    fn method(&self) -> FetchMethod {
        FetchMethod::Browser
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DownloadError> {
        let url = self.canonical_url(&request.url).await;
        log::info!("🌐 Browser capture: {}", url);

        let captured = CapturedMedia::from_urls(self.capture.capture(&url).await?);
        log::info!(
            "Captured {} video and {} image URL(s)",
            captured.videos.len(),
            captured.images.len()
        );
        if captured.is_empty() {
            return Err(DownloadError::Browser("No media URL captured from the page".to_string()));
        }

        let fetcher = MediaFetcher::new(&self.referer)?;
        if let Some(video_url) = captured.videos.first() {
            let dest = request.target_dir.join(video_file_name(&url));
            let timeout = Duration::from_secs(config::download::VIDEO_HTTP_TIMEOUT_SECS);
            fetcher.download_to(video_url, &dest, timeout).await?;
            return Ok(FetchResult::video(dest));
        }

        self.download_images(&fetcher, &captured.images, &request.target_dir)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::source::MediaKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_session_cookies_are_scoped_to_site() {
        let capture = ChromeCapture::new(
            None,
            vec![
                ("web_session".to_string(), "abc".to_string()),
                ("xsecappid".to_string(), "xhs-pc-web".to_string()),
            ],
        );
        let cookies = capture.session_cookies();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "web_session");
        assert_eq!(cookies[0].value, "abc");
        for cookie in &cookies {
            assert_eq!(cookie.domain.as_deref(), Some(".xiaohongshu.com"));
            assert_eq!(cookie.path.as_deref(), Some("/"));
            assert_eq!(cookie.url, None);
        }
        assert!(ChromeCapture::new(None, Vec::new()).session_cookies().is_empty());
    }

    struct FakeCapture {
        resolved: Result<String, ()>,
        urls: Vec<String>,
    }

    #[async_trait]
    impl PageCapture for FakeCapture {
        async fn resolve(&self, _url: &str) -> Result<String, DownloadError> {
            self.resolved
                .clone()
                .map_err(|_| DownloadError::Browser("resolution failed".into()))
        }

        async fn capture(&self, _url: &str) -> Result<Vec<String>, DownloadError> {
            Ok(self.urls.clone())
        }
    }

    fn executor(resolved: Result<String, ()>, urls: Vec<String>) -> XhsExecutor {
        XhsExecutor::new(Arc::new(FakeCapture { resolved, urls }))
    }

    #[test]
    fn test_classify_media_url() {
        assert_eq!(
            classify_media_url("https://sns-video-bd.xhscdn.com/stream/110/abc.mp4"),
            Some(CapturedKind::Video)
        );
        assert_eq!(
            classify_media_url("https://sns-webpic-qc.xhscdn.com/202401/abc.webp"),
            Some(CapturedKind::Image)
        );
        assert_eq!(classify_media_url("https://sns-img-hw.xhscdn.com/abc.jpg"), Some(CapturedKind::Image));
        assert_eq!(classify_media_url("https://sns-webpic-qc.xhscdn.com/avatar"), None);
        assert_eq!(classify_media_url("https://www.xiaohongshu.com/explore/abc"), None);
    }

    #[test]
    fn test_captured_media_dedups_in_order() {
        let media = CapturedMedia::from_urls([
            "https://sns-img-a/1.jpg",
            "https://sns-video-a/v.mp4",
            "https://sns-img-a/1.jpg",
            "https://sns-img-a/2.png",
            "https://other/x.js",
        ]);
        assert_eq!(media.videos, vec!["https://sns-video-a/v.mp4".to_string()]);
        assert_eq!(
            media.images,
            vec!["https://sns-img-a/1.jpg".to_string(), "https://sns-img-a/2.png".to_string()]
        );
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            video_file_name("https://www.xiaohongshu.com/explore/64f1a2b3c4d5e6f7?xsec_token=1"),
            "xhs_64f1a2b3c4d5e6f7.mp4"
        );
        assert_eq!(
            video_file_name("https://www.xiaohongshu.com/discovery/item/abc123"),
            "xhs_abc123.mp4"
        );
        assert_eq!(video_file_name("http://xhslink.com/a/Zz"), "xhs_video.mp4");
        assert_eq!(image_file_name(0, "https://sns-img/x.webp"), "xhs_image_1.webp");
        assert_eq!(image_file_name(2, "https://sns-img/x"), "xhs_image_3.jpg");
    }

    #[tokio::test]
    async fn test_short_link_resolution_falls_back_to_original() {
        let failing = executor(Err(()), Vec::new());
        assert_eq!(
            failing.canonical_url("http://xhslink.com/a/AbC").await,
            "http://xhslink.com/a/AbC"
        );

        let working = executor(Ok("https://www.xiaohongshu.com/explore/abc".into()), Vec::new());
        assert_eq!(
            working.canonical_url("http://xhslink.com/a/AbC").await,
            "https://www.xiaohongshu.com/explore/abc"
        );
        assert_eq!(
            working.canonical_url("https://www.xiaohongshu.com/explore/def").await,
            "https://www.xiaohongshu.com/explore/def",
            "canonical URLs are not resolved"
        );
    }

    #[tokio::test]
    async fn test_video_takes_priority_over_images() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sns-video/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sns-img/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image".to_vec()))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let exec = executor(
            Ok(String::new()),
            vec![
                format!("{}/sns-img/1.jpg", server.uri()),
                format!("{}/sns-video/clip.mp4", server.uri()),
            ],
        );
        let request = FetchRequest::new("https://www.xiaohongshu.com/explore/abc123", dir.path());
        let result = exec.fetch(&request).await.unwrap();

        assert_eq!(result.kind, MediaKind::Video);
        assert_eq!(result.artifact_path, Some(dir.path().join("xhs_abc123.mp4")));
    }

    #[tokio::test]
    async fn test_images_downloaded_when_no_video() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sns-img/1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"one".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sns-img/2.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sns-img/3.webp"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"three".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let exec = executor(
            Ok(String::new()),
            ["1.jpg", "2.png", "3.webp"]
                .iter()
                .map(|name| format!("{}/sns-img/{}", server.uri(), name))
                .collect(),
        );
        let request = FetchRequest::new("https://www.xiaohongshu.com/explore/abc", dir.path());
        let result = exec.fetch(&request).await.unwrap();

        assert_eq!(result.kind, MediaKind::Image);
        assert_eq!(
            result.gallery,
            vec![dir.path().join("xhs_image_1.jpg"), dir.path().join("xhs_image_3.webp")]
        );
    }

    #[tokio::test]
    async fn test_nothing_captured_is_browser_error() {
        let dir = TempDir::new().unwrap();
        let exec = executor(Ok(String::new()), vec!["https://example.com/app.js".into()]);
        let request = FetchRequest::new("https://www.xiaohongshu.com/explore/abc", dir.path());
        assert!(matches!(exec.fetch(&request).await, Err(DownloadError::Browser(_))));
    }
}
