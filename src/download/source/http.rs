//! Direct media fetch over HTTP.
//!
//! Used by the browser executor once it has captured CDN URLs: the page's
//! own requests are not reused, each media URL is fetched again with a
//! browser-like user agent and the site's referer.
//! Features:
//! - Chunked download via `bytes_stream`, written straight to disk
//! - Per-request timeout so one slow image cannot stall a gallery
//! - Partial files removed on failure

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::core::config;
use crate::download::error::DownloadError;

/// HTTP client carrying the headers CDNs expect from a browser.
#[derive(Clone)]
pub struct MediaFetcher {
    client: Client,
}

impl MediaFetcher {
    /// Builds a client that sends `referer` on every request.
    pub fn new(referer: &str) -> Result<Self, DownloadError> {
        let mut headers = HeaderMap::new();
        let referer =
            HeaderValue::from_str(referer).map_err(|e| DownloadError::Http(format!("Invalid referer: {}", e)))?;
        headers.insert(REFERER, referer);

        let client = Client::builder()
            .user_agent(config::network::BROWSER_USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DownloadError::Http(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client })
    }

    /// Streams `url` into `dest`, returning the number of bytes written.
    pub async fn download_to(&self, url: &str, dest: &Path, timeout: Duration) -> Result<u64, DownloadError> {
        match tokio::time::timeout(timeout, self.stream_to_file(url, dest)).await {
            Ok(Ok(written)) => Ok(written),
            Ok(Err(e)) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
            Err(_) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(DownloadError::Timeout(format!(
                    "HTTP fetch timed out after {}s",
                    timeout.as_secs()
                )))
            }
        }
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Http(format!("HTTP {} for {}", response.status(), url)));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(DownloadError::Http(format!("Empty body for {}", url)));
        }
        log::info!("✅ Fetched {} ({:.2} MB)", dest.display(), written as f64 / (1024.0 * 1024.0));
        Ok(written)
    }
}
