//! Media inspection via ffprobe.
//!
//! Every query is best-effort: a missing tool, a timeout or unparsable output
//! yields "unknown" (`None` / `false`) and never an error.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use tokio::process::Command;

use crate::core::config;
use crate::core::process::run_with_timeout;

/// Structural metadata of a media file. Recomputed whenever needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaProbe {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Codec name of the first video stream, lowercase as ffprobe reports it
    pub codec: Option<String>,
    pub has_audio: bool,
}

impl MediaProbe {
    /// True when the artifact can be delivered without re-encoding:
    /// the container extension is mp4 and the video codec is h264.
    pub fn is_delivery_compatible(&self, path: &Path) -> bool {
        let container_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(config::encoding::CONTAINER))
            .unwrap_or(false);
        let codec_ok = self
            .codec
            .as_deref()
            .map(|c| c.eq_ignore_ascii_case(config::encoding::REQUIRED_VIDEO_CODEC))
            .unwrap_or(false);
        container_ok && codec_ok
    }
}

/// Seam over the probing tool so the pipeline can be driven without ffprobe.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaProbe;
}

/// [`MediaProber`] backed by the ffprobe binary.
pub struct FfprobeInspector {
    bin: String,
}

impl Default for FfprobeInspector {
    fn default() -> Self {
        Self::new(config::FFPROBE_BIN.as_str())
    }
}

impl FfprobeInspector {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Runs ffprobe with the given stream selector and entries, returning trimmed stdout.
    async fn query(&self, path: &Path, select: &str, entries: &str) -> Option<String> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-v", "error", "-select_streams", select, "-show_entries", entries, "-of", "csv=p=0"])
            .arg(path);

        match run_with_timeout(&mut cmd, config::download::probe_timeout()).await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                log::debug!("ffprobe {} on {} exited with {}", entries, path.display(), output.status);
                None
            }
            Err(e) => {
                log::debug!("ffprobe {} on {} failed: {}", entries, path.display(), e);
                None
            }
        }
    }

    pub async fn dimensions(&self, path: &Path) -> (Option<u32>, Option<u32>) {
        self.query(path, "v:0", "stream=width,height")
            .await
            .map(|out| parse_dimensions(&out))
            .unwrap_or((None, None))
    }

    pub async fn video_codec(&self, path: &Path) -> Option<String> {
        let out = self.query(path, "v:0", "stream=codec_name").await?;
        let codec = out.lines().next()?.trim().to_lowercase();
        (!codec.is_empty()).then_some(codec)
    }

    pub async fn has_audio(&self, path: &Path) -> bool {
        self.query(path, "a", "stream=codec_type")
            .await
            .map(|out| out.lines().any(|line| line.trim() == "audio"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MediaProber for FfprobeInspector {
    async fn probe(&self, path: &Path) -> MediaProbe {
        let (width, height) = self.dimensions(path).await;
        let codec = self.video_codec(path).await;
        let has_audio = self.has_audio(path).await;
        log::debug!(
            "Probed {}: {:?}x{:?} codec={:?} audio={}",
            path.display(),
            width,
            height,
            codec,
            has_audio
        );
        MediaProbe {
            width,
            height,
            codec,
            has_audio,
        }
    }
}

/// Parses `1080,1920` (first line) into width and height.
fn parse_dimensions(out: &str) -> (Option<u32>, Option<u32>) {
    let Some(line) = out.lines().next() else {
        return (None, None);
    };
    let mut parts = line.split(',').map(|p| p.trim().parse::<u32>().ok().filter(|v| *v > 0));
    let width = parts.next().flatten();
    let height = parts.next().flatten();
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn probe_with(codec: Option<&str>) -> MediaProbe {
        MediaProbe {
            codec: codec.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_compatibility_requires_mp4_and_h264() {
        let mp4 = PathBuf::from("clip.mp4");
        assert!(probe_with(Some("h264")).is_delivery_compatible(&mp4));
        assert!(probe_with(Some("H264")).is_delivery_compatible(&PathBuf::from("clip.MP4")));
        assert!(!probe_with(Some("hevc")).is_delivery_compatible(&mp4));
        assert!(!probe_with(None).is_delivery_compatible(&mp4));
        assert!(!probe_with(Some("h264")).is_delivery_compatible(&PathBuf::from("clip.mkv")));
        assert!(!probe_with(Some("h264")).is_delivery_compatible(&PathBuf::from("clip")));
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1080,1920\n"), (Some(1080), Some(1920)));
        assert_eq!(parse_dimensions(""), (None, None));
        assert_eq!(parse_dimensions("N/A,720"), (None, Some(720)));
        assert_eq!(parse_dimensions("0,0"), (None, None));
    }

    #[tokio::test]
    async fn test_missing_probe_tool_yields_unknowns() {
        let inspector = FfprobeInspector::new("definitely-not-a-real-ffprobe");
        let probe = inspector.probe(Path::new("/nonexistent/clip.mp4")).await;
        assert_eq!(probe, MediaProbe::default());
    }
}
