//! Post-processing: audio merge or re-encode into a delivery-compatible mp4.
//!
//! The decision is taken once per artifact. Merge and re-encode are mutually
//! exclusive, and a failed step always leaves the original artifact in place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::core::config;
use crate::core::metrics;
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;
use crate::download::locator::locate_audio_companion;
use crate::download::probe::MediaProbe;

/// File name of a merged video+audio artifact.
pub const MERGED_FILE_NAME: &str = "merged.mp4";

/// Used when the downloaded video itself is called `merged.mp4`.
const MERGED_ALT_FILE_NAME: &str = "merged_av.mp4";

/// Seam over the encoder.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Muxes `video` and `audio` into `output`, re-encoding both streams.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DownloadError>;

    /// Re-encodes `input` into a delivery-compatible `output`.
    async fn reencode(&self, input: &Path, output: &Path) -> Result<(), DownloadError>;
}

/// [`Transcoder`] backed by the ffmpeg binary.
pub struct FfmpegTranscoder {
    bin: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(config::FFMPEG_BIN.as_str())
    }
}

/// Encoder arguments shared by merge and re-encode.
fn encode_args() -> Vec<String> {
    use config::encoding::*;
    vec![
        "-c:v".into(),
        VIDEO_ENCODER.into(),
        "-preset".into(),
        PRESET.into(),
        "-crf".into(),
        CRF.to_string(),
        "-c:a".into(),
        AUDIO_ENCODER.into(),
        "-b:a".into(),
        AUDIO_BITRATE.into(),
        "-movflags".into(),
        "+faststart".into(),
    ]
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn run(&self, inputs: &[&Path], output: &Path) -> Result<(), DownloadError> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        for input in inputs {
            cmd.arg("-i").arg(input);
        }
        if inputs.len() > 1 {
            cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
        }
        cmd.args(encode_args()).arg("-y").arg(output);

        let output_result = run_with_timeout(&mut cmd, config::download::postprocess_timeout()).await?;
        if !output_result.status.success() {
            return Err(DownloadError::Ffmpeg(format!(
                "ffmpeg exited with {}: {}",
                output_result.status,
                stderr_tail(&output_result, 300)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), DownloadError> {
        self.run(&[video, audio], output).await
    }

    async fn reencode(&self, input: &Path, output: &Path) -> Result<(), DownloadError> {
        self.run(&[input], output).await
    }
}

/// What post-processing did to an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostProcessAction {
    None,
    Merged,
    MergeFailed,
    Reencoded,
    ReencodeFailed,
}

impl PostProcessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostProcessAction::None => "none",
            PostProcessAction::Merged => "merged",
            PostProcessAction::MergeFailed => "merge_failed",
            PostProcessAction::Reencoded => "reencoded",
            PostProcessAction::ReencodeFailed => "reencode_failed",
        }
    }
}

/// Result of [`post_process`]: the artifact to deliver and how it was obtained.
#[derive(Debug, Clone)]
pub struct PostProcessOutcome {
    pub artifact: PathBuf,
    pub action: PostProcessAction,
}

/// Output path for a re-encode of `input`: `<stem>_h264.mp4` next to it.
/// Merge output in `dir`, never the input video itself.
pub fn merge_target(dir: &Path, video: &Path) -> PathBuf {
    let merged = dir.join(MERGED_FILE_NAME);
    if merged == video {
        dir.join(MERGED_ALT_FILE_NAME)
    } else {
        merged
    }
}

pub fn reencode_target(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    input.with_file_name(format!("{}_h264.{}", stem, config::encoding::CONTAINER))
}

/// A step "succeeded" only if the tool exited cleanly and left a non-empty file.
async fn produced_file(result: &Result<(), DownloadError>, output: &Path) -> bool {
    if result.is_err() {
        return false;
    }
    match tokio::fs::metadata(output).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

fn record(action: &str, ok: bool) {
    metrics::POSTPROCESS_TOTAL
        .with_label_values(&[action, if ok { "ok" } else { "failed" }])
        .inc();
}

/// Merges a companion audio track or re-encodes, at most once.
///
/// 1. A companion audio file exists in `dir` and `probe` reports no audio:
///    merge into `dir/merged.mp4`, deleting both originals on success.
/// 2. Otherwise, if the artifact is not delivery-compatible: re-encode,
///    deleting the original on success.
///
/// On failure the original artifact is returned untouched and any partial
/// output is removed.
pub async fn post_process(
    transcoder: &dyn Transcoder,
    dir: &Path,
    artifact: &Path,
    probe: &MediaProbe,
) -> PostProcessOutcome {
    let companion = {
        let dir = dir.to_path_buf();
        let exclude = artifact.to_path_buf();
        tokio::task::spawn_blocking(move || locate_audio_companion(&dir, &exclude))
            .await
            .unwrap_or(None)
    };

    if let (Some(audio), false) = (companion, probe.has_audio) {
        let merged = merge_target(dir, artifact);
        log::info!("🔀 Merging {} with {}", artifact.display(), audio.display());
        let result = transcoder.merge(artifact, &audio, &merged).await;
        if produced_file(&result, &merged).await {
            record("merge", true);
            remove_quietly(artifact).await;
            remove_quietly(&audio).await;
            return PostProcessOutcome {
                artifact: merged,
                action: PostProcessAction::Merged,
            };
        }
        record("merge", false);
        if let Err(e) = result {
            log::warn!("Merge failed, delivering silent video: {}", e);
        }
        remove_quietly(&merged).await;
        return PostProcessOutcome {
            artifact: artifact.to_path_buf(),
            action: PostProcessAction::MergeFailed,
        };
    }

    if probe.is_delivery_compatible(artifact) {
        return PostProcessOutcome {
            artifact: artifact.to_path_buf(),
            action: PostProcessAction::None,
        };
    }

    let target = reencode_target(artifact);
    log::info!(
        "🎞️ Re-encoding {} (codec {:?}) to {}",
        artifact.display(),
        probe.codec,
        target.display()
    );
    let result = transcoder.reencode(artifact, &target).await;
    if produced_file(&result, &target).await {
        record("reencode", true);
        remove_quietly(artifact).await;
        return PostProcessOutcome {
            artifact: target,
            action: PostProcessAction::Reencoded,
        };
    }
    record("reencode", false);
    if let Err(e) = result {
        log::warn!("Re-encode failed, delivering original: {}", e);
    }
    remove_quietly(&target).await;
    PostProcessOutcome {
        artifact: artifact.to_path_buf(),
        action: PostProcessAction::ReencodeFailed,
    }
}
