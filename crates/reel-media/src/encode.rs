//! Concat-demuxer encoding of ordered frames into an MP4.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;
use reel_models::encoding::{
    AUDIO_BITRATE, AUDIO_CODEC, MANIFEST_FILE_NAME, MUSIC_VOLUME, OUTPUT_FPS, PIXEL_FORMAT,
    VIDEO_CODEC, VIDEO_FILE_NAME,
};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{letterbox_filter, volume_filter};
use crate::stages::{EncodeJob, Encoder};

/// Quote a path for the concat demuxer.
fn quote_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Build the concat manifest.
///
/// The last frame appears a second time without a duration; the demuxer
/// ignores the final `duration` directive otherwise. Durations are written
/// at full precision.
pub fn build_manifest(frames: &[PathBuf], duration_per_frame: f64) -> String {
    let mut manifest = String::new();

    for frame in frames {
        let _ = writeln!(manifest, "file {}", quote_path(frame));
        let _ = writeln!(manifest, "duration {}", duration_per_frame);
    }
    if let Some(last) = frames.last() {
        let _ = writeln!(manifest, "file {}", quote_path(last));
    }

    manifest
}

/// Write the manifest for `job` into its work dir.
///
/// Relative frame paths are made absolute first; the demuxer would resolve
/// them against the manifest's directory.
pub async fn write_manifest(job: &EncodeJob<'_>) -> MediaResult<PathBuf> {
    let frames = job
        .frames
        .iter()
        .map(std::path::absolute)
        .collect::<std::io::Result<Vec<_>>>()?;

    let manifest_path = job.work_dir.join(MANIFEST_FILE_NAME);
    tokio::fs::write(&manifest_path, build_manifest(&frames, job.duration_per_frame)).await?;
    Ok(manifest_path)
}

/// FFmpeg invocation for one encode attempt.
pub fn build_encode_command(job: &EncodeJob<'_>, manifest: &Path, output: &Path) -> FfmpegCommand {
    let (width, height) = job.tier.resolution();

    let mut cmd = FfmpegCommand::new(output).input_with_args(["-f", "concat", "-safe", "0"], manifest);
    if let Some(audio) = job.audio {
        cmd = cmd.input(audio);
    }

    cmd = cmd
        .video_filter(letterbox_filter(width, height))
        .frame_rate(OUTPUT_FPS)
        .video_codec(VIDEO_CODEC)
        .pixel_format(PIXEL_FORMAT)
        .crf(job.tier.crf)
        .preset(job.tier.preset.clone());

    match job.audio {
        Some(_) => cmd
            .audio_filter(volume_filter(MUSIC_VOLUME))
            .map("0:v:0")
            .map("1:a:0")
            .shortest()
            .audio_codec(AUDIO_CODEC)
            .audio_bitrate(AUDIO_BITRATE)
            .faststart(),
        None => cmd.no_audio(),
    }
}

/// Default [`Encoder`] running the system `ffmpeg`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    timeout_secs: Option<u64>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the encoder if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Kill a running encode once `cancel_rx` turns true.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, job: &EncodeJob<'_>) -> MediaResult<PathBuf> {
        if job.frames.is_empty() {
            return Err(MediaError::internal("No frames to encode"));
        }

        let output = job.work_dir.join(VIDEO_FILE_NAME);
        let manifest_path = write_manifest(job).await?;

        let cmd = build_encode_command(job, &manifest_path, &output);
        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(cancel_rx) = &self.cancel_rx {
            runner = runner.with_cancel(cancel_rx.clone());
        }

        let total_ms = (job.frames.len() as f64 * job.duration_per_frame * 1000.0) as i64;
        let tier = job.tier.name.clone();
        runner
            .run_with_progress(&cmd, move |progress| {
                debug!(
                    tier = %tier,
                    percent = format!("{:.1}", progress.percentage(total_ms)),
                    speed = progress.speed,
                    "Encode progress"
                );
            })
            .await?;

        let size = tokio::fs::metadata(&output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(MediaError::OutputMissing(output));
        }

        info!(
            tier = %job.tier.name,
            output = %output.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            with_audio = job.audio.is_some(),
            "Encoded video"
        );

        Ok(output)
    }
}
