//! Capability traits for the pipeline stages.
//!
//! The fallback controller only sees these traits, so each stage can be
//! replaced by an in-process implementation or a test double.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reel_models::{ImageSource, Mood, ProductMetadata, QualityTier};

use crate::error::MediaResult;

/// Ordered, equally sized frames on disk. Index order is narrative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    pub frames: Vec<PathBuf>,
    pub width: u32,
    pub height: u32,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// What the compositor draws.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    /// Cyclical templates on every frame.
    Product(ProductMetadata),
    /// A single title on the first frame.
    Title(String),
}

/// Frames after compositing, parallel to the canonical frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayFrames {
    pub frames: Vec<PathBuf>,
    /// Whether each frame received an overlay (template or title).
    pub applied: Vec<bool>,
    /// Product template index rendered onto each frame, if any.
    pub templates: Vec<Option<usize>>,
    /// Indices whose overlay failed and fell back to the canonical image.
    pub failed: Vec<usize>,
}

impl OverlayFrames {
    /// Whether at least one frame received an overlay.
    pub fn any_applied(&self) -> bool {
        self.applied.iter().any(|a| *a)
    }

    /// Template indices that were actually rendered, in frame order.
    pub fn applied_templates(&self) -> Vec<usize> {
        self.templates.iter().flatten().copied().collect()
    }
}

/// Inputs for one encode.
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    pub frames: &'a [PathBuf],
    pub duration_per_frame: f64,
    pub tier: &'a QualityTier,
    pub audio: Option<&'a Path>,
    /// Directory receiving the manifest and the video
    pub work_dir: &'a Path,
}

/// Decodes caller images into letterboxed canonical frames.
#[async_trait]
pub trait Ingest: Send + Sync {
    /// All-or-nothing: any bad image fails the whole call.
    async fn ingest(
        &self,
        images: &[ImageSource],
        width: u32,
        height: u32,
        out_dir: &Path,
    ) -> MediaResult<FrameSet>;
}

/// Draws overlays onto canonical frames.
#[async_trait]
pub trait Compose: Send + Sync {
    /// Writes a new frame set to `out_dir`; canonical frames are never modified.
    async fn compose(
        &self,
        frames: &FrameSet,
        content: &OverlayContent,
        out_dir: &Path,
    ) -> MediaResult<OverlayFrames>;
}

/// Picks and fetches one background track.
#[async_trait]
pub trait MusicSource: Send + Sync {
    async fn fetch(&self, mood: Mood, dest: &Path) -> MediaResult<PathBuf>;
}

/// Turns ordered frames (+ optional audio) into a video file.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob<'_>) -> MediaResult<PathBuf>;
}

/// Derives a preview image from a frame.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    async fn thumbnail(&self, frame: &Path, dest: &Path) -> MediaResult<PathBuf>;
}
