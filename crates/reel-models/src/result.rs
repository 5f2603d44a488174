//! Generation result.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one generation request.
///
/// A failed result never carries a video or thumbnail path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationResult {
    pub success: bool,
    pub video_path: Option<PathBuf>,
    pub thumbnail_path: Option<PathBuf>,
    /// Total duration in seconds
    pub duration: f64,
    pub image_count: usize,
    /// Name of the tier that produced the video
    pub tier: Option<String>,
    pub has_overlays: bool,
    pub has_music: bool,
    /// Product template index drawn on each overlaid frame, in frame order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlay_templates: Vec<usize>,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl GenerationResult {
    /// A failed result for `image_count` inputs.
    pub fn failure(image_count: usize, error: impl Into<String>) -> Self {
        Self {
            success: false,
            video_path: None,
            thumbnail_path: None,
            duration: 0.0,
            image_count,
            tier: None,
            has_overlays: false,
            has_music: false,
            overlay_templates: Vec::new(),
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }
}
