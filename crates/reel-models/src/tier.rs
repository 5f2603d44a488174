//! Quality tiers for the encode fallback ladder.
//!
//! Tiers are tried strictly best-quality-first. Each tier fixes the output
//! resolution together with the x264 quality/speed trade-off, so a failing
//! attempt can be retried with a cheaper configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable configuration for one encode attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QualityTier {
    /// Tier name reported in results and logs
    pub name: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Constant Rate Factor (0-51, lower is better)
    pub crf: u8,
    /// x264 speed preset
    pub preset: String,
}

impl QualityTier {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        crf: u8,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            crf,
            preset: preset.into(),
        }
    }

    /// Target resolution as `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel count, used to order tiers.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}x{}, crf {}, {})",
            self.name, self.width, self.height, self.crf, self.preset
        )
    }
}

/// The default ladder, highest quality first.
///
/// Dimensions stay even so yuv420p chroma subsampling never has to round.
pub fn default_tiers() -> Vec<QualityTier> {
    vec![
        QualityTier::new("high", 1080, 1920, 23, "fast"),
        QualityTier::new("medium", 720, 1280, 26, "faster"),
        QualityTier::new("low", 540, 960, 28, "veryfast"),
        QualityTier::new("minimal", 360, 640, 30, "ultrafast"),
    ]
}
