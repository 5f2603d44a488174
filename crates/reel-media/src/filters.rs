//! FFmpeg filter definitions.

/// Scale to fit inside `width`x`height`, then pad to exactly that size with
/// black, centered. Same policy as the in-process letterbox.
pub fn letterbox_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
        w = width,
        h = height
    )
}

/// Attenuate an audio stream by a linear gain.
pub fn volume_filter(gain: f32) -> String {
    format!("volume={:.2}", gain)
}
