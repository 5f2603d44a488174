//! Video encoding constants.

/// Output frame rate of every rendered reel.
pub const OUTPUT_FPS: u32 = 30;
/// Video codec (H.264)
pub const VIDEO_CODEC: &str = "libx264";
/// Pixel format, widest player compatibility
pub const PIXEL_FORMAT: &str = "yuv420p";
/// Audio codec
pub const AUDIO_CODEC: &str = "aac";
/// Audio bitrate
pub const AUDIO_BITRATE: &str = "128k";
/// Gain applied to the background track so it sits under the visuals.
pub const MUSIC_VOLUME: f32 = 0.3;

/// Thumbnail bounding box (portrait)
pub const THUMBNAIL_MAX_WIDTH: u32 = 480;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 854;

/// Artifact file names inside a tier attempt directory.
pub const MANIFEST_FILE_NAME: &str = "frames.txt";
pub const VIDEO_FILE_NAME: &str = "video.mp4";
pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";
pub const MUSIC_FILE_NAME: &str = "music.mp3";
pub const CANONICAL_DIR_NAME: &str = "canonical";
pub const OVERLAY_DIR_NAME: &str = "overlay";

/// File name of the frame at `index` (0-based) inside a frame directory.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:02}.png", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_file_names_sort_in_order() {
        let names: Vec<String> = (0..6).map(frame_file_name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "frame_00.png");
    }
}
