//! Preview image derivation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use reel_models::encoding::{THUMBNAIL_MAX_HEIGHT, THUMBNAIL_MAX_WIDTH};
use tracing::debug;

use crate::error::MediaResult;
use crate::stages::Thumbnailer;

/// Default [`Thumbnailer`]: aspect-preserving downscale saved as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailer {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ImageThumbnailer {
    fn default() -> Self {
        Self {
            max_width: THUMBNAIL_MAX_WIDTH,
            max_height: THUMBNAIL_MAX_HEIGHT,
        }
    }
}

impl ImageThumbnailer {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

#[async_trait]
impl Thumbnailer for ImageThumbnailer {
    async fn thumbnail(&self, frame: &Path, dest: &Path) -> MediaResult<PathBuf> {
        let (max_width, max_height) = (self.max_width, self.max_height);
        let frame = frame.to_path_buf();
        let dest = dest.to_path_buf();

        tokio::task::spawn_blocking(move || -> MediaResult<PathBuf> {
            let img = image::open(&frame)?;
            // Never upscale; frames already inside the bounds are re-encoded as-is.
            let thumb = if img.width() > max_width || img.height() > max_height {
                img.thumbnail(max_width, max_height).to_rgb8()
            } else {
                img.to_rgb8()
            };
            drop(img);
            thumb.save_with_format(&dest, ImageFormat::Jpeg)?;
            debug!(
                source = %frame.display(),
                width = thumb.width(),
                height = thumb.height(),
                "Wrote thumbnail"
            );
            Ok(dest)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_thumbnail_fits_bounds_and_keeps_aspect() {
        let dir = TempDir::new().unwrap();
        let frame = dir.path().join("frame_00.png");
        RgbImage::from_pixel(1080, 1920, Rgb([10, 20, 30])).save(&frame).unwrap();

        let dest = dir.path().join("thumbnail.jpg");
        let out = ImageThumbnailer::default().thumbnail(&frame, &dest).await.unwrap();

        let thumb = image::open(out).unwrap();
        assert!(thumb.width() <= 480 && thumb.height() <= 854);
        let ratio = thumb.width() as f64 / thumb.height() as f64;
        assert!((ratio - 1080.0 / 1920.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_small_frame_is_not_upscaled() {
        let dir = TempDir::new().unwrap();
        let frame = dir.path().join("frame_00.png");
        RgbImage::from_pixel(36, 64, Rgb([10, 20, 30])).save(&frame).unwrap();

        let out = ImageThumbnailer::default()
            .thumbnail(&frame, &dir.path().join("thumbnail.jpg"))
            .await
            .unwrap();

        let thumb = image::open(out).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (36, 64));
    }

    #[tokio::test]
    async fn test_thumbnail_missing_frame_fails() {
        let dir = TempDir::new().unwrap();
        let result = ImageThumbnailer::default()
            .thumbnail(&dir.path().join("missing.png"), &dir.path().join("t.jpg"))
            .await;
        assert!(result.is_err());
    }
}
