//! Aspect-preserving fit onto a fixed black canvas.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// Where a scaled source lands inside the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Fit `src` inside `target`, preserving aspect ratio, centered.
///
/// Scaled dimensions are at least 1px and never exceed the box.
pub fn fit_within(src: (u32, u32), target: (u32, u32)) -> Placement {
    let (sw, sh) = (src.0.max(1) as f64, src.1.max(1) as f64);
    let (bw, bh) = target;

    let scale = (bw as f64 / sw).min(bh as f64 / sh);
    let width = ((sw * scale).round() as u32).clamp(1, bw.max(1));
    let height = ((sh * scale).round() as u32).clamp(1, bh.max(1));

    Placement {
        width,
        height,
        x: (bw.saturating_sub(width)) / 2,
        y: (bh.saturating_sub(height)) / 2,
    }
}

/// Letterbox `image` to exactly `width`x`height` RGB.
pub fn letterbox(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let placement = fit_within((image.width(), image.height()), (width, height));

    let scaled = image
        .resize_exact(placement.width, placement.height, FilterType::Lanczos3)
        .into_rgb8();

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    imageops::replace(&mut canvas, &scaled, placement.x as i64, placement.y as i64);
    canvas
}
