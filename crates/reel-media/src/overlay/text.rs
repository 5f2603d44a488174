//! Glyph rasterization and alpha blending onto RGB frames.

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::Font;
use image::{Rgb, RgbImage};

/// Draws single-line text with one font.
pub struct TextPainter<'a> {
    font: &'a Font,
}

impl<'a> TextPainter<'a> {
    pub fn new(font: &'a Font) -> Self {
        Self { font }
    }

    /// Advance width of `text` at `size` px.
    pub fn width(&self, text: &str, size: f32) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, size).advance_width)
            .sum()
    }

    /// Line height at `size` px.
    pub fn line_height(&self, size: f32) -> f32 {
        self.font
            .horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2)
    }

    /// Largest size up to `preferred` whose width fits `max_width`.
    pub fn fit_size(&self, text: &str, preferred: f32, max_width: f32) -> f32 {
        let width = self.width(text, preferred);
        if width <= max_width || width <= 0.0 {
            preferred
        } else {
            (preferred * max_width / width).floor().max(8.0)
        }
    }

    /// Draw `text` with its layout box's top-left at (`x`, `y`).
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        canvas: &mut RgbImage,
        x: i32,
        y: i32,
        text: &str,
        size: f32,
        color: Rgb<u8>,
        opacity: f32,
    ) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: x as f32,
            y: y as f32,
            ..LayoutSettings::default()
        });
        layout.append(&[self.font], &TextStyle::new(text, size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (_, coverage) = self.font.rasterize_config(glyph.key);
            blit_coverage(
                canvas,
                glyph.x.round() as i32,
                glyph.y.round() as i32,
                glyph.width,
                glyph.height,
                &coverage,
                color,
                opacity,
            );
        }
    }

    /// Draw a dark offset copy first, then the text itself.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_with_shadow(
        &self,
        canvas: &mut RgbImage,
        x: i32,
        y: i32,
        text: &str,
        size: f32,
        color: Rgb<u8>,
        opacity: f32,
    ) {
        let offset = shadow_offset(size);
        self.draw(canvas, x + offset, y + offset, text, size, Rgb([0, 0, 0]), opacity);
        self.draw(canvas, x, y, text, size, color, opacity);
    }
}

/// Shadow displacement for a given text size.
pub fn shadow_offset(size: f32) -> i32 {
    ((size / 20.0).round() as i32).max(2)
}

#[allow(clippy::too_many_arguments)]
fn blit_coverage(
    canvas: &mut RgbImage,
    x: i32,
    y: i32,
    width: usize,
    height: usize,
    coverage: &[u8],
    color: Rgb<u8>,
    opacity: f32,
) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);

    for row in 0..height {
        let py = y + row as i32;
        if py < 0 || py >= ch {
            continue;
        }
        for col in 0..width {
            let px = x + col as i32;
            if px < 0 || px >= cw {
                continue;
            }
            let alpha = coverage[row * width + col] as f32 / 255.0 * opacity;
            if alpha <= 0.0 {
                continue;
            }
            blend(canvas.get_pixel_mut(px as u32, py as u32), color, alpha);
        }
    }
}

/// Blend `color` over `pixel` with `alpha` in [0, 1].
pub fn blend(pixel: &mut Rgb<u8>, color: Rgb<u8>, alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for c in 0..3 {
        let src = pixel[c] as f32;
        let dst = color[c] as f32;
        pixel[c] = (src + (dst - src) * alpha).round() as u8;
    }
}

/// Darken rows `top..bottom` with black at `alpha`.
pub fn darken_band(canvas: &mut RgbImage, top: u32, bottom: u32, alpha: f32) {
    let bottom = bottom.min(canvas.height());
    for y in top..bottom {
        for x in 0..canvas.width() {
            blend(canvas.get_pixel_mut(x, y), Rgb([0, 0, 0]), alpha);
        }
    }
}
