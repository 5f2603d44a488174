//! Per-frame text and product overlays.
//!
//! With product metadata every frame gets its cyclical template as two
//! shadowed lines over a darkened band in the bottom fifth, plus a small
//! brand watermark near the top-left. Without metadata only the first frame gets
//! the title. Output is always a new file set; a frame whose overlay fails
//! is copied through unchanged.

mod template;
mod text;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fontdue::{Font, FontSettings};
use image::{Rgb, RgbImage};
use reel_models::encoding::frame_file_name;
use reel_models::ProductMetadata;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::stages::{Compose, FrameSet, OverlayContent, OverlayFrames};

pub use template::OverlayTemplate;
pub use text::{blend, darken_band, shadow_offset, TextPainter};

/// Bold fonts tried in order when no explicit font is configured.
pub const DEFAULT_FONT_PATHS: &[&str] = &[
    "/app/assets/fonts/DejaVuSans-Bold.ttf",
    "assets/fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
];

/// Fraction of frame height covered by the text band.
const BAND_FRACTION: f32 = 0.2;
/// Opacity of the band behind the text.
const BAND_ALPHA: f32 = 0.55;
const WATERMARK_OPACITY: f32 = 0.7;

/// Load the first font that exists and parses.
pub fn load_font<P: AsRef<Path>>(candidates: &[P]) -> MediaResult<Font> {
    for candidate in candidates {
        let path = candidate.as_ref();
        if !path.is_file() {
            continue;
        }
        let bytes = std::fs::read(path)?;
        match Font::from_bytes(bytes, FontSettings::default()) {
            Ok(font) => {
                debug!(path = %path.display(), "Loaded overlay font");
                return Ok(font);
            }
            Err(e) => warn!(path = %path.display(), error = e, "Skipping unparsable font"),
        }
    }

    Err(MediaError::FontUnavailable(format!(
        "none of {} candidate font paths could be loaded",
        candidates.len()
    )))
}

/// Text styling shared by all frames.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    /// Fixed watermark replacing the product's brand
    pub watermark: Option<String>,
    /// Prefix for numeric prices
    pub currency_symbol: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            watermark: None,
            currency_symbol: "$".to_string(),
        }
    }
}

impl OverlayStyle {
    /// Draw `watermark` instead of the product's brand. Blank text keeps
    /// the brand.
    pub fn with_watermark(mut self, watermark: impl Into<String>) -> Self {
        let watermark = watermark.into();
        self.watermark = Some(watermark).filter(|w| !w.trim().is_empty());
        self
    }

    /// Watermark text for `product`.
    pub fn watermark_for<'a>(&'a self, product: &'a ProductMetadata) -> &'a str {
        self.watermark.as_deref().unwrap_or(product.brand.trim())
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }
}

/// What happens to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePlan {
    Template(OverlayTemplate),
    Title,
    PassThrough,
}

fn plan_for(content: &OverlayContent, index: usize) -> FramePlan {
    match content {
        OverlayContent::Product(_) => FramePlan::Template(OverlayTemplate::for_frame(index)),
        OverlayContent::Title(title) if index == 0 && !title.trim().is_empty() => FramePlan::Title,
        OverlayContent::Title(_) => FramePlan::PassThrough,
    }
}

/// Default [`Compose`] implementation rasterizing text with `fontdue`.
#[derive(Clone)]
pub struct OverlayCompositor {
    font: Option<Arc<Font>>,
    style: OverlayStyle,
}

impl OverlayCompositor {
    /// A compositor without a font passes every frame through.
    pub fn new(font: Option<Font>, style: OverlayStyle) -> Self {
        Self {
            font: font.map(Arc::new),
            style,
        }
    }

    fn compose_blocking(
        &self,
        frames: &FrameSet,
        content: &OverlayContent,
        out_dir: &Path,
    ) -> MediaResult<OverlayFrames> {
        std::fs::create_dir_all(out_dir)?;

        let mut result = OverlayFrames {
            frames: Vec::with_capacity(frames.len()),
            applied: Vec::with_capacity(frames.len()),
            templates: Vec::with_capacity(frames.len()),
            failed: Vec::new(),
        };

        for (index, canonical) in frames.frames.iter().enumerate() {
            let dest = out_dir.join(frame_file_name(index));
            let plan = plan_for(content, index);

            let rendered = match plan {
                FramePlan::PassThrough => Ok(false),
                _ => self.render_frame(canonical, &dest, plan, content).map(|_| true),
            };

            let applied = match rendered {
                Ok(applied) => applied,
                Err(e) => {
                    warn!(frame = index, error = %e, "Overlay failed, passing canonical frame through");
                    result.failed.push(index);
                    false
                }
            };

            let path = if applied {
                dest
            } else {
                pass_through(canonical, &dest)
            };

            result.frames.push(path);
            result.applied.push(applied);
            result.templates.push(match plan {
                FramePlan::Template(t) if applied => Some(t.index()),
                _ => None,
            });
        }

        info!(
            frames = result.frames.len(),
            overlaid = result.applied.iter().filter(|a| **a).count(),
            failed = result.failed.len(),
            "Composited overlay frames"
        );

        Ok(result)
    }

    fn render_frame(
        &self,
        canonical: &Path,
        dest: &Path,
        plan: FramePlan,
        content: &OverlayContent,
    ) -> MediaResult<()> {
        let font = self
            .font
            .as_deref()
            .ok_or_else(|| MediaError::FontUnavailable("no overlay font loaded".to_string()))?;

        let mut canvas = image::open(canonical)?.into_rgb8();

        match (plan, content) {
            (FramePlan::Template(template), OverlayContent::Product(product)) => {
                render_product(&mut canvas, font, template, product, &self.style)
            }
            (FramePlan::Title, OverlayContent::Title(title)) => render_title(&mut canvas, font, title),
            _ => return Err(MediaError::internal("overlay plan does not match content")),
        }

        canvas.save(dest)?;
        drop(canvas);
        Ok(())
    }
}

#[async_trait]
impl Compose for OverlayCompositor {
    async fn compose(
        &self,
        frames: &FrameSet,
        content: &OverlayContent,
        out_dir: &Path,
    ) -> MediaResult<OverlayFrames> {
        let this = self.clone();
        let frames = frames.clone();
        let content = content.clone();
        let out_dir = out_dir.to_path_buf();

        tokio::task::spawn_blocking(move || this.compose_blocking(&frames, &content, &out_dir))
            .await?
    }
}

/// Copy the canonical frame byte-for-byte; reuse it in place if even that fails.
fn pass_through(canonical: &Path, dest: &Path) -> PathBuf {
    match std::fs::copy(canonical, dest) {
        Ok(_) => dest.to_path_buf(),
        Err(e) => {
            warn!(frame = %canonical.display(), error = %e, "Could not copy frame, reusing canonical file");
            canonical.to_path_buf()
        }
    }
}

/// Draw one product template onto `canvas`.
pub fn render_product(
    canvas: &mut RgbImage,
    font: &Font,
    template: OverlayTemplate,
    product: &ProductMetadata,
    style: &OverlayStyle,
) {
    let (w, h) = canvas.dimensions();
    let (wf, hf) = (w as f32, h as f32);
    let painter = TextPainter::new(font);

    let band_top = h - (hf * BAND_FRACTION).round() as u32;
    darken_band(canvas, band_top, h, BAND_ALPHA);

    let (headline, subline) = template.lines(product, &style.currency_symbol);
    let max_width = wf * 0.9;
    let size1 = painter.fit_size(&headline, wf * 0.075, max_width);
    let size2 = painter.fit_size(&subline, wf * 0.055, max_width);
    let (lh1, lh2) = (painter.line_height(size1), painter.line_height(size2));

    let band_height = (h - band_top) as f32;
    let y1 = band_top as f32 + ((band_height - lh1 - lh2) / 2.0).max(0.0);
    let y2 = y1 + lh1;

    let x1 = ((wf - painter.width(&headline, size1)) / 2.0).max(0.0);
    let x2 = ((wf - painter.width(&subline, size2)) / 2.0).max(0.0);

    painter.draw_with_shadow(canvas, x1 as i32, y1 as i32, &headline, size1, template.accent(), 1.0);
    painter.draw_with_shadow(canvas, x2 as i32, y2 as i32, &subline, size2, Rgb([255, 255, 255]), 1.0);

    let watermark = style.watermark_for(product);
    if !watermark.is_empty() {
        let size = (wf * 0.03).max(12.0);
        painter.draw_with_shadow(
            canvas,
            (wf * 0.04) as i32,
            (hf * 0.03) as i32,
            watermark,
            size,
            Rgb([255, 255, 255]),
            WATERMARK_OPACITY,
        );
    }
}

/// Draw the title in the upper-left quadrant.
pub fn render_title(canvas: &mut RgbImage, font: &Font, title: &str) {
    let (w, h) = canvas.dimensions();
    let (wf, hf) = (w as f32, h as f32);
    let painter = TextPainter::new(font);

    let title = title.trim();
    let size = painter.fit_size(title, wf * 0.08, wf * 0.84);
    painter.draw_with_shadow(
        canvas,
        (wf * 0.08) as i32,
        (hf * 0.2) as i32,
        title,
        size,
        Rgb([255, 255, 255]),
        1.0,
    );
}
