//! Image ingestion into canonical frames.
//!
//! Each caller image is decoded, converted to RGB, letterboxed to the
//! tier's resolution and written as an indexed PNG. Buffers are dropped as
//! soon as their frame is on disk so peak memory stays at one image.

use std::path::Path;

use async_trait::async_trait;
use reel_models::encoding::frame_file_name;
use reel_models::request::decode_payload;
use reel_models::ImageSource;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::letterbox::letterbox;
use crate::stages::{FrameSet, Ingest};

/// Default [`Ingest`] implementation backed by the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct ImageIngestor;

impl ImageIngestor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Ingest for ImageIngestor {
    async fn ingest(
        &self,
        images: &[ImageSource],
        width: u32,
        height: u32,
        out_dir: &Path,
    ) -> MediaResult<FrameSet> {
        let images = images.to_vec();
        let out_dir = out_dir.to_path_buf();

        tokio::task::spawn_blocking(move || ingest_all(&images, width, height, &out_dir)).await?
    }
}

/// Synchronous ingestion; removes any frames already written on failure.
pub fn ingest_all(
    images: &[ImageSource],
    width: u32,
    height: u32,
    out_dir: &Path,
) -> MediaResult<FrameSet> {
    std::fs::create_dir_all(out_dir)?;

    let mut frames = Vec::with_capacity(images.len());
    for (index, source) in images.iter().enumerate() {
        let path = out_dir.join(frame_file_name(index));
        match ingest_one(source, index + 1, width, height, &path) {
            Ok(()) => frames.push(path),
            Err(e) => {
                warn!(position = index + 1, error = %e, "Image ingestion failed, discarding partial frame set");
                for written in &frames {
                    let _ = std::fs::remove_file(written);
                }
                let _ = std::fs::remove_file(&path);
                return Err(e);
            }
        }
    }

    info!(count = frames.len(), width, height, "Ingested canonical frames");

    Ok(FrameSet {
        frames,
        width,
        height,
    })
}

fn ingest_one(
    source: &ImageSource,
    position: usize,
    width: u32,
    height: u32,
    path: &Path,
) -> MediaResult<()> {
    let bytes = read_source(source, position)?;

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| MediaError::invalid_image(position, e.to_string()))?;
    drop(bytes);

    debug!(
        position,
        src_width = decoded.width(),
        src_height = decoded.height(),
        "Decoded image"
    );

    let frame = letterbox(&decoded, width, height);
    drop(decoded);

    frame.save(path)?;
    drop(frame);

    Ok(())
}

fn read_source(source: &ImageSource, position: usize) -> MediaResult<Vec<u8>> {
    match source {
        ImageSource::Base64Image(data) => {
            decode_payload(data).map_err(|reason| MediaError::invalid_image(position, reason))
        }
        ImageSource::FilePath { path } => std::fs::read(path).map_err(|e| {
            MediaError::invalid_image(position, format!("{}: {}", path.display(), e))
        }),
    }
}
