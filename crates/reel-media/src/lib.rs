#![deny(unreachable_patterns)]
//! Media stages for promo reel rendering.
//!
//! This crate provides:
//! - Image ingestion into letterboxed canonical frames
//! - Per-frame text/product overlay compositing
//! - Background track selection and download
//! - Type-safe FFmpeg command building and a concat-based encoder
//! - Thumbnail generation
//!
//! Every stage sits behind a capability trait in [`stages`] so the
//! fallback controller can run against fakes.

pub mod audio;
pub mod command;
pub mod encode;
pub mod error;
pub mod filters;
pub mod ingest;
pub mod letterbox;
pub mod overlay;
pub mod progress;
pub mod stages;
pub mod thumbnail;

pub use audio::AudioSelector;
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use encode::{build_manifest, FfmpegEncoder};
pub use error::{MediaError, MediaResult};
pub use ingest::ImageIngestor;
pub use overlay::{load_font, OverlayCompositor, OverlayStyle, OverlayTemplate};
pub use progress::FfmpegProgress;
pub use stages::{
    Compose, EncodeJob, Encoder, FrameSet, Ingest, MusicSource, OverlayContent, OverlayFrames,
    Thumbnailer,
};
pub use thumbnail::ImageThumbnailer;
