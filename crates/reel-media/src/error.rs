//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Encoder reported success but produced no output at {}", .0.display())]
    OutputMissing(PathBuf),

    /// A caller-supplied image could not be decoded. Position is 1-based.
    #[error("Image {position} could not be decoded: {reason}")]
    InvalidImage { position: usize, reason: String },

    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid image error for the image at 1-based `position`.
    pub fn invalid_image(position: usize, reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            position,
            reason: reason.into(),
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error stems from the caller's input rather than resources.
    ///
    /// Input errors fail the same way at every quality tier.
    pub fn is_input_error(&self) -> bool {
        matches!(self, MediaError::InvalidImage { .. })
    }

    /// Message including the tail of FFmpeg's stderr when available.
    pub fn detailed_message(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                stderr: Some(stderr),
                ..
            } if !stderr.trim().is_empty() => format!("{}: {}", self, stderr.trim()),
            _ => self.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for MediaError {
    fn from(e: tokio::task::JoinError) -> Self {
        MediaError::internal(format!("blocking task failed: {}", e))
    }
}
