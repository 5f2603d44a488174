//! Generation request types and validation.

use base64::{engine::general_purpose::STANDARD, Engine};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::Mood;

/// Minimum number of images per reel.
pub const MIN_IMAGES: usize = 2;
/// Maximum number of images per reel.
pub const MAX_IMAGES: usize = 6;

/// Default display time per image in seconds.
pub const DEFAULT_DURATION_PER_IMAGE: f64 = 3.0;

/// One still image supplied by the caller.
///
/// A plain JSON string is a base64 payload (optionally a `data:` URI);
/// an object with a `path` refers to a file already on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ImageSource {
    Base64Image(String),
    FilePath { path: PathBuf },
}

impl ImageSource {
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64Image(data.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::FilePath { path: path.into() }
    }

    /// Classify a plain string. `data:` URIs and anything written in the
    /// base64 alphabet are payloads; only other strings naming an existing
    /// file become paths.
    pub fn from_payload(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.starts_with("data:") || is_base64_alphabet(&value) {
            return Self::Base64Image(value);
        }
        let path = PathBuf::from(&value);
        if path.is_file() {
            Self::FilePath { path }
        } else {
            Self::Base64Image(value)
        }
    }

    /// Re-classify a plain string source that names an existing file.
    pub fn resolved(self) -> Self {
        match self {
            Self::Base64Image(value) => Self::from_payload(value),
            other => other,
        }
    }

    /// Cheap syntactic check; does not decode the image.
    fn check(&self, position: usize) -> Result<(), RequestError> {
        match self {
            ImageSource::Base64Image(data) => {
                let body = payload_body(data).map_err(|reason| RequestError::MalformedPayload {
                    position,
                    reason: reason.to_string(),
                })?;
                let mut len = 0usize;
                for c in body.chars().filter(|c| !c.is_ascii_whitespace()) {
                    if !(c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')) {
                        return Err(RequestError::MalformedPayload {
                            position,
                            reason: format!("invalid base64 character {:?}", c),
                        });
                    }
                    len += 1;
                }
                if len == 0 || len % 4 == 1 {
                    return Err(RequestError::MalformedPayload {
                        position,
                        reason: "truncated base64 payload".to_string(),
                    });
                }
                Ok(())
            }
            ImageSource::FilePath { path } => {
                if path.is_file() {
                    Ok(())
                } else {
                    Err(RequestError::MissingFile {
                        position,
                        path: path.clone(),
                    })
                }
            }
        }
    }
}

/// Whether every non-whitespace character is in the standard base64 alphabet.
fn is_base64_alphabet(data: &str) -> bool {
    data.chars()
        .filter(|c| !c.is_ascii_whitespace())
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
}

/// Strip an optional `data:<mime>;base64,` prefix.
pub fn payload_body(data: &str) -> Result<&str, &'static str> {
    match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest.split_once(',').ok_or("data URI has no payload")?;
            if !header.ends_with(";base64") {
                return Err("data URI is not base64-encoded");
            }
            Ok(body)
        }
        None => Ok(data),
    }
}

/// Decode a base64 payload (bare or `data:` URI) to raw bytes.
pub fn decode_payload(data: &str) -> Result<Vec<u8>, String> {
    let body = payload_body(data).map_err(str::to_string)?;
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact.as_bytes()).map_err(|e| e.to_string())
}

/// Product price as scraped: either a number or preformatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

impl Price {
    /// Render for display, whole amounts without decimals.
    pub fn display(&self, currency_symbol: &str) -> String {
        match self {
            Price::Amount(v) if v.fract() == 0.0 => format!("{}{:.0}", currency_symbol, v),
            Price::Amount(v) => format!("{}{:.2}", currency_symbol, v),
            Price::Text(t) => t.trim().to_string(),
        }
    }
}

/// Scraped product details driving the templated overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductMetadata {
    pub brand: String,
    pub product_name: String,
    pub price: Price,
    #[serde(default)]
    pub discount: Option<String>,
}

fn default_duration() -> f64 {
    DEFAULT_DURATION_PER_IMAGE
}

fn default_mood() -> String {
    Mood::default().as_str().to_string()
}

fn default_true() -> bool {
    true
}

/// A request to render one reel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationRequest {
    /// Ordered images; order carries template meaning
    pub images: Vec<ImageSource>,
    /// Title used when no product metadata is present
    #[serde(default)]
    pub title: String,
    /// Seconds each image stays on screen
    #[serde(default = "default_duration")]
    pub duration_per_image: f64,
    /// Mood/style key for background music
    #[serde(default = "default_mood")]
    pub mood: String,
    /// Optional product details
    #[serde(default)]
    pub product: Option<ProductMetadata>,
    /// Whether to mix in a background track
    #[serde(default = "default_true")]
    pub enable_music: bool,
}

impl GenerationRequest {
    pub fn new(images: Vec<ImageSource>, title: impl Into<String>) -> Self {
        Self {
            images,
            title: title.into(),
            duration_per_image: DEFAULT_DURATION_PER_IMAGE,
            mood: default_mood(),
            product: None,
            enable_music: true,
        }
    }

    pub fn with_product(mut self, product: ProductMetadata) -> Self {
        self.product = Some(product);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_per_image = seconds;
        self
    }

    pub fn with_music(mut self, enabled: bool) -> Self {
        self.enable_music = enabled;
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = mood.into();
        self
    }

    /// Resolved mood category.
    pub fn mood(&self) -> Mood {
        Mood::from_key(&self.mood)
    }

    /// Total output duration; independent of tier and audio.
    pub fn total_duration(&self) -> f64 {
        self.images.len() as f64 * self.duration_per_image
    }

    /// Validate the request without decoding any image.
    pub fn validate(&self) -> Result<(), RequestError> {
        let count = self.images.len();
        if !(MIN_IMAGES..=MAX_IMAGES).contains(&count) {
            return Err(RequestError::ImageCount { count });
        }

        if !self.duration_per_image.is_finite() || self.duration_per_image <= 0.0 {
            return Err(RequestError::InvalidDuration(self.duration_per_image));
        }

        for (i, image) in self.images.iter().enumerate() {
            image.check(i + 1)?;
        }

        Ok(())
    }
}

/// Request validation error. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("Expected between 2 and 6 images, got {count}")]
    ImageCount { count: usize },

    #[error("Duration per image must be a positive number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("Image {position} is malformed: {reason}")]
    MalformedPayload { position: usize, reason: String },

    #[error("Image {position} not found: {}", .path.display())]
    MissingFile { position: usize, path: PathBuf },
}
