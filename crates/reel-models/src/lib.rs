//! Shared data models for the reel generation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests and their image payloads
//! - Generation results
//! - Quality tiers tried by the fallback controller
//! - Mood categories and the background music catalog
//! - Encoding constants shared by the media stages

pub mod encoding;
pub mod mood;
pub mod request;
pub mod result;
pub mod session;
pub mod tier;

// Re-export common types
pub use mood::{Mood, MoodParseError, MusicCatalog};
pub use request::{
    GenerationRequest, ImageSource, Price, ProductMetadata, RequestError, MAX_IMAGES, MIN_IMAGES,
};
pub use result::GenerationResult;
pub use session::SessionId;
pub use tier::{default_tiers, QualityTier};
