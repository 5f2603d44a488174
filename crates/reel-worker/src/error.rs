//! Worker error types.

use reel_models::{GenerationResult, RequestError};
use thiserror::Error;

pub type GenerationOutcome<T> = Result<T, GenerationError>;

/// Ways a generation ends in failure.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Rejected before any tier was attempted, or an image failed to decode.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// Every tier failed; carries the last tier's name and error.
    #[error("All quality tiers failed (last tier {tier}): {message}")]
    TierExhausted { tier: String, message: String },

    /// The host asked the generator to stop.
    #[error("Generation cancelled")]
    Cancelled,

    #[error("Work directory unavailable: {0}")]
    Workspace(#[from] std::io::Error),
}

impl GenerationError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    /// Whether this failure happened before any tier was attempted.
    pub fn is_input_error(&self) -> bool {
        matches!(self, GenerationError::InputValidation(_))
    }

    /// Failed result for a request with `image_count` images.
    pub fn into_result(self, image_count: usize) -> GenerationResult {
        GenerationResult::failure(image_count, self.to_string())
    }
}

impl From<RequestError> for GenerationError {
    fn from(e: RequestError) -> Self {
        Self::InputValidation(e.to_string())
    }
}
