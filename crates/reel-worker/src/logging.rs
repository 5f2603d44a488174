//! Structured session logging.
//!
//! Every event carries the session id and the operation so one generation
//! can be followed across tiers in aggregated logs.

use reel_models::SessionId;
use tracing::{error, info, warn, Span};

/// Logs the lifecycle of one generation session.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    pub fn new(session_id: &SessionId, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    /// Progress within a tier attempt.
    pub fn log_progress(&self, tier: &str, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            tier = %tier,
            "Session progress: {}", message
        );
    }

    /// An absorbed failure; the attempt continues.
    pub fn log_warning(&self, tier: &str, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            tier = %tier,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering the whole generation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = %self.operation
        )
    }
}
