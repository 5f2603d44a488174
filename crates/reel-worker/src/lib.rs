//! Promo reel generation worker.
//!
//! This crate provides:
//! - The quality-tier fallback controller ([`VideoGenerator`])
//! - A pure tier state machine and backoff policy
//! - Exclusive per-session scratch directories with retention
//! - Environment configuration, structured session logging and metrics

pub mod config;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod session;

pub use config::WorkerConfig;
pub use error::{GenerationError, GenerationOutcome};
pub use fallback::{FallbackMachine, Step};
pub use generator::{Stages, VideoGenerator};
pub use logging::SessionLogger;
pub use retry::BackoffConfig;
pub use session::{prune_stale_sessions, AttemptDirs, WorkSession};
