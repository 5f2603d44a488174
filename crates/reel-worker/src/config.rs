//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reel_models::mood::DEFAULT_MUSIC_BASE_URL;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root under which each session gets its own directory
    pub work_dir: PathBuf,
    /// Kill an encoder that runs longer than this
    pub encode_timeout: Duration,
    /// Base delay between tier attempts (doubles each attempt)
    pub tier_backoff: Duration,
    /// Cap on the delay between tier attempts
    pub tier_backoff_max: Duration,
    /// Root of the curated track library
    pub music_base_url: String,
    /// Whole-download timeout for one background track
    pub music_timeout: Duration,
    /// Explicit overlay font; skips the candidate search
    pub font_path: Option<PathBuf>,
    /// Fixed watermark; the product's brand when unset
    pub watermark_text: Option<String>,
    pub currency_symbol: String,
    /// Session directories older than this are removed
    pub session_retention: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reel"),
            encode_timeout: Duration::from_secs(300),
            tier_backoff: Duration::from_millis(1000),
            tier_backoff_max: Duration::from_secs(8),
            music_base_url: DEFAULT_MUSIC_BASE_URL.to_string(),
            music_timeout: Duration::from_secs(30),
            font_path: None,
            watermark_text: None,
            currency_symbol: "$".to_string(),
            session_retention: Duration::from_secs(86_400), // 24 hours
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            work_dir: std::env::var("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            encode_timeout: Duration::from_secs(
                std::env::var("REEL_ENCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            tier_backoff: Duration::from_millis(
                std::env::var("REEL_TIER_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            tier_backoff_max: defaults.tier_backoff_max,
            music_base_url: std::env::var("REEL_MUSIC_BASE_URL")
                .unwrap_or(defaults.music_base_url),
            music_timeout: Duration::from_secs(
                std::env::var("REEL_MUSIC_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            font_path: std::env::var("REEL_FONT_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            watermark_text: std::env::var("REEL_WATERMARK_TEXT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            currency_symbol: std::env::var("REEL_CURRENCY_SYMBOL")
                .unwrap_or(defaults.currency_symbol),
            session_retention: Duration::from_secs(
                std::env::var("REEL_SESSION_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(86_400),
            ),
        }
    }

    /// Font files to try, in order.
    pub fn font_candidates(&self) -> Vec<PathBuf> {
        match &self.font_path {
            Some(path) => vec![path.clone()],
            None => reel_media::overlay::DEFAULT_FONT_PATHS
                .iter()
                .map(PathBuf::from)
                .collect(),
        }
    }
}
