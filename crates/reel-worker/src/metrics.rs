//! Generation metrics.
//!
//! Recorded through the `metrics` facade; the host process installs the
//! recorder/exporter.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const GENERATIONS_SUCCEEDED_TOTAL: &str = "reel_generations_succeeded_total";
    pub const GENERATIONS_FAILED_TOTAL: &str = "reel_generations_failed_total";
    pub const GENERATION_DURATION_SECONDS: &str = "reel_generation_duration_seconds";

    pub const TIER_ATTEMPTS_TOTAL: &str = "reel_tier_attempts_total";
    pub const TIER_FAILURES_TOTAL: &str = "reel_tier_failures_total";
    pub const ENCODE_DURATION_SECONDS: &str = "reel_encode_duration_seconds";

    /// Failures that did not consume a tier attempt
    pub const ABSORBED_FAILURES_TOTAL: &str = "reel_absorbed_failures_total";

    pub const SESSIONS_PRUNED_TOTAL: &str = "reel_sessions_pruned_total";
}

/// Record the start of a tier attempt.
pub fn record_tier_attempt(tier: &str) {
    let labels = [("tier", tier.to_string())];
    counter!(names::TIER_ATTEMPTS_TOTAL, &labels).increment(1);
}

/// Record a failed tier attempt.
pub fn record_tier_failure(tier: &str, stage: &str) {
    let labels = [("tier", tier.to_string()), ("stage", stage.to_string())];
    counter!(names::TIER_FAILURES_TOTAL, &labels).increment(1);
}

/// Record encoder wall time for one attempt.
pub fn record_encode_duration(tier: &str, success: bool, duration_secs: f64) {
    let labels = [
        ("tier", tier.to_string()),
        ("success", success.to_string()),
    ];
    histogram!(names::ENCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a tolerated failure (`overlay`, `music` or `thumbnail`).
pub fn record_absorbed_failure(stage: &str, count: u64) {
    if count == 0 {
        return;
    }
    let labels = [("stage", stage.to_string())];
    counter!(names::ABSORBED_FAILURES_TOTAL, &labels).increment(count);
}

/// Record the outcome of a whole generation.
pub fn record_generation(success: bool, tier: Option<&str>, duration_secs: f64) {
    let labels = [("tier", tier.unwrap_or("none").to_string())];
    if success {
        counter!(names::GENERATIONS_SUCCEEDED_TOTAL, &labels).increment(1);
    } else {
        counter!(names::GENERATIONS_FAILED_TOTAL, &labels).increment(1);
    }
    histogram!(names::GENERATION_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record stale sessions removed by retention.
pub fn record_sessions_pruned(count: usize) {
    counter!(names::SESSIONS_PRUNED_TOTAL).increment(count as u64);
}
