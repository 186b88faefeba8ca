//! Configuration defaults and the runtime rate limit policy.
//!
//! Defaults are compile-time constants; the server binary overrides them from
//! CLI arguments in `main.rs`.

use serde::{Deserialize, Serialize};

/// Default sustained refill rate in requests per second.
pub const DEFAULT_LIMIT: f64 = 1.0;

/// Default burst capacity in requests.
pub const DEFAULT_BURST: u32 = 2;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address.
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Key shared by every request whose originating address could not be determined.
pub const FALLBACK_CLIENT_KEY: &str = "unknown";

/// Idle bucket TTL in seconds. 0 = never evict.
pub const DEFAULT_IDLE_TTL_SECS: u64 = 0;

/// Interval between idle sweeps when eviction is enabled.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Interval between refreshes of the tracked-clients gauge.
pub const METRICS_REFRESH_SECS: u64 = 15;

/// Graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Rejection message returned in the 429 body.
pub const REJECTION_MESSAGE: &str = "Too many requests";

/// Token bucket parameters shared by every bucket of one registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Refill rate in tokens per second. Fractional values are allowed.
    pub limit: f64,
    /// Maximum number of tokens a bucket can hold.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            burst: DEFAULT_BURST,
        }
    }
}

impl RateLimitConfig {
    pub fn new(limit: f64, burst: u32) -> Self {
        Self { limit, burst }
    }

    /// Checks that the policy can admit traffic at all.
    pub fn validate(&self) -> Result<(), String> {
        if !self.limit.is_finite() || self.limit <= 0.0 {
            return Err(format!(
                "limit must be a positive number of requests per second, got {}",
                self.limit
            ));
        }
        if self.burst == 0 {
            return Err("burst must be at least 1".to_string());
        }
        Ok(())
    }

    /// Seconds an empty bucket needs to refill completely.
    pub fn full_refill_secs(&self) -> f64 {
        self.burst as f64 / self.limit
    }
}
