//! Continuous-refill token bucket.
//!
//! Each client gets its own bucket. Tokens refill at `limit` per second up to
//! `burst`, and every admitted request consumes one token.

use crate::config::RateLimitConfig;
use std::time::{Duration, Instant};

/// A token bucket rate limiter.
///
/// Refills at `rate` tokens per second up to `capacity`.
/// Each [`try_admit`](TokenBucket::try_admit) call that succeeds consumes one token.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
    capacity: f64,
    rate: f64,
}

impl TokenBucket {
    /// Create a full bucket from the registry's policy.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::new_at(config, Instant::now())
    }

    /// Create a full bucket whose clock starts at `now`.
    pub fn new_at(config: &RateLimitConfig, now: Instant) -> Self {
        let capacity = config.burst as f64;
        Self {
            tokens: capacity,
            last_refill: now,
            last_seen: now,
            capacity,
            rate: config.limit,
        }
    }

    /// Try to take one token. Returns `true` if admitted, `false` if rate limited.
    pub fn try_admit(&mut self) -> bool {
        self.try_admit_at(Instant::now())
    }

    /// Admission check against an explicit instant.
    ///
    /// An instant earlier than the last refill credits nothing.
    pub fn try_admit_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
        if now > self.last_seen {
            self.last_seen = now;
        }
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently held, without applying pending refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Whether the bucket has gone unused for longer than `max_idle` at `now`.
    pub fn is_idle(&self, max_idle: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > max_idle
    }
}
