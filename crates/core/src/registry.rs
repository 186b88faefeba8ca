//! Concurrent map from client key to token bucket.
//!
//! One `parking_lot::Mutex` guards the map for both lookup and insert, so two
//! racing first requests from the same client always resolve to the same
//! bucket. Each bucket carries its own mutex; callers lock it only after the
//! registry lock has been released.

use crate::bucket::TokenBucket;
use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared handle to one client's bucket.
pub type BucketHandle = Arc<Mutex<TokenBucket>>;

/// Registry of per-client token buckets.
///
/// Grows by one entry per distinct client key and never shrinks unless
/// [`evict_idle`](BucketRegistry::evict_idle) is called.
#[derive(Debug)]
pub struct BucketRegistry {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, BucketHandle>>,
}

impl BucketRegistry {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Returns the bucket for `key`, creating a full one on first sight.
    pub fn get_or_create(&self, key: &str) -> BucketHandle {
        let mut buckets = self.buckets.lock();
        if let Some(bucket) = buckets.get(key) {
            return bucket.clone();
        }
        tracing::debug!(client = %key, "tracking new client");
        let bucket = Arc::new(Mutex::new(TokenBucket::new(&self.config)));
        buckets.insert(key.to_string(), bucket.clone());
        bucket
    }

    /// Resolves the client's bucket and runs one admission check on it.
    pub fn check(&self, key: &str) -> bool {
        let bucket = self.get_or_create(key);
        // Guard must drop before `bucket` does
        let admitted = bucket.lock().try_admit();
        admitted
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.lock().is_empty()
    }

    /// Drops buckets unused for longer than `max_idle`. Returns how many were removed.
    ///
    /// A bucket whose handle is still held outside the registry is kept even if
    /// idle: the holder is about to run an admission check on it, and removing
    /// it would let the client's next request start on a second, full bucket.
    pub fn evict_idle(&self, max_idle: Duration, now: Instant) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        // No handle can be cloned while the registry lock is held
        buckets.retain(|_, bucket| {
            Arc::strong_count(bucket) > 1 || !bucket.lock().is_idle(max_idle, now)
        });
        before - buckets.len()
    }
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
