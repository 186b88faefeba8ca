//! ratewall-server — HTTP admission control for ratewall.
//!
//! Provides the Axum middleware, router and background sweeper.
//! Bucket and registry logic lives in `ratewall-core`.

/// HTTP layer: router, admission middleware, handlers, errors, metrics.
pub mod api;
/// Background eviction of idle buckets.
pub mod sweeper;
