//! # ratewall-core
//!
//! Per-client admission control: a registry of independent token buckets keyed
//! by client identity, and the refill-then-deduct admission check.
//!
//! This crate has no async dependencies; the HTTP middleware lives in
//! `ratewall-server`.
//!
//! ```
//! use ratewall_core::config::RateLimitConfig;
//! use ratewall_core::registry::BucketRegistry;
//!
//! let registry = BucketRegistry::new(RateLimitConfig::new(1.0, 2));
//! assert!(registry.check("10.0.0.1"));
//! assert!(registry.check("10.0.0.1"));
//! assert!(!registry.check("10.0.0.1"));
//! ```

/// Continuous-refill token bucket and its admission check.
pub mod bucket;
/// Client key derivation from peer addresses.
pub mod client_key;
/// Defaults and the runtime rate limit policy.
pub mod config;
/// Concurrent client key → bucket registry.
pub mod registry;
