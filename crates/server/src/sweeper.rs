//! Periodic removal of idle client buckets.
//!
//! Off by default, so the registry keeps one bucket per client for the life of
//! the process. Enabled with `--idle-ttl-secs`.

use crate::api::metrics;
use ratewall_core::registry::BucketRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Checks that evicting after `idle_ttl` can never hand a client more tokens
/// than keeping its bucket would have.
pub fn validate_idle_ttl(registry: &BucketRegistry, idle_ttl: Duration) -> Result<(), String> {
    let full_refill = registry.config().full_refill_secs();
    if idle_ttl.as_secs_f64() < full_refill {
        return Err(format!(
            "idle TTL of {}s is shorter than the {:.3}s a bucket needs to refill",
            idle_ttl.as_secs_f64(),
            full_refill
        ));
    }
    Ok(())
}

/// Spawns the sweeper task. Runs until the runtime shuts down or the handle is aborted.
pub fn spawn_idle_sweeper(
    registry: Arc<BucketRegistry>,
    idle_ttl: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = registry.evict_idle(idle_ttl, Instant::now());
            if removed > 0 {
                tracing::info!(
                    removed,
                    remaining = registry.len(),
                    "Evicted idle client buckets"
                );
                metrics::record_evictions(removed);
            }
            metrics::update_registry_metrics(&registry);
        }
    })
}
