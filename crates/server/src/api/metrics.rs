//! Prometheus metrics recording.

use metrics::{counter, gauge, histogram};
use ratewall_core::registry::BucketRegistry;
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records one admission decision. No per-client label: series would grow with the registry.
pub fn record_admission(admitted: bool) {
    if admitted {
        counter!("ratewall_admitted_total").increment(1);
    } else {
        counter!("ratewall_rejected_total").increment(1);
    }
}

/// Records buckets dropped by the idle sweeper.
pub fn record_evictions(count: usize) {
    counter!("ratewall_evicted_total").increment(count as u64);
}

/// Updates the `ratewall_tracked_clients` gauge.
pub fn update_registry_metrics(registry: &BucketRegistry) {
    gauge!("ratewall_tracked_clients").set(registry.len() as f64);
}
