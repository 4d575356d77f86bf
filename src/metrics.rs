// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the offline relay.
//!
//! Uses the `metrics` crate for backend-agnostic collection. The embedding
//! application picks the exporter (Prometheus, OTEL, ...). Without an
//! installed recorder every call is a no-op.
//!
//! # Metric Naming Convention
//! - `offline_relay_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `namespace`: app_shell, tiles
//! - `disposition`: enqueue, pass_through, tile_cache, app_cache
//! - `outcome`: hit, miss, fallback_hit, offline_document / synced, retry, abandoned

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record how the router disposed of a request
pub fn record_disposition(disposition: &str) {
    counter!(
        "offline_relay_requests_total",
        "disposition" => disposition.to_string()
    )
    .increment(1);
}

/// Record a cache lookup result
pub fn record_cache_lookup(namespace: &str, outcome: &str) {
    counter!(
        "offline_relay_cache_lookups_total",
        "namespace" => namespace.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record entries evicted by a trim
pub fn record_cache_evictions(namespace: &str, count: usize) {
    counter!(
        "offline_relay_cache_evictions_total",
        "namespace" => namespace.to_string()
    )
    .increment(count as u64);
}

/// Set current entry count of a namespace
pub fn set_cache_entries(namespace: &str, count: usize) {
    gauge!(
        "offline_relay_cache_entries",
        "namespace" => namespace.to_string()
    )
    .set(count as f64);
}

/// Record a mutation captured into the queue
pub fn record_enqueued() {
    counter!("offline_relay_mutations_enqueued_total").increment(1);
}

/// Record the verdict for one replayed mutation
pub fn record_replay_verdict(outcome: &str) {
    counter!(
        "offline_relay_replay_verdicts_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record duration of a full replay pass
pub fn record_replay_pass(duration: Duration) {
    histogram!("offline_relay_replay_pass_seconds").record(duration.as_secs_f64());
}

/// Set pending mutation count
pub fn set_queue_pending(count: u64) {
    gauge!("offline_relay_queue_pending").set(count as f64);
}

/// Set connectivity (1 = online, 0 = offline)
pub fn set_online(online: bool) {
    gauge!("offline_relay_online").set(if online { 1.0 } else { 0.0 });
}

/// Record a notification fan-out
pub fn record_notifications(kind: &str, delivered: usize) {
    counter!(
        "offline_relay_notifications_total",
        "kind" => kind.to_string()
    )
    .increment(delivered as u64);
}

/// Record a storage error
pub fn record_storage_error(operation: &str) {
    counter!(
        "offline_relay_storage_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
