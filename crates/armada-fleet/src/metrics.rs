// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Prometheus metrics for worker leadership and reconcile outcomes.
//!
//! Metrics are fire-and-forget: recording never blocks or fails
//! reconciliation. Stopping a worker resets its leader gauge so scraped
//! values do not report stale leadership after shutdown or demotion.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

lazy_static! {
    /// Global Prometheus metrics registry for the fleet service.
    pub static ref REGISTRY: Registry = Registry::new();

    /// 1 while this process is the leader for a worker type, 0 otherwise.
    static ref WORKER_LEADER: IntGaugeVec = IntGaugeVec::new(
        Opts::new("armada_worker_leader", "Leadership status per worker type"),
        &["worker_type"]
    ).expect("metric can be created");

    /// Total reconcile ticks executed per worker type.
    static ref RECONCILE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("armada_reconcile_total", "Total reconcile runs"),
        &["worker_type"]
    ).expect("metric can be created");

    /// Total per-record reconcile failures per worker type.
    static ref RECONCILE_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("armada_reconcile_errors_total", "Total per-record reconcile failures"),
        &["worker_type"]
    ).expect("metric can be created");

    /// Duration of reconcile runs per worker type.
    static ref RECONCILE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("armada_reconcile_duration_seconds", "Reconcile run duration in seconds")
            .buckets(vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["worker_type"]
    ).expect("metric can be created");
}

/// Register all fleet metrics with the global registry.
///
/// Safe to call multiple times; registration happens once.
pub fn register_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(WORKER_LEADER.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(RECONCILE_TOTAL.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(RECONCILE_ERRORS_TOTAL.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(RECONCILE_DURATION.clone()))
            .expect("collector can be registered");
    });
}

/// Record the leadership status for a worker type.
pub fn set_leader(worker_type: &str, is_leader: bool) {
    WORKER_LEADER
        .with_label_values(&[worker_type])
        .set(if is_leader { 1 } else { 0 });
}

/// Record one reconcile run and its per-record failure count.
pub fn observe_reconcile(worker_type: &str, duration: Duration, error_count: usize) {
    RECONCILE_TOTAL.with_label_values(&[worker_type]).inc();
    RECONCILE_ERRORS_TOTAL
        .with_label_values(&[worker_type])
        .inc_by(error_count as u64);
    RECONCILE_DURATION
        .with_label_values(&[worker_type])
        .observe(duration.as_secs_f64());
}

/// Drop a worker type's leader gauge so stopped workers report nothing.
pub fn reset_worker_metrics(worker_type: &str) {
    let _ = WORKER_LEADER.remove_label_values(&[worker_type]);
}
