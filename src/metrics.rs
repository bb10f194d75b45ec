// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the georoute controller.
//!
//! All metrics use the namespace prefix `georoute_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Passes, their outcomes, triggers and duration
//! - **Record Metrics** - Record changes applied to the provider
//! - **Health Metrics** - Probe results, confirmed transitions, current status per region
//! - **Provider Metrics** - Provider API errors by operation and category
//!
//! # Example
//!
//! ```rust,no_run
//! use georoute::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success(std::time::Duration::from_secs(1));
//! ```

use crate::health::{HealthStatus, ProbeResult};
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all georoute metrics
const METRICS_NAMESPACE: &str = "georoute";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliation passes by outcome
///
/// Labels:
/// - `status`: Outcome (`success`, `divergent`, `partial_convergence`, `cancelled`, `provider_error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliation passes by outcome",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation passes in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliation passes in seconds",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of reconciliation triggers
///
/// Labels:
/// - `reason`: What started the pass (`startup`, `interval`, `health_event`)
pub static RECONCILIATION_TRIGGERS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_triggers_total"),
        "Total number of reconciliation passes by trigger",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Whether the zone matched the desired state after the last pass (1 = converged)
pub static ZONE_CONVERGED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        format!("{METRICS_NAMESPACE}_zone_converged"),
        "Whether the last reconciliation pass converged (1 = converged, 0 = divergent)",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Record Metrics
// ============================================================================

/// Total number of record changes applied
///
/// Labels:
/// - `action`: `create`, `update` or `delete`
pub static RECORD_CHANGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_record_changes_total"),
        "Total number of record changes applied by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Health Metrics
// ============================================================================

/// Total number of health probes
///
/// Labels:
/// - `region`: Region name
/// - `result`: `healthy`, `unhealthy` or `failed`
pub static PROBES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_health_probes_total"),
        "Total number of health probes by region and result",
    );
    let counter = CounterVec::new(opts, &["region", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of confirmed health transitions
///
/// Labels:
/// - `region`: Region name
/// - `status`: Status transitioned to
pub static HEALTH_TRANSITIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_health_transitions_total"),
        "Total number of confirmed health transitions by region and new status",
    );
    let counter = CounterVec::new(opts, &["region", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Current confirmed health per region (1 = healthy, 0 = unhealthy, -1 = unknown)
pub static REGION_HEALTH: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_region_health"),
        "Current confirmed health per region (1 = healthy, 0 = unhealthy, -1 = unknown)",
    );
    let gauge = GaugeVec::new(opts, &["region"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Provider Metrics
// ============================================================================

/// Total number of provider API errors
///
/// Labels:
/// - `operation`: Provider call (`list_records`, `change_records`, ...)
/// - `error_type`: Error category (`transient`, `permanent`, `transport`, ...)
pub static PROVIDER_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_provider_errors_total"),
        "Total number of DNS provider API errors by operation and category",
    );
    let counter = CounterVec::new(opts, &["operation", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a converged reconciliation pass
pub fn record_reconciliation_success(duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&["success"]).inc();
    RECONCILIATION_DURATION_SECONDS.observe(duration.as_secs_f64());
    ZONE_CONVERGED.set(1.0);
}

/// Record a pass that ended without converging
///
/// # Arguments
/// * `error_type` - Category of failure (e.g., `partial_convergence`)
/// * `duration` - Duration of the pass before it gave up
pub fn record_reconciliation_error(error_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&[error_type]).inc();
    RECONCILIATION_DURATION_SECONDS.observe(duration.as_secs_f64());
    ZONE_CONVERGED.set(0.0);
}

/// Record what started a reconciliation pass
pub fn record_reconciliation_trigger(reason: &str) {
    RECONCILIATION_TRIGGERS_TOTAL
        .with_label_values(&[reason])
        .inc();
}

/// Record a record change applied to the provider
///
/// # Arguments
/// * `action` - `create`, `update` or `delete`
pub fn record_record_change(action: &str) {
    RECORD_CHANGES_TOTAL.with_label_values(&[action]).inc();
}

/// Record a health probe result
pub fn record_probe(region: &str, result: ProbeResult) {
    PROBES_TOTAL
        .with_label_values(&[region, result.as_str()])
        .inc();
}

/// Record a confirmed health transition and update the region gauge
pub fn record_health_transition(region: &str, to: HealthStatus) {
    HEALTH_TRANSITIONS_TOTAL
        .with_label_values(&[region, to.as_str()])
        .inc();
    set_region_health(region, to);
}

/// Set the current health gauge for a region
pub fn set_region_health(region: &str, status: HealthStatus) {
    REGION_HEALTH
        .with_label_values(&[region])
        .set(status.gauge_value());
}

/// Record a provider API error
///
/// # Arguments
/// * `operation` - The provider call that failed
/// * `error_type` - Category of error (see `ProviderError::error_type`)
pub fn record_provider_error(operation: &str, error_type: &str) {
    PROVIDER_ERRORS_TOTAL
        .with_label_values(&[operation, error_type])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
