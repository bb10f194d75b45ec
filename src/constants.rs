// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the georoute controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Configuration Constants
// ============================================================================

/// Environment variable holding the path of the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "GEOROUTE_CONFIG";

/// Configuration file used when `GEOROUTE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "/etc/georoute/config.yaml";

/// Environment variable overriding the provider API token
pub const PROVIDER_TOKEN_ENV: &str = "GEOROUTE_PROVIDER_TOKEN";

// ============================================================================
// DNS Naming Constants
// ============================================================================

/// Label used for the default (catch-all) record when `default_record: www`
pub const DEFAULT_RECORD_LABEL: &str = "www";

/// Maximum length of a single DNS label
pub const MAX_DNS_LABEL_LEN: usize = 63;

/// Maximum length of a hosted zone identifier
pub const MAX_ZONE_ID_LEN: usize = 32;

/// Prefix some providers put in front of hosted zone identifiers
pub const HOSTED_ZONE_ID_PREFIX: &str = "/hostedzone/";

// ============================================================================
// Health Check Constants
// ============================================================================

/// Default health check path
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/health";

/// Default interval between probes for a region (30 seconds)
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

/// Default consecutive results needed to confirm a status change
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default per-probe timeout (5 seconds)
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Maximum jitter applied to the probe interval (±20%)
pub const PROBE_JITTER_FACTOR: f64 = 0.2;

/// User agent sent with every health probe
pub const PROBE_USER_AGENT: &str = concat!("georoute-health/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Reconciliation Constants
// ============================================================================

/// Default cadence of periodic reconciliation passes (60 seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;

/// Default window in which health events coalesce into one pass (2 seconds)
pub const DEFAULT_DEBOUNCE_MILLIS: u64 = 2000;

/// Default maximum number of apply attempts per reconciliation pass
pub const DEFAULT_MAX_APPLY_ATTEMPTS: u32 = 5;

/// Capacity of the health event channel feeding the controller loop
pub const HEALTH_EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Provider API Constants
// ============================================================================

/// HTTP timeout for DNS provider API calls (30 seconds)
pub const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics and outputs HTTP server
pub const DEFAULT_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the published outputs endpoint
pub const OUTPUTS_SERVER_PATH: &str = "/outputs";

/// Path for the liveness endpoint
pub const HEALTHZ_SERVER_PATH: &str = "/healthz";
