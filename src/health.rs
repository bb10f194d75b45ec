// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-region health state machine and endpoint probe.
//!
//! Every region starts `Unknown`. A status is only confirmed after `failure_threshold`
//! consecutive results agreeing with it; in between, the last confirmed status is kept.
//! This applies to the first transition out of `Unknown` as well, so a freshly started
//! controller does not trust a single lucky probe.
//!
//! Probe errors (timeouts, resolution or connection failures, non-2xx responses) are
//! ordinary failures. [`Prober::probe`] never returns an error.

use crate::constants::{PROBE_JITTER_FACTOR, PROBE_USER_AGENT};
use crate::registry::Region;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Confirmed health of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Healthy => "HEALTHY",
            Self::Unhealthy => "UNHEALTHY",
        }
    }

    /// Gauge value exported for this status.
    #[must_use]
    pub fn gauge_value(self) -> f64 {
        match self {
            Self::Unknown => -1.0,
            Self::Healthy => 1.0,
            Self::Unhealthy => 0.0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one region's health.
///
/// Produced only by the region's own probe task; everyone else sees copies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckState {
    pub region_name: String,
    pub status: HealthStatus,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    pub last_probe_at: Option<DateTime<Utc>>,
    /// Incremented on every recorded probe
    pub version: u64,
}

impl HealthCheckState {
    #[must_use]
    pub fn new(region_name: &str) -> Self {
        Self {
            region_name: region_name.to_string(),
            status: HealthStatus::Unknown,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_probe_at: None,
            version: 0,
        }
    }
}

/// A confirmed status change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthTransition {
    pub region: String,
    pub from: HealthStatus,
    pub to: HealthStatus,
    pub at: DateTime<Utc>,
}

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// 2xx response (and expected body, if configured).
    Healthy,
    /// A response was received but it was not acceptable.
    Unhealthy,
    /// No usable response: timeout, resolution or connection failure.
    Failed,
}

impl ProbeResult {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Healthy
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Failed => "failed",
        }
    }
}

/// Debounced health state machine for a single region.
#[derive(Debug)]
pub struct HealthTracker {
    state: HealthCheckState,
    threshold: u32,
}

impl HealthTracker {
    #[must_use]
    pub fn new(region_name: &str, failure_threshold: u32) -> Self {
        Self {
            state: HealthCheckState::new(region_name),
            threshold: failure_threshold.max(1),
        }
    }

    /// Record a probe result, returning the transition if the confirmed status changed.
    pub fn record(&mut self, result: ProbeResult, at: DateTime<Utc>) -> Option<HealthTransition> {
        let previous = self.state.status;
        self.state.version += 1;
        self.state.last_probe_at = Some(at);

        if result.is_success() {
            self.state.consecutive_failures = 0;
            self.state.consecutive_successes = self.state.consecutive_successes.saturating_add(1);
            if self.state.consecutive_successes >= self.threshold {
                self.state.status = HealthStatus::Healthy;
            }
        } else {
            self.state.consecutive_successes = 0;
            self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
            if self.state.consecutive_failures >= self.threshold {
                self.state.status = HealthStatus::Unhealthy;
            }
        }

        if self.state.status == previous {
            return None;
        }

        match self.state.status {
            HealthStatus::Unhealthy => warn!(
                region = %self.state.region_name,
                failures = self.state.consecutive_failures,
                threshold = self.threshold,
                "region marked unhealthy"
            ),
            _ => info!(
                region = %self.state.region_name,
                successes = self.state.consecutive_successes,
                from = %previous,
                "region marked healthy"
            ),
        }

        Some(HealthTransition {
            region: self.state.region_name.clone(),
            from: previous,
            to: self.state.status,
            at,
        })
    }

    #[must_use]
    pub fn state(&self) -> &HealthCheckState {
        &self.state
    }

    #[must_use]
    pub fn status(&self) -> HealthStatus {
        self.state.status
    }
}

/// Executes a reachability check against a region's endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, region: &Region) -> ProbeResult;
}

/// HTTP(S) GET probe bounded by a per-probe timeout.
#[derive(Clone, Debug)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober with the given per-probe timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(PROBE_USER_AGENT)
            .build()?;
        Ok(Self { client, timeout })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, url: Url, expected_body: Option<&str>) -> ProbeResult {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, %url, "health probe request failed");
                return ProbeResult::Failed;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, %url, "health probe non-2xx");
            return ProbeResult::Unhealthy;
        }

        let Some(expected) = expected_body else {
            return ProbeResult::Healthy;
        };

        match response.text().await {
            Ok(body) if body.contains(expected) => ProbeResult::Healthy,
            Ok(_) => {
                debug!(%url, expected, "health probe body did not match");
                ProbeResult::Unhealthy
            }
            Err(e) => {
                debug!(error = %e, %url, "health probe body read failed");
                ProbeResult::Failed
            }
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, region: &Region) -> ProbeResult {
        let url = match probe_url(region) {
            Ok(url) => url,
            Err(e) => {
                warn!(region = %region.name, error = %e, "cannot build health probe URL");
                return ProbeResult::Failed;
            }
        };

        match tokio::time::timeout(
            self.timeout,
            self.execute(url.clone(), region.expected_body.as_deref()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                debug!(%url, timeout = ?self.timeout, "health probe timed out");
                ProbeResult::Failed
            }
        }
    }
}

/// Build `<scheme>://<endpoint_alias>:<port><path>` for a region.
///
/// # Errors
///
/// Returns an error if the endpoint or path do not form a valid URL.
pub fn probe_url(region: &Region) -> Result<Url, url::ParseError> {
    let base = Url::parse(&format!(
        "{}://{}:{}/",
        region.health_check_protocol.scheme(),
        region.endpoint_alias.trim_end_matches('.'),
        region.probe_port()
    ))?;
    base.join(&region.health_check_path)
}

/// Apply up to ±20% random jitter to a probe interval.
#[must_use]
pub fn jittered_interval(base: Duration) -> Duration {
    apply_jitter(base, PROBE_JITTER_FACTOR)
}

/// Random delay in `[0, interval)` before a region's first probe, so regions sharing an
/// interval do not probe in lockstep from startup.
#[must_use]
pub fn initial_probe_delay(interval: Duration) -> Duration {
    if interval.is_zero() {
        return interval;
    }
    interval.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
}

/// Apply up to `±factor` random jitter to an interval.
#[must_use]
pub fn apply_jitter(base: Duration, factor: f64) -> Duration {
    if factor <= 0.0 {
        return base;
    }
    let secs = base.as_secs_f64();
    let delta = secs * factor;
    let jittered = rand::thread_rng().gen_range((secs - delta)..=(secs + delta));
    Duration::from_secs_f64(jittered.max(0.0))
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod health_tests;
