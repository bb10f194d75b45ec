// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Core data types shared between the compiler, the reconciler and the provider.
//!
//! Records are identified by [`RecordKey`], the `(name, geolocation_key)` pair. A record
//! without a geolocation key is the default (catch-all) record for its name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to the hosted zone the controller manages records in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedZone {
    /// Provider-assigned zone identifier
    pub id: String,
    /// Domain the zone is authoritative for, without trailing dot
    pub domain_name: String,
    /// `true` when this controller created the zone and owns every record in it
    pub managed: bool,
}

/// Identity of a routing record: at most one record may exist per key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordKey {
    pub name: String,
    pub geolocation_key: Option<String>,
}

impl RecordKey {
    #[must_use]
    pub fn new(name: impl Into<String>, geolocation_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            geolocation_key,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.geolocation_key {
            Some(key) => write!(f, "{} [{key}]", self.name),
            None => write!(f, "{} [default]", self.name),
        }
    }
}

/// Alias record routed by requester geolocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRecord {
    /// Fully qualified record name, without trailing dot
    pub name: String,
    /// Geolocation the record answers for; `None` marks the default record
    pub geolocation_key: Option<String>,
    /// DNS name the alias resolves to
    pub alias_target: String,
    /// Zone identifier of the alias target
    pub alias_zone_id: String,
    /// Health check gating this record at resolution time
    pub health_check_ref: Option<String>,
    /// Whether the provider should also evaluate the alias target's own health
    pub evaluate_target_health: bool,
}

impl RoutingRecord {
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.name.clone(), self.geolocation_key.clone())
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.geolocation_key.is_none()
    }

    #[must_use]
    pub fn is_health_gated(&self) -> bool {
        self.health_check_ref.is_some()
    }
}

/// Provider-side health check definition, registered once per region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    /// Caller reference; records name this in `health_check_ref`
    pub reference: String,
    /// Endpoint the provider probes
    pub fqdn: String,
    pub protocol: String,
    pub port: u16,
    pub path: String,
    pub interval_secs: u64,
    pub failure_threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_body: Option<String>,
}

/// A provider-side health check as returned by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub id: String,
    pub spec: HealthCheckSpec,
}

/// A single mutation submitted to the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "record", rename_all = "UPPERCASE")]
pub enum RecordChange {
    Create(RoutingRecord),
    Update(RoutingRecord),
    Delete(RoutingRecord),
}

impl RecordChange {
    #[must_use]
    pub fn record(&self) -> &RoutingRecord {
        match self {
            Self::Create(r) | Self::Update(r) | Self::Delete(r) => r,
        }
    }

    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// Joins record keys for log lines and error messages.
#[must_use]
pub fn join_keys(keys: &[RecordKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
