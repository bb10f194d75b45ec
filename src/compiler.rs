// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-State Compiler.
//!
//! [`compile`] is a pure function from the region registry, a health snapshot and the
//! optional fallback target to the complete record set the zone should contain:
//!
//! - one geolocation record per region, named `<region>.<domain>` and gated by the
//!   region's health check. A region that is currently unhealthy keeps its record; the
//!   provider withholds it at resolution time through the health check.
//! - exactly one default record (`www.<domain>` or the apex) aliasing the fallback
//!   target when configured, otherwise the primary region regardless of its health.
//!
//! The output is sorted by record key, so the same inputs always produce the same bytes.

use crate::health::{HealthCheckState, HealthStatus};
use crate::model::{RecordKey, RoutingRecord};
use crate::registry::{Region, RegionRegistry};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Where the default (catch-all) record lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultRecordName {
    /// `www.<domain>`
    #[default]
    Www,
    /// The bare domain
    Apex,
}

/// Naming rules for the records of one domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordNaming {
    domain: String,
    default_record: DefaultRecordName,
}

impl RecordNaming {
    #[must_use]
    pub fn new(domain: &str, default_record: DefaultRecordName) -> Self {
        Self {
            domain: domain.trim_end_matches('.').to_ascii_lowercase(),
            default_record,
        }
    }

    /// Naming with the default record at `www.<domain>`.
    #[must_use]
    pub fn www(domain: &str) -> Self {
        Self::new(domain, DefaultRecordName::Www)
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn region_fqdn(&self, region: &str) -> String {
        format!("{region}.{}", self.domain)
    }

    #[must_use]
    pub fn default_fqdn(&self) -> String {
        match self.default_record {
            DefaultRecordName::Www => {
                format!("{}.{}", crate::constants::DEFAULT_RECORD_LABEL, self.domain)
            }
            DefaultRecordName::Apex => self.domain.clone(),
        }
    }
}

/// Alias target used for the default record instead of the primary region, typically
/// an edge-delivery distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackTarget {
    pub domain_name: String,
    pub zone_id: String,
}

/// The complete record set the zone should contain.
///
/// Built only by [`compile`]; replaced wholesale, never edited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DesiredState {
    records: Vec<RoutingRecord>,
}

impl DesiredState {
    #[must_use]
    pub fn records(&self) -> &[RoutingRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, key: &RecordKey) -> Option<&RoutingRecord> {
        self.records.iter().find(|r| &r.key() == key)
    }

    #[must_use]
    pub fn default_record(&self) -> Option<&RoutingRecord> {
        self.records.iter().find(|r| r.is_default())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Canonical JSON serialization of the record set.
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(&self.records).unwrap_or_default()
    }

    /// SHA-256 of the canonical serialization, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_canonical_json().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Compile the desired record set.
#[must_use]
pub fn compile(
    registry: &RegionRegistry,
    health: &BTreeMap<String, HealthCheckState>,
    naming: &RecordNaming,
    fallback: Option<&FallbackTarget>,
) -> DesiredState {
    // Status never removes a record: the provider withholds unhealthy targets through the
    // health check. A record is gated only by a health check that has a tracked state.
    let gate = |region: &Region| {
        health
            .contains_key(&region.name)
            .then(|| region.health_check_ref())
    };

    let mut records: Vec<RoutingRecord> = registry
        .regions()
        .iter()
        .map(|region| RoutingRecord {
            name: naming.region_fqdn(&region.name),
            geolocation_key: Some(region.geolocation_key.clone()),
            alias_target: normalize(&region.endpoint_alias),
            alias_zone_id: region.endpoint_zone_id.clone(),
            health_check_ref: gate(region),
            evaluate_target_health: true,
        })
        .collect();

    let default_record = match fallback {
        Some(target) => RoutingRecord {
            name: naming.default_fqdn(),
            geolocation_key: None,
            alias_target: normalize(&target.domain_name),
            alias_zone_id: target.zone_id.clone(),
            health_check_ref: None,
            evaluate_target_health: false,
        },
        None => {
            let primary = registry.primary();
            RoutingRecord {
                name: naming.default_fqdn(),
                geolocation_key: None,
                alias_target: normalize(&primary.endpoint_alias),
                alias_zone_id: primary.endpoint_zone_id.clone(),
                health_check_ref: gate(primary),
                evaluate_target_health: true,
            }
        }
    };
    records.push(default_record);

    records.sort_by_key(RoutingRecord::key);
    records.dedup_by(|a, b| a.key() == b.key());

    DesiredState { records }
}

/// Health counts across the registry, for logging a compilation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub healthy: usize,
    pub unhealthy: usize,
    pub unknown: usize,
}

/// Count regions by their status in `health`; missing regions count as unknown.
#[must_use]
pub fn summarize(
    registry: &RegionRegistry,
    health: &BTreeMap<String, HealthCheckState>,
) -> CompileSummary {
    registry
        .regions()
        .iter()
        .fold(CompileSummary::default(), |mut summary, region| {
            match health.get(&region.name).map(|s| s.status) {
                Some(HealthStatus::Healthy) => summary.healthy += 1,
                Some(HealthStatus::Unhealthy) => summary.unhealthy += 1,
                Some(HealthStatus::Unknown) | None => summary.unknown += 1,
            }
            summary
        })
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod compiler_tests;
