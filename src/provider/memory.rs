// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process DNS provider.
//!
//! Keeps zones, records and health checks in memory and lets callers queue failures
//! for upcoming calls. Used by the test suites and for dry runs without provider
//! credentials.

use super::DnsProvider;
use crate::dns_errors::ProviderError;
use crate::model::{
    HealthCheck, HealthCheckSpec, HostedZone, RecordChange, RecordKey, RoutingRecord,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    zones: BTreeMap<String, HostedZone>,
    records: BTreeMap<String, BTreeMap<RecordKey, RoutingRecord>>,
    health_checks: BTreeMap<String, HealthCheck>,
    batch_failures: VecDeque<ProviderError>,
    record_failures: HashMap<RecordKey, VecDeque<ProviderError>>,
    list_failures: VecDeque<ProviderError>,
    zone_creation_failure: Option<ProviderError>,
    change_calls: usize,
    list_calls: usize,
    zone_creations: usize,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:012}", self.next_id)
    }

    fn take_record_failure(&mut self, key: &RecordKey) -> Option<ProviderError> {
        let queue = self.record_failures.get_mut(key)?;
        let error = queue.pop_front();
        if queue.is_empty() {
            self.record_failures.remove(key);
        }
        error
    }
}

/// In-memory [`DnsProvider`] with failure injection.
pub struct MemoryProvider {
    state: Mutex<MemoryState>,
    atomic: bool,
}

impl MemoryProvider {
    /// Provider whose change batches are applied all-or-nothing.
    #[must_use]
    pub fn atomic() -> Self {
        Self::new(true)
    }

    /// Provider that applies changes one at a time and stops at the first failure.
    #[must_use]
    pub fn sequential() -> Self {
        Self::new(false)
    }

    fn new(atomic: bool) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            atomic,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an existing zone.
    pub fn insert_zone(&self, zone: HostedZone) {
        let mut state = self.lock();
        state.records.entry(zone.id.clone()).or_default();
        state.zones.insert(zone.id.clone(), zone);
    }

    /// Put a record directly into a zone, bypassing change batches.
    pub fn insert_record(&self, zone_id: &str, record: RoutingRecord) {
        self.lock()
            .records
            .entry(zone_id.to_string())
            .or_default()
            .insert(record.key(), record);
    }

    /// Current records of a zone, sorted by key.
    #[must_use]
    pub fn records(&self, zone_id: &str) -> Vec<RoutingRecord> {
        self.lock()
            .records
            .get(zone_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Registered health checks, sorted by reference.
    #[must_use]
    pub fn health_checks(&self) -> Vec<HealthCheck> {
        self.lock().health_checks.values().cloned().collect()
    }

    /// Fail the next `change_records` call with `error` before applying anything.
    pub fn fail_next_batch(&self, error: ProviderError) {
        self.lock().batch_failures.push_back(error);
    }

    /// Fail the next change touching `key` with `error`.
    ///
    /// In atomic mode the whole batch is rejected; otherwise changes before it in the
    /// batch stay applied.
    pub fn fail_record(&self, key: RecordKey, error: ProviderError) {
        self.lock()
            .record_failures
            .entry(key)
            .or_default()
            .push_back(error);
    }

    /// Fail the next `list_records` call with `error`.
    pub fn fail_next_list(&self, error: ProviderError) {
        self.lock().list_failures.push_back(error);
    }

    /// Fail the next `create_hosted_zone` call with `error`.
    pub fn fail_zone_creation(&self, error: ProviderError) {
        self.lock().zone_creation_failure = Some(error);
    }

    /// Number of `change_records` calls received, failed ones included.
    #[must_use]
    pub fn change_calls(&self) -> usize {
        self.lock().change_calls
    }

    /// Number of `list_records` calls received, failed ones included.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    /// Number of zones created through `create_hosted_zone`.
    #[must_use]
    pub fn zone_creations(&self) -> usize {
        self.lock().zone_creations
    }
}

fn apply(
    records: &mut BTreeMap<RecordKey, RoutingRecord>,
    change: &RecordChange,
) -> Result<(), ProviderError> {
    let record = change.record();
    let key = record.key();
    match change {
        RecordChange::Create(_) => {
            if records.contains_key(&key) {
                return Err(ProviderError::Permanent {
                    status: 409,
                    message: format!("record {key} already exists"),
                });
            }
            records.insert(key, record.clone());
        }
        RecordChange::Update(_) => {
            if !records.contains_key(&key) {
                return Err(ProviderError::Permanent {
                    status: 400,
                    message: format!("record {key} does not exist"),
                });
            }
            records.insert(key, record.clone());
        }
        RecordChange::Delete(_) => {
            if records.remove(&key).is_none() {
                return Err(ProviderError::Permanent {
                    status: 400,
                    message: format!("record {key} does not exist"),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DnsProvider for MemoryProvider {
    async fn create_hosted_zone(
        &self,
        domain: &str,
        caller_reference: &str,
    ) -> Result<HostedZone, ProviderError> {
        let mut state = self.lock();
        if let Some(error) = state.zone_creation_failure.take() {
            return Err(error);
        }

        let zone = HostedZone {
            id: state.next_id("Z"),
            domain_name: domain.trim_end_matches('.').to_ascii_lowercase(),
            managed: true,
        };
        debug!(zone_id = %zone.id, domain, caller_reference, "created in-memory hosted zone");

        state.zone_creations += 1;
        state.records.insert(zone.id.clone(), BTreeMap::new());
        state.zones.insert(zone.id.clone(), zone.clone());
        Ok(zone)
    }

    async fn get_hosted_zone(&self, zone_id: &str) -> Result<HostedZone, ProviderError> {
        self.lock()
            .zones
            .get(zone_id)
            .map(|zone| HostedZone {
                managed: false,
                ..zone.clone()
            })
            .ok_or_else(|| ProviderError::NotFound {
                resource: format!("zone {zone_id}"),
            })
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RoutingRecord>, ProviderError> {
        let mut state = self.lock();
        state.list_calls += 1;
        if let Some(error) = state.list_failures.pop_front() {
            return Err(error);
        }
        state
            .records
            .get(zone_id)
            .map(|records| records.values().cloned().collect())
            .ok_or_else(|| ProviderError::NotFound {
                resource: format!("zone {zone_id}"),
            })
    }

    async fn change_records(
        &self,
        zone_id: &str,
        changes: &[RecordChange],
    ) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.change_calls += 1;

        if let Some(error) = state.batch_failures.pop_front() {
            return Err(error);
        }

        if self.atomic {
            for change in changes {
                if let Some(error) = state.take_record_failure(&change.record().key()) {
                    return Err(error);
                }
            }
            let records = state.records.get(zone_id).ok_or_else(|| ProviderError::NotFound {
                resource: format!("zone {zone_id}"),
            })?;
            let mut staged = records.clone();
            for change in changes {
                apply(&mut staged, change)?;
            }
            state.records.insert(zone_id.to_string(), staged);
            return Ok(());
        }

        for change in changes {
            if let Some(error) = state.take_record_failure(&change.record().key()) {
                return Err(error);
            }
            let records = state
                .records
                .get_mut(zone_id)
                .ok_or_else(|| ProviderError::NotFound {
                    resource: format!("zone {zone_id}"),
                })?;
            apply(records, change)?;
        }
        Ok(())
    }

    async fn create_health_check(
        &self,
        spec: &HealthCheckSpec,
    ) -> Result<HealthCheck, ProviderError> {
        let mut state = self.lock();
        if let Some(existing) = state.health_checks.get(&spec.reference) {
            return Err(ProviderError::Permanent {
                status: 409,
                message: format!("health check {} already exists", existing.spec.reference),
            });
        }
        let check = HealthCheck {
            id: state.next_id("hc-"),
            spec: spec.clone(),
        };
        state
            .health_checks
            .insert(spec.reference.clone(), check.clone());
        Ok(check)
    }

    async fn get_health_check(
        &self,
        reference: &str,
    ) -> Result<Option<HealthCheck>, ProviderError> {
        Ok(self.lock().health_checks.get(reference).cloned())
    }

    fn supports_atomic_batches(&self) -> bool {
        self.atomic
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
