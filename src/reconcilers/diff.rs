// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record drift detection.
//!
//! Compares the desired record set with what the provider actually holds and produces
//! the minimal [`ChangeSet`] that converges them. Records are matched by
//! `(name, geolocation_key)`; two records with the same key differ when any of alias
//! target, alias zone, health check reference or the evaluate flag differ.

use crate::compiler::DesiredState;
use crate::model::{HostedZone, RecordChange, RecordKey, RoutingRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The provider's record set, limited to records this controller owns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActualState {
    records: BTreeMap<RecordKey, RoutingRecord>,
}

impl ActualState {
    /// Scope the provider's records to the ones this controller owns.
    ///
    /// A managed zone belongs to the controller entirely. In an external zone only names
    /// that appear in the desired state are considered, so unrelated records survive. So do
    /// records under names an earlier configuration used, such as `www` after a switch to
    /// the apex; those need manual cleanup.
    #[must_use]
    pub fn scoped(zone: &HostedZone, desired: &DesiredState, records: Vec<RoutingRecord>) -> Self {
        let owned_names: BTreeSet<&str> =
            desired.records().iter().map(|r| r.name.as_str()).collect();

        let records = records
            .into_iter()
            .filter(|r| zone.managed || owned_names.contains(r.name.as_str()))
            .map(|r| (r.key(), r))
            .collect();

        Self { records }
    }

    #[must_use]
    pub fn get(&self, key: &RecordKey) -> Option<&RoutingRecord> {
        self.records.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &RoutingRecord> {
        self.records.values()
    }
}

/// Changes that take the actual state to the desired state. Empty means converged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub deletes: Vec<RoutingRecord>,
    pub updates: Vec<RoutingRecord>,
    pub creates: Vec<RoutingRecord>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.creates.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deletes.len() + self.updates.len() + self.creates.len()
    }

    /// Keys of every record touched, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<RecordKey> {
        let keys: BTreeSet<RecordKey> = self
            .deletes
            .iter()
            .chain(&self.updates)
            .chain(&self.creates)
            .map(RoutingRecord::key)
            .collect();
        keys.into_iter().collect()
    }

    /// Changes in application order: deletes, then updates, then creates.
    #[must_use]
    pub fn ordered_changes(&self) -> Vec<RecordChange> {
        self.deletes
            .iter()
            .cloned()
            .map(RecordChange::Delete)
            .chain(self.updates.iter().cloned().map(RecordChange::Update))
            .chain(self.creates.iter().cloned().map(RecordChange::Create))
            .collect()
    }

    /// Fold in changes applied by a later attempt of the same pass.
    pub fn extend(&mut self, other: ChangeSet) {
        self.deletes.extend(other.deletes);
        self.updates.extend(other.updates);
        self.creates.extend(other.creates);
    }
}

/// Compute the changes needed to converge `actual` on `desired`.
#[must_use]
pub fn diff(desired: &DesiredState, actual: &ActualState) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut wanted = BTreeSet::new();

    for record in desired.records() {
        let key = record.key();
        match actual.get(&key) {
            None => changes.creates.push(record.clone()),
            Some(existing) if existing != record => changes.updates.push(record.clone()),
            Some(_) => {}
        }
        wanted.insert(key);
    }

    changes.deletes = actual
        .records()
        .filter(|r| !wanted.contains(&r.key()))
        .cloned()
        .collect();

    changes
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod diff_tests;
