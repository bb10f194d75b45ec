// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Published outputs: the hosted zone id and the record names clients should use.
//!
//! Outputs are derived from a converged pass only, so a consumer never sees names the
//! provider does not serve yet. They are available through a `watch` channel, the
//! `/outputs` endpoint and, when configured, a JSON file replaced atomically.

use crate::compiler::{DesiredState, RecordNaming};
use crate::model::HostedZone;
use crate::reconcilers::ReconcileResult;
use crate::registry::RegionRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Values other systems consume once the zone has converged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outputs {
    pub hosted_zone_id: String,
    pub domain_name: String,
    pub default_record_fqdn: String,
    /// Region name → `<region>.<domain>`
    pub region_fqdns: BTreeMap<String, String>,
    /// Region name → health check reference gating its record
    pub health_check_refs: BTreeMap<String, String>,
    /// Fingerprint of the desired state these outputs were derived from
    pub fingerprint: String,
    pub published_at: DateTime<Utc>,
}

impl Outputs {
    #[must_use]
    pub fn derive(
        zone: &HostedZone,
        registry: &RegionRegistry,
        naming: &RecordNaming,
        desired: &DesiredState,
    ) -> Self {
        let region_fqdns: BTreeMap<String, String> = registry
            .regions()
            .iter()
            .map(|r| (r.name.clone(), naming.region_fqdn(&r.name)))
            .collect();

        let health_check_refs = region_fqdns
            .iter()
            .filter_map(|(region, fqdn)| {
                desired
                    .records()
                    .iter()
                    .find(|r| !r.is_default() && &r.name == fqdn)
                    .and_then(|r| r.health_check_ref.clone())
                    .map(|reference| (region.clone(), reference))
            })
            .collect();

        Self {
            hosted_zone_id: zone.id.clone(),
            domain_name: zone.domain_name.clone(),
            default_record_fqdn: naming.default_fqdn(),
            region_fqdns,
            health_check_refs,
            fingerprint: desired.fingerprint(),
            published_at: Utc::now(),
        }
    }
}

/// Publishes [`Outputs`] after converged passes.
pub struct OutputPublisher {
    registry: Arc<RegionRegistry>,
    naming: RecordNaming,
    file: Option<PathBuf>,
    tx: watch::Sender<Option<Arc<Outputs>>>,
}

impl OutputPublisher {
    #[must_use]
    pub fn new(registry: Arc<RegionRegistry>, naming: RecordNaming, file: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            registry,
            naming,
            file,
            tx,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Outputs>>> {
        self.tx.subscribe()
    }

    /// The last published outputs, if any pass has converged yet.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Outputs>> {
        self.tx.borrow().clone()
    }

    /// Publish outputs for a pass. Returns `false`, leaving the previous outputs in
    /// place, when the pass did not converge.
    pub async fn publish(
        &self,
        zone: &HostedZone,
        desired: &DesiredState,
        result: &ReconcileResult,
    ) -> bool {
        if !result.converged {
            debug!(zone_id = %zone.id, "Pass did not converge; outputs unchanged");
            return false;
        }

        let outputs = Arc::new(Outputs::derive(zone, &self.registry, &self.naming, desired));

        if let Some(path) = &self.file {
            if let Err(e) = write_atomically(path, &outputs).await {
                error!(path = %path.display(), error = %e, "Failed to write outputs file");
            }
        }

        let changed = self
            .tx
            .borrow()
            .as_ref()
            .map_or(true, |prev| prev.fingerprint != outputs.fingerprint);
        if changed {
            info!(
                zone_id = %outputs.hosted_zone_id,
                default_record = %outputs.default_record_fqdn,
                regions = outputs.region_fqdns.len(),
                fingerprint = %outputs.fingerprint,
                "Published outputs"
            );
        }

        self.tx.send_replace(Some(outputs));
        true
    }
}

/// Write `outputs` as pretty JSON to a sibling temp file, then rename it over `path`.
async fn write_atomically(path: &Path, outputs: &Outputs) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(outputs)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod outputs_tests;
