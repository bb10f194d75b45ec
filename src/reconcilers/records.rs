// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Routing record reconciliation.
//!
//! A pass reads the zone's records, diffs them against the desired state and applies
//! the difference:
//!
//! - **Atomic providers** receive one change batch per attempt.
//! - **Other providers** receive one change at a time, deletes first, then updates, then
//!   creates, stopping at the first failure. The ordered list of one attempt counts as a
//!   single batch: shutdown does not interrupt it.
//!
//! After every attempt the zone is re-read and re-diffed, so a retry only carries the
//! records that are still divergent. The pass reports `converged` only once a
//! verification read shows no remaining difference.

use super::diff::{diff, ActualState, ChangeSet};
use super::retry::{provider_backoff, retry_provider_call};
use crate::compiler::DesiredState;
use crate::dns_errors::{ProviderError, ReconcileError};
use crate::metrics;
use crate::model::{join_keys, HostedZone, RecordChange};
use crate::provider::DnsProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

/// Outcome of a reconciliation pass that did not fail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Every change the provider accepted during the pass
    pub applied: ChangeSet,
    /// Apply attempts made; 0 when the zone was already converged
    pub attempts: u32,
    /// Whether the final verification read matched the desired state
    pub converged: bool,
}

struct ApplyOutcome {
    applied: ChangeSet,
    error: Option<ProviderError>,
}

/// Converges hosted zones on their desired record sets.
///
/// Passes against the same zone are serialized by a per-zone lock held for the whole
/// pass.
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    max_attempts: u32,
    zone_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(provider: Arc<dyn DnsProvider>, max_attempts: u32) -> Self {
        Self {
            provider,
            max_attempts: max_attempts.max(1),
            zone_locks: Mutex::new(HashMap::new()),
        }
    }

    fn zone_lock(&self, zone_id: &str) -> Arc<AsyncMutex<()>> {
        self.zone_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(zone_id.to_string())
            .or_default()
            .clone()
    }

    /// Run one reconciliation pass for `zone`.
    ///
    /// `shutdown` is checked between batches only; a submitted batch always completes.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Provider`] if the zone's records cannot be read
    /// - [`ReconcileError::PartialConvergence`] if a permanent error occurs, retries are
    ///   exhausted with records still divergent, or the zone cannot be re-read after an
    ///   apply
    /// - [`ReconcileError::Cancelled`] if shutdown is requested before convergence
    pub async fn reconcile(
        &self,
        zone: &HostedZone,
        desired: &DesiredState,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<ReconcileResult, ReconcileError> {
        let lock = self.zone_lock(&zone.id);
        let _guard = lock.lock().await;

        let mut changes = self.pending_changes(zone, desired).await?;
        if changes.is_empty() {
            debug!(zone_id = %zone.id, records = desired.len(), "Zone already converged");
            return Ok(ReconcileResult {
                applied: ChangeSet::default(),
                attempts: 0,
                converged: true,
            });
        }

        let mut backoff = provider_backoff(self.max_attempts);
        let mut applied = ChangeSet::default();

        loop {
            if *shutdown.borrow() {
                return Err(ReconcileError::Cancelled {
                    unresolved: changes.keys(),
                });
            }

            info!(
                zone_id = %zone.id,
                attempt = backoff.attempts(),
                deletes = changes.deletes.len(),
                updates = changes.updates.len(),
                creates = changes.creates.len(),
                "Applying record changes"
            );

            let outcome = if self.provider.supports_atomic_batches() {
                self.apply_atomic(zone, &changes).await
            } else {
                self.apply_sequential(zone, &changes).await
            };
            applied.extend(outcome.applied);

            let remaining = match self.read_changes(zone, desired).await {
                Ok(remaining) => remaining,
                Err(source) => {
                    error!(
                        zone_id = %zone.id,
                        unresolved = %join_keys(&changes.keys()),
                        error = %source,
                        "Failed to re-read zone after applying changes"
                    );
                    return Err(ReconcileError::PartialConvergence {
                        unresolved: changes.keys(),
                        attempts: backoff.attempts(),
                        source,
                    });
                }
            };
            if remaining.is_empty() {
                info!(
                    zone_id = %zone.id,
                    attempts = backoff.attempts(),
                    applied = applied.len(),
                    "Zone converged"
                );
                return Ok(ReconcileResult {
                    applied,
                    attempts: backoff.attempts(),
                    converged: true,
                });
            }

            let last_error = match outcome.error {
                Some(e) if !e.is_retryable() => {
                    error!(
                        zone_id = %zone.id,
                        unresolved = %join_keys(&remaining.keys()),
                        error = %e,
                        "Provider rejected record changes"
                    );
                    return Err(ReconcileError::PartialConvergence {
                        unresolved: remaining.keys(),
                        attempts: backoff.attempts(),
                        source: e,
                    });
                }
                Some(e) => Some(e),
                None => {
                    warn!(
                        zone_id = %zone.id,
                        unresolved = %join_keys(&remaining.keys()),
                        "Verification found records still divergent after a successful apply"
                    );
                    None
                }
            };

            let attempts = backoff.attempts();
            let Some(delay) = backoff.next_backoff() else {
                return match last_error {
                    Some(source) => {
                        error!(
                            zone_id = %zone.id,
                            attempts,
                            unresolved = %join_keys(&remaining.keys()),
                            "Retry attempts exhausted"
                        );
                        Err(ReconcileError::PartialConvergence {
                            unresolved: remaining.keys(),
                            attempts,
                            source,
                        })
                    }
                    None => Ok(ReconcileResult {
                        applied,
                        attempts,
                        converged: false,
                    }),
                };
            };

            if wait_or_shutdown(delay, shutdown).await {
                return Err(ReconcileError::Cancelled {
                    unresolved: remaining.keys(),
                });
            }
            changes = remaining;
        }
    }

    /// Read the zone and diff it against `desired`.
    async fn pending_changes(
        &self,
        zone: &HostedZone,
        desired: &DesiredState,
    ) -> Result<ChangeSet, ReconcileError> {
        self.read_changes(zone, desired)
            .await
            .map_err(|source| ReconcileError::Provider {
                operation: "list records".to_string(),
                zone_id: zone.id.clone(),
                source,
            })
    }

    async fn read_changes(
        &self,
        zone: &HostedZone,
        desired: &DesiredState,
    ) -> Result<ChangeSet, ProviderError> {
        let records = retry_provider_call(
            || self.provider.list_records(&zone.id),
            "list_records",
            self.max_attempts,
        )
        .await?;

        let actual = ActualState::scoped(zone, desired, records);
        Ok(diff(desired, &actual))
    }

    async fn apply_atomic(&self, zone: &HostedZone, changes: &ChangeSet) -> ApplyOutcome {
        let batch = changes.ordered_changes();
        match self.provider.change_records(&zone.id, &batch).await {
            Ok(()) => {
                for change in &batch {
                    metrics::record_record_change(change.action());
                }
                ApplyOutcome {
                    applied: changes.clone(),
                    error: None,
                }
            }
            Err(e) => {
                metrics::record_provider_error("change_records", e.error_type());
                warn!(zone_id = %zone.id, changes = batch.len(), error = %e, "Change batch failed");
                ApplyOutcome {
                    applied: ChangeSet::default(),
                    error: Some(e),
                }
            }
        }
    }

    async fn apply_sequential(&self, zone: &HostedZone, changes: &ChangeSet) -> ApplyOutcome {
        let mut applied = ChangeSet::default();

        for change in changes.ordered_changes() {
            if let Err(e) = self
                .provider
                .change_records(&zone.id, std::slice::from_ref(&change))
                .await
            {
                metrics::record_provider_error("change_records", e.error_type());
                warn!(
                    zone_id = %zone.id,
                    record = %change.record().key(),
                    action = change.action(),
                    error = %e,
                    "Record change failed"
                );
                return ApplyOutcome {
                    applied,
                    error: Some(e),
                };
            }

            metrics::record_record_change(change.action());
            debug!(
                zone_id = %zone.id,
                record = %change.record().key(),
                action = change.action(),
                "Applied record change"
            );
            match change {
                RecordChange::Delete(r) => applied.deletes.push(r),
                RecordChange::Update(r) => applied.updates.push(r),
                RecordChange::Create(r) => applied.creates.push(r),
            }
        }

        ApplyOutcome {
            applied,
            error: None,
        }
    }
}

/// Sleep for `delay`; returns true if shutdown was requested first.
async fn wait_or_shutdown(delay: Duration, shutdown: &watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    let mut shutdown = shutdown.clone();
    tokio::select! {
        () = tokio::time::sleep(delay) => false,
        Ok(_) = shutdown.wait_for(|stop| *stop) => true,
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;
