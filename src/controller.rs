// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller loop.
//!
//! The single consumer of health transition events. It runs a reconciliation pass:
//!
//! - once at startup,
//! - every `interval`,
//! - after a health transition, once the debounce window has passed. Events arriving
//!   within the window are coalesced into the same pass.
//!
//! Passes run inline in the loop, so two passes never overlap. A failed pass leaves the
//! published outputs untouched and the next trigger tries again.

use crate::compiler::{compile, summarize, FallbackTarget, RecordNaming};
use crate::dns_errors::ReconcileError;
use crate::health::{HealthCheckState, HealthTransition};
use crate::metrics;
use crate::model::HostedZone;
use crate::outputs::OutputPublisher;
use crate::reconcilers::{ReconcileResult, Reconciler};
use crate::registry::RegionRegistry;
use crate::supervisor::HealthSupervisor;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Source of health snapshots for compilation.
pub trait HealthView: Send + Sync {
    fn snapshot(&self) -> BTreeMap<String, HealthCheckState>;
}

impl HealthView for HealthSupervisor {
    fn snapshot(&self) -> BTreeMap<String, HealthCheckState> {
        HealthSupervisor::snapshot(self)
    }
}

/// What started a reconciliation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Interval,
    HealthEvent,
}

impl Trigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Interval => "interval",
            Self::HealthEvent => "health_event",
        }
    }
}

/// Loop timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerSettings {
    pub interval: Duration,
    pub debounce: Duration,
}

/// Everything a pass needs, owned by the loop.
pub struct Controller {
    zone: HostedZone,
    registry: Arc<RegionRegistry>,
    naming: RecordNaming,
    fallback: Option<FallbackTarget>,
    health: Arc<dyn HealthView>,
    reconciler: Reconciler,
    publisher: Arc<OutputPublisher>,
    settings: ControllerSettings,
}

impl Controller {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        zone: HostedZone,
        registry: Arc<RegionRegistry>,
        naming: RecordNaming,
        fallback: Option<FallbackTarget>,
        health: Arc<dyn HealthView>,
        reconciler: Reconciler,
        publisher: Arc<OutputPublisher>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            zone,
            registry,
            naming,
            fallback,
            health,
            reconciler,
            publisher,
            settings,
        }
    }

    /// Run until `shutdown` turns true.
    ///
    /// Shutdown requested during a pass is observed by the reconciler between batches;
    /// the loop exits once that pass returns.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<HealthTransition>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let period = self.settings.interval;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut events_open = true;
        let mut trigger = Some(Trigger::Startup);

        info!(
            zone_id = %self.zone.id,
            interval = ?period,
            debounce = ?self.settings.debounce,
            "Controller started"
        );

        loop {
            if let Some(reason) = trigger.take() {
                // Outcome is logged and recorded in metrics by the pass itself
                let _ = self.reconcile_once(reason, &shutdown).await;
            }
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => trigger = Some(Trigger::Interval),
                event = events.recv(), if events_open => match event {
                    Some(first) => {
                        let coalesced = self.debounce(first, &mut events, &mut shutdown).await;
                        debug!(events = coalesced, "Health events coalesced into one pass");
                        trigger = Some(Trigger::HealthEvent);
                    }
                    None => {
                        warn!("Health event channel closed; reconciling on interval only");
                        events_open = false;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(zone_id = %self.zone.id, "Controller stopped");
    }

    /// Wait out the debounce window, absorbing further events. Returns how many events
    /// the pass covers.
    async fn debounce(
        &self,
        first: HealthTransition,
        events: &mut mpsc::Receiver<HealthTransition>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> usize {
        info!(
            region = %first.region,
            from = %first.from,
            to = %first.to,
            "Health transition received"
        );

        let window = tokio::time::sleep(self.settings.debounce);
        tokio::pin!(window);
        let mut count = 1;

        loop {
            tokio::select! {
                () = &mut window => break,
                Some(next) = events.recv() => {
                    debug!(region = %next.region, to = %next.to, "Health transition coalesced");
                    count += 1;
                }
                Ok(()) = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        count
    }

    /// Compile the desired state from current health, reconcile and publish.
    ///
    /// # Errors
    ///
    /// Returns the reconciler's error; outputs are left unchanged in that case.
    pub async fn reconcile_once(
        &self,
        trigger: Trigger,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<ReconcileResult, ReconcileError> {
        metrics::record_reconciliation_trigger(trigger.as_str());
        let start = Instant::now();

        let health = self.health.snapshot();
        let summary = summarize(&self.registry, &health);
        let desired = compile(&self.registry, &health, &self.naming, self.fallback.as_ref());

        info!(
            trigger = trigger.as_str(),
            records = desired.len(),
            healthy = summary.healthy,
            unhealthy = summary.unhealthy,
            unknown = summary.unknown,
            fingerprint = %desired.fingerprint(),
            "Starting reconciliation pass"
        );

        match self.reconciler.reconcile(&self.zone, &desired, shutdown).await {
            Ok(result) => {
                let published = self.publisher.publish(&self.zone, &desired, &result).await;
                if result.converged {
                    metrics::record_reconciliation_success(start.elapsed());
                } else {
                    metrics::record_reconciliation_error("divergent", start.elapsed());
                    warn!(
                        zone_id = %self.zone.id,
                        attempts = result.attempts,
                        "Reconciliation pass ended without convergence"
                    );
                }
                debug!(
                    applied = result.applied.len(),
                    attempts = result.attempts,
                    published,
                    duration = ?start.elapsed(),
                    "Reconciliation pass finished"
                );
                Ok(result)
            }
            Err(e) => {
                metrics::record_reconciliation_error(e.error_type(), start.elapsed());
                match &e {
                    ReconcileError::Cancelled { .. } => {
                        warn!(unresolved = e.unresolved().len(), "Reconciliation pass cancelled");
                    }
                    _ => error!(error = %e, "Reconciliation pass failed"),
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
