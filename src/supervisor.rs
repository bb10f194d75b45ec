// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health Probe Supervisor: one independent probe task per region.
//!
//! Each task owns its region's [`HealthTracker`] and is the only writer of that region's
//! state. Readers get immutable snapshots through a per-region `watch` channel, so the
//! compiler never observes a half-updated state and no lock is shared between regions.
//!
//! Confirmed transitions are pushed to the controller with `try_send`. When the channel
//! is full a reconciliation is already pending, and that pass reads fresh snapshots, so
//! dropping the event loses nothing.

use crate::health::{
    initial_probe_delay, jittered_interval, HealthCheckState, HealthTracker, HealthTransition,
    Prober,
};
use crate::metrics;
use crate::registry::{Region, RegionRegistry};
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owns the probe tasks of every region.
pub struct HealthSupervisor {
    snapshots: BTreeMap<String, watch::Receiver<HealthCheckState>>,
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl HealthSupervisor {
    /// Spawn one probe task per region.
    ///
    /// Transitions are delivered on `events`; a closed receiver is tolerated.
    #[must_use]
    pub fn start(
        registry: &RegionRegistry,
        prober: Arc<dyn Prober>,
        events: mpsc::Sender<HealthTransition>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut snapshots = BTreeMap::new();
        let mut handles = Vec::with_capacity(registry.len());

        for region in registry.regions() {
            let (state_tx, state_rx) = watch::channel(HealthCheckState::new(&region.name));
            snapshots.insert(region.name.clone(), state_rx);
            metrics::set_region_health(&region.name, crate::health::HealthStatus::Unknown);

            let handle = tokio::spawn(run_probe_loop(
                region.clone(),
                prober.clone(),
                state_tx,
                events.clone(),
                shutdown_rx.clone(),
            ));
            handles.push(handle);

            info!(
                region = %region.name,
                endpoint = %region.endpoint_alias,
                path = %region.health_check_path,
                interval_secs = region.health_check_interval_secs,
                threshold = region.failure_threshold,
                "health probe started"
            );
        }

        Self {
            snapshots,
            handles,
            shutdown_tx,
        }
    }

    /// Immutable copy of every region's current health.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, HealthCheckState> {
        self.snapshots
            .iter()
            .map(|(name, rx)| (name.clone(), rx.borrow().clone()))
            .collect()
    }

    /// Watch a single region's health.
    #[must_use]
    pub fn subscribe(&self, region: &str) -> Option<watch::Receiver<HealthCheckState>> {
        self.snapshots.get(region).cloned()
    }

    /// Signal every probe task to stop without waiting for them.
    ///
    /// Usable while the supervisor is still shared; in-flight probes are abandoned.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Stop every probe task and wait for them to exit.
    pub async fn shutdown(self) {
        self.stop();
        let stopped = join_all(self.handles).await;
        let panicked = stopped.iter().filter(|r| r.is_err()).count();
        if panicked > 0 {
            warn!(panicked, "health probe tasks ended abnormally");
        }
        info!("all health probes stopped");
    }
}

async fn run_probe_loop(
    region: Region,
    prober: Arc<dyn Prober>,
    state_tx: watch::Sender<HealthCheckState>,
    events: mpsc::Sender<HealthTransition>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tracker = HealthTracker::new(&region.name, region.failure_threshold);
    let interval = Duration::from_secs(region.health_check_interval_secs);

    tokio::select! {
        () = tokio::time::sleep(initial_probe_delay(interval)) => {}
        _ = shutdown_rx.wait_for(|stop| *stop) => {
            debug!(region = %region.name, "health probe loop exited before first probe");
            return;
        }
    }

    loop {
        let result = tokio::select! {
            result = prober.probe(&region) => result,
            _ = shutdown_rx.changed() => break,
        };

        metrics::record_probe(&region.name, result);
        debug!(region = %region.name, result = result.as_str(), "health probe completed");

        if let Some(transition) = tracker.record(result, Utc::now()) {
            metrics::record_health_transition(&region.name, transition.to);
            if let Err(e) = events.try_send(transition) {
                debug!(region = %region.name, error = %e, "health event not queued");
            }
        }
        state_tx.send_replace(tracker.state().clone());

        tokio::select! {
            () = tokio::time::sleep(jittered_interval(interval)) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    debug!(region = %region.name, "health probe loop exited");
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod supervisor_tests;
