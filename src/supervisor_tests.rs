// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `supervisor.rs`

#[cfg(test)]
mod tests {
    use crate::health::{HealthStatus, ProbeResult, Prober};
    use crate::registry::Region;
    use crate::supervisor::HealthSupervisor;
    use crate::test_support::three_region_registry;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Fails every probe for the listed regions, succeeds for the rest.
    struct FailingRegions {
        failing: HashSet<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for FailingRegions {
        async fn probe(&self, region: &Region) -> ProbeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&region.name) {
                ProbeResult::Failed
            } else {
                ProbeResult::Healthy
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_region_converges_independently() {
        let registry = three_region_registry();
        let prober = Arc::new(FailingRegions {
            failing: HashSet::from(["seoul".to_string()]),
            calls: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::channel(16);

        let supervisor = HealthSupervisor::start(&registry, prober.clone(), tx);

        let mut transitions = Vec::new();
        while transitions.len() < 3 {
            let event = tokio::time::timeout(Duration::from_secs(600), rx.recv())
                .await
                .expect("transition within ten minutes")
                .expect("channel open");
            transitions.push(event);
        }

        let snapshot = supervisor.snapshot();
        assert_eq!(snapshot["seoul"].status, HealthStatus::Unhealthy);
        assert_eq!(snapshot["us-east"].status, HealthStatus::Healthy);
        assert_eq!(snapshot["us-west"].status, HealthStatus::Healthy);
        assert!(snapshot["seoul"].consecutive_failures >= 3);

        let seoul = transitions.iter().find(|t| t.region == "seoul").unwrap();
        assert_eq!(seoul.from, HealthStatus::Unknown);
        assert_eq!(seoul.to, HealthStatus::Unhealthy);

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot_is_unknown() {
        let registry = three_region_registry();
        let prober = Arc::new(FailingRegions {
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        });
        let (tx, _rx) = mpsc::channel(16);

        let supervisor = HealthSupervisor::start(&registry, prober, tx);
        let snapshot = supervisor.snapshot();

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot
            .values()
            .all(|s| s.status == HealthStatus::Unknown || s.consecutive_successes > 0));
        assert!(supervisor.subscribe("seoul").is_some());
        assert!(supervisor.subscribe("mars").is_none());

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_probing() {
        let registry = three_region_registry();
        let prober = Arc::new(FailingRegions {
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        });
        let (tx, _rx) = mpsc::channel(16);

        let supervisor = HealthSupervisor::start(&registry, prober.clone(), tx);
        tokio::time::sleep(Duration::from_secs(120)).await;
        supervisor.shutdown().await;

        let calls = prober.calls.load(Ordering::SeqCst);
        assert!(calls >= 3);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_event_channel_does_not_stop_probes() {
        let registry = three_region_registry();
        let prober = Arc::new(FailingRegions {
            failing: HashSet::from(["us-west".to_string()]),
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let supervisor = HealthSupervisor::start(&registry, prober, tx);
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(
            supervisor.snapshot()["us-west"].status,
            HealthStatus::Unhealthy
        );
        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_probes_wait_for_startup_delay() {
        let registry = three_region_registry();
        let prober = Arc::new(FailingRegions {
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        });
        let (tx, _rx) = mpsc::channel(16);

        let supervisor = HealthSupervisor::start(&registry, prober.clone(), tx);
        tokio::task::yield_now().await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);

        // Every region probes once within its 30s interval
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(prober.calls.load(Ordering::SeqCst) >= 3);

        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_through_shared_handle_halts_probes() {
        let registry = three_region_registry();
        let prober = Arc::new(FailingRegions {
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        });
        let (tx, _rx) = mpsc::channel(16);

        let supervisor = Arc::new(HealthSupervisor::start(&registry, prober.clone(), tx));
        let shared = supervisor.clone();
        tokio::time::sleep(Duration::from_secs(120)).await;

        supervisor.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let calls = prober.calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), calls);
        drop(shared);
    }
}
