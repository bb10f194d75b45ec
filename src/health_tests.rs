// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `health.rs`

#[cfg(test)]
mod tests {
    use crate::health::{
        apply_jitter, initial_probe_delay, jittered_interval, probe_url, HealthStatus,
        HealthTracker, HttpProber, ProbeResult, Prober,
    };
    use crate::registry::ProbeProtocol;
    use crate::test_support::region;
    use chrono::Utc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OK: ProbeResult = ProbeResult::Healthy;
    const FAIL: ProbeResult = ProbeResult::Failed;

    /// Drive a tracker and return the status after each probe.
    fn statuses(threshold: u32, results: &[ProbeResult]) -> Vec<HealthStatus> {
        let mut tracker = HealthTracker::new("seoul", threshold);
        results
            .iter()
            .map(|r| {
                tracker.record(*r, Utc::now());
                tracker.status()
            })
            .collect()
    }

    #[test]
    fn test_unhealthy_only_after_third_consecutive_failure() {
        use HealthStatus::{Healthy, Unhealthy, Unknown};

        let observed = statuses(3, &[OK, OK, FAIL, FAIL, FAIL]);

        // Two successes are below the threshold, so the region is still Unknown;
        // the first two failures keep it there, the third confirms Unhealthy.
        assert_eq!(observed, vec![Unknown, Unknown, Unknown, Unknown, Unhealthy]);
        assert_ne!(observed[3], Healthy);
    }

    #[test]
    fn test_unknown_needs_threshold_successes() {
        use HealthStatus::{Healthy, Unknown};

        assert_eq!(statuses(3, &[OK, OK, OK]), vec![Unknown, Unknown, Healthy]);
    }

    #[test]
    fn test_hysteresis_retains_confirmed_status() {
        use HealthStatus::Healthy;

        // Healthy, then isolated failures never reach the threshold
        let observed = statuses(3, &[OK, OK, OK, FAIL, FAIL, OK, FAIL, FAIL]);
        assert!(observed[2..].iter().all(|s| *s == Healthy));
    }

    #[test]
    fn test_recovery_requires_threshold_successes() {
        use HealthStatus::{Healthy, Unhealthy};

        let observed = statuses(2, &[FAIL, FAIL, OK, FAIL, OK, OK]);
        assert_eq!(observed[1], Unhealthy);
        assert_eq!(observed[2], Unhealthy);
        assert_eq!(observed[4], Unhealthy);
        assert_eq!(observed[5], Healthy);
    }

    #[test]
    fn test_counters_reset_on_opposite_result() {
        let mut tracker = HealthTracker::new("seoul", 3);
        tracker.record(OK, Utc::now());
        tracker.record(OK, Utc::now());
        assert_eq!(tracker.state().consecutive_successes, 2);

        tracker.record(ProbeResult::Unhealthy, Utc::now());
        assert_eq!(tracker.state().consecutive_successes, 0);
        assert_eq!(tracker.state().consecutive_failures, 1);
        assert_eq!(tracker.state().version, 3);
        assert!(tracker.state().last_probe_at.is_some());
    }

    #[test]
    fn test_transition_reported_once() {
        let mut tracker = HealthTracker::new("us-east", 1);

        let transition = tracker.record(FAIL, Utc::now()).expect("transition expected");
        assert_eq!(transition.region, "us-east");
        assert_eq!(transition.from, HealthStatus::Unknown);
        assert_eq!(transition.to, HealthStatus::Unhealthy);

        assert!(tracker.record(FAIL, Utc::now()).is_none());

        let recovered = tracker.record(OK, Utc::now()).expect("recovery expected");
        assert_eq!(recovered.from, HealthStatus::Unhealthy);
        assert_eq!(recovered.to, HealthStatus::Healthy);
    }

    #[test]
    fn test_zero_threshold_treated_as_one() {
        let mut tracker = HealthTracker::new("seoul", 0);
        assert!(tracker.record(OK, Utc::now()).is_some());
        assert_eq!(tracker.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_probe_url() {
        let mut r = region("seoul", "KR");
        assert_eq!(
            probe_url(&r).unwrap().as_str(),
            "https://seoul-alb.elb.amazonaws.com/health"
        );

        r.health_check_protocol = ProbeProtocol::Http;
        r.health_check_port = Some(8080);
        r.health_check_path = "/health?deep=1".to_string();
        assert_eq!(
            probe_url(&r).unwrap().as_str(),
            "http://seoul-alb.elb.amazonaws.com:8080/health?deep=1"
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(30);
        for _ in 0..100 {
            let interval = jittered_interval(base);
            assert!(interval >= Duration::from_secs(24));
            assert!(interval <= Duration::from_secs(36));
        }
        assert_eq!(apply_jitter(base, 0.0), base);
    }

    #[test]
    fn test_initial_probe_delay_spreads_within_interval() {
        let interval = Duration::from_secs(30);
        let delays: Vec<Duration> = (0..100).map(|_| initial_probe_delay(interval)).collect();

        assert!(delays.iter().all(|d| *d < interval));
        // 100 uniform draws landing on a single value would mean no spread at all
        assert!(delays.iter().any(|d| *d != delays[0]));
        assert_eq!(initial_probe_delay(Duration::ZERO), Duration::ZERO);
    }

    fn mock_region(server: &MockServer) -> crate::registry::Region {
        let address = server.address();
        let mut r = region("seoul", "KR");
        r.endpoint_alias = address.ip().to_string();
        r.health_check_protocol = ProbeProtocol::Http;
        r.health_check_port = Some(address.port());
        r
    }

    #[tokio::test]
    async fn test_http_probe_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"healthy"}"#))
            .mount(&server)
            .await;

        let prober = HttpProber::new(Duration::from_secs(2)).unwrap();
        let mut r = mock_region(&server);
        assert_eq!(prober.probe(&r).await, ProbeResult::Healthy);

        r.expected_body = Some("\"healthy\"".to_string());
        assert_eq!(prober.probe(&r).await, ProbeResult::Healthy);

        r.expected_body = Some("degraded".to_string());
        assert_eq!(prober.probe(&r).await, ProbeResult::Unhealthy);
    }

    #[tokio::test]
    async fn test_http_probe_non_2xx_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let prober = HttpProber::new(Duration::from_secs(2)).unwrap();
        assert_eq!(
            prober.probe(&mock_region(&server)).await,
            ProbeResult::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_http_probe_timeout_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let prober = HttpProber::new(Duration::from_millis(200)).unwrap();
        assert_eq!(
            prober.probe(&mock_region(&server)).await,
            ProbeResult::Failed
        );
    }

    #[tokio::test]
    async fn test_http_probe_unreachable_is_failure() {
        let mut r = region("seoul", "KR");
        r.endpoint_alias = "127.0.0.1".to_string();
        r.health_check_protocol = ProbeProtocol::Http;
        // Port 9 (discard) is closed on test hosts
        r.health_check_port = Some(9);

        let prober = HttpProber::new(Duration::from_secs(1)).unwrap();
        assert_eq!(prober.probe(&r).await, ProbeResult::Failed);
    }
}
