// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common fixtures for integration tests

use georoute::config::{Config, Settings};
use georoute::controller::HealthView;
use georoute::health::{HealthCheckState, HealthStatus};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const DOMAIN: &str = "test.example.com";

/// Three regions, zone created by the controller, no fallback.
pub const CONFIG: &str = r"
project_name: shop
domain_name: test.example.com
create_hosted_zone: true
primary_region: seoul
regions:
  - name: seoul
    geolocation_key: ap-northeast-2
    alias_dns_name: seoul-alb.elb.amazonaws.com
    alias_zone_id: ZWKZPGTI48KDX
  - name: us-east
    geolocation_key: NA/US-East
    alias_dns_name: use1-alb.elb.amazonaws.com
    alias_zone_id: Z35SXDOTRQ7X7K
  - name: us-west
    geolocation_key: NA/US-West
    alias_dns_name: usw2-alb.elb.amazonaws.com
    alias_zone_id: Z1H1FL5HABSF5
";

pub fn settings(text: &str) -> Settings {
    Config::from_yaml("integration.yaml", text)
        .expect("config parses")
        .into_settings()
        .expect("config is valid")
}

/// Health snapshots set directly by the test instead of by probe tasks.
#[derive(Default)]
pub struct ScriptedHealth {
    states: Mutex<BTreeMap<String, HealthCheckState>>,
}

impl ScriptedHealth {
    pub fn all(regions: &[&str], status: HealthStatus) -> Self {
        let health = Self::default();
        for region in regions {
            health.set(region, status);
        }
        health
    }

    pub fn set(&self, region: &str, status: HealthStatus) {
        let mut state = HealthCheckState::new(region);
        state.status = status;
        state.version = 1;
        self.states
            .lock()
            .unwrap()
            .insert(region.to_string(), state);
    }
}

impl HealthView for ScriptedHealth {
    fn snapshot(&self) -> BTreeMap<String, HealthCheckState> {
        self.states.lock().unwrap().clone()
    }
}
