// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests.

use crate::compiler::RecordNaming;
use crate::health::{HealthCheckState, HealthStatus};
use crate::model::HostedZone;
use crate::registry::{ProbeProtocol, Region, RegionRegistry};
use std::collections::BTreeMap;

pub const DOMAIN: &str = "test.example.com";

pub fn region(name: &str, geolocation_key: &str) -> Region {
    Region {
        name: name.to_string(),
        geolocation_key: geolocation_key.to_string(),
        endpoint_alias: format!("{name}-alb.elb.amazonaws.com"),
        endpoint_zone_id: "Z35SXDOTRQ7X7K".to_string(),
        health_check_path: "/health".to_string(),
        health_check_interval_secs: 30,
        failure_threshold: 3,
        health_check_protocol: ProbeProtocol::Https,
        health_check_port: None,
        expected_body: None,
    }
}

/// seoul (primary), us-east and us-west.
pub fn three_region_registry() -> RegionRegistry {
    RegionRegistry::new(
        vec![
            region("seoul", "ap-northeast-2"),
            region("us-east", "NA/US-East"),
            region("us-west", "NA/US-West"),
        ],
        Some("seoul"),
    )
    .unwrap()
}

pub fn naming() -> RecordNaming {
    RecordNaming::www(DOMAIN)
}

pub fn zone() -> HostedZone {
    HostedZone {
        id: "Z1234567890ABC".to_string(),
        domain_name: DOMAIN.to_string(),
        managed: true,
    }
}

pub fn health_map(registry: &RegionRegistry, status: HealthStatus) -> BTreeMap<String, HealthCheckState> {
    registry
        .regions()
        .iter()
        .map(|r| {
            let mut state = HealthCheckState::new(&r.name);
            state.status = status;
            (r.name.clone(), state)
        })
        .collect()
}
