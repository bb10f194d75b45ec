// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # georoute - Geolocation DNS Failover Controller
//!
//! georoute keeps a hosted DNS zone's geolocation routing records in line with a
//! static registry of serving regions and their observed health.
//!
//! ## Overview
//!
//! - One geolocation record per region (`<region>.<domain>`), gated by a health check
//! - One default record for requesters matching no region, aliasing a fallback target or
//!   the primary region
//! - Continuous health probing with debounced, hysteretic status transitions
//! - Idempotent reconciliation with retries, partial-failure recovery and verification
//!
//! ## Modules
//!
//! - [`registry`] - Region definitions and validation
//! - [`health`] / [`supervisor`] - Health state machine and per-region probe tasks
//! - [`compiler`] - Pure compilation of the desired record set
//! - [`reconcilers`] - Diff, apply and retry against the provider
//! - [`provider`] - DNS provider interface and implementations
//! - [`zone`] - Hosted zone creation and resolution
//! - [`outputs`] - Published zone id and record names
//! - [`controller`] - The reconciliation loop
//! - [`config`] - Configuration file loading
//! - [`server`] - Metrics, outputs and liveness endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use georoute::compiler::{compile, RecordNaming};
//! use georoute::registry::{ProbeProtocol, Region, RegionRegistry};
//! use std::collections::BTreeMap;
//!
//! let seoul = Region {
//!     name: "seoul".to_string(),
//!     geolocation_key: "ap-northeast-2".to_string(),
//!     endpoint_alias: "seoul-alb.elb.amazonaws.com".to_string(),
//!     endpoint_zone_id: "ZWKZPGTI48KDX".to_string(),
//!     health_check_path: "/health".to_string(),
//!     health_check_interval_secs: 30,
//!     failure_threshold: 3,
//!     health_check_protocol: ProbeProtocol::Https,
//!     health_check_port: None,
//!     expected_body: None,
//! };
//! let registry = RegionRegistry::new(vec![seoul], None).unwrap();
//!
//! let desired = compile(
//!     &registry,
//!     &BTreeMap::new(),
//!     &RecordNaming::www("shop.example.com"),
//!     None,
//! );
//! assert_eq!(desired.len(), 2);
//! ```

pub mod compiler;
pub mod config;
pub mod constants;
pub mod controller;
pub mod dns_errors;
pub mod health;
pub mod metrics;
pub mod model;
pub mod outputs;
pub mod provider;
pub mod reconcilers;
pub mod registry;
pub mod server;
pub mod supervisor;
pub mod zone;

#[cfg(test)]
mod test_support;
