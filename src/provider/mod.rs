// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider interface.
//!
//! The provider is the only source of truth for the actual record set. Two
//! implementations are provided:
//!
//! - [`HttpDnsProvider`] - REST/JSON provider API over `reqwest`
//! - [`MemoryProvider`] - in-process provider with failure injection, for tests and
//!   dry runs
//!
//! Implementations do not retry; retry policy belongs to the caller (see
//! [`crate::reconcilers::retry`]).

pub mod http;
pub mod memory;

pub use http::HttpDnsProvider;
pub use memory::MemoryProvider;

use crate::dns_errors::ProviderError;
use crate::model::{HealthCheck, HealthCheckSpec, HostedZone, RecordChange, RoutingRecord};
use async_trait::async_trait;

/// Operations the controller needs from a DNS provider.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create a hosted zone. Not idempotent: a second call may create a second zone.
    async fn create_hosted_zone(
        &self,
        domain: &str,
        caller_reference: &str,
    ) -> Result<HostedZone, ProviderError>;

    /// Look up a hosted zone by id; [`ProviderError::NotFound`] if it does not exist.
    async fn get_hosted_zone(&self, zone_id: &str) -> Result<HostedZone, ProviderError>;

    /// All routing records currently in the zone.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<RoutingRecord>, ProviderError>;

    /// Submit one batch of changes.
    ///
    /// When [`supports_atomic_batches`](Self::supports_atomic_batches) is true the batch is
    /// applied entirely or not at all. Otherwise changes are applied in order and a failure
    /// leaves earlier changes applied.
    async fn change_records(
        &self,
        zone_id: &str,
        changes: &[RecordChange],
    ) -> Result<(), ProviderError>;

    /// Register a health check.
    async fn create_health_check(&self, spec: &HealthCheckSpec)
        -> Result<HealthCheck, ProviderError>;

    /// Look up a health check by caller reference.
    async fn get_health_check(&self, reference: &str)
        -> Result<Option<HealthCheck>, ProviderError>;

    /// Whether [`change_records`](Self::change_records) is transactional.
    fn supports_atomic_batches(&self) -> bool;
}
