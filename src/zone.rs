// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosted zone resolution and provider-side health check setup.
//!
//! Both run once at startup and every failure is fatal. A zone is created at most once
//! per process; an externally supplied zone id is validated, looked up and checked
//! against the configured domain.

use crate::constants::{HOSTED_ZONE_ID_PREFIX, MAX_ZONE_ID_LEN};
use crate::dns_errors::{ProviderError, ZoneError};
use crate::model::{HealthCheck, HostedZone};
use crate::provider::DnsProvider;
use crate::reconcilers::retry::retry_provider_call;
use crate::registry::RegionRegistry;
use tracing::{info, warn};

/// Where the hosted zone comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZoneSource {
    /// Create a new zone; the caller reference is derived from the project name.
    Create { project_name: String },
    /// Use an existing zone.
    Existing { zone_id: String },
}

/// Inputs to [`resolve_hosted_zone`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneSettings {
    pub domain_name: String,
    pub source: ZoneSource,
    /// Attempt budget for retryable lookups
    pub max_attempts: u32,
}

/// Caller reference sent with zone creation: `<project>-<domain>`.
#[must_use]
pub fn caller_reference(project_name: &str, domain_name: &str) -> String {
    format!(
        "{}-{}",
        project_name.trim(),
        normalize_domain(domain_name)
    )
}

/// Check the syntax of a hosted zone id and return it without the `/hostedzone/` prefix.
///
/// # Errors
///
/// Returns [`ZoneError::InvalidZoneId`] if the id is empty, too long or contains
/// anything other than upper-case letters and digits.
pub fn validate_zone_id(raw: &str) -> Result<String, ZoneError> {
    let invalid = |reason: &str| ZoneError::InvalidZoneId {
        zone_id: raw.to_string(),
        reason: reason.to_string(),
    };

    let id = raw.trim();
    let id = id.strip_prefix(HOSTED_ZONE_ID_PREFIX).unwrap_or(id);

    if id.is_empty() {
        return Err(invalid("zone id is empty"));
    }
    if id.len() > MAX_ZONE_ID_LEN {
        return Err(invalid(&format!(
            "zone id exceeds {MAX_ZONE_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(invalid("zone id must contain only upper-case letters and digits"));
    }

    Ok(id.to_string())
}

/// Create or look up the hosted zone.
///
/// # Errors
///
/// - [`ZoneError::ZoneCreation`] if the provider rejects creation (not retried)
/// - [`ZoneError::InvalidZoneId`] / [`ZoneError::ZoneNotFound`] for a bad existing id
/// - [`ZoneError::DomainMismatch`] if the zone serves another domain
/// - [`ZoneError::Lookup`] if the lookup fails after retries
pub async fn resolve_hosted_zone(
    provider: &dyn DnsProvider,
    settings: &ZoneSettings,
) -> Result<HostedZone, ZoneError> {
    let domain = normalize_domain(&settings.domain_name);

    match &settings.source {
        ZoneSource::Create { project_name } => {
            let reference = caller_reference(project_name, &domain);
            let zone = provider
                .create_hosted_zone(&domain, &reference)
                .await
                .map_err(|source| ZoneError::ZoneCreation {
                    domain: domain.clone(),
                    source,
                })?;

            info!(zone_id = %zone.id, domain = %domain, "Created hosted zone");
            Ok(HostedZone {
                managed: true,
                ..zone
            })
        }
        ZoneSource::Existing { zone_id } => {
            let zone_id = validate_zone_id(zone_id)?;
            let zone = retry_provider_call(
                || provider.get_hosted_zone(&zone_id),
                "get_hosted_zone",
                settings.max_attempts,
            )
            .await
            .map_err(|source| match source {
                ProviderError::NotFound { .. } => ZoneError::ZoneNotFound {
                    zone_id: zone_id.clone(),
                },
                source => ZoneError::Lookup {
                    zone_id: zone_id.clone(),
                    source,
                },
            })?;

            let actual = normalize_domain(&zone.domain_name);
            if actual != domain {
                return Err(ZoneError::DomainMismatch {
                    zone_id,
                    expected: domain,
                    actual,
                });
            }

            info!(zone_id = %zone_id, domain = %domain, "Resolved existing hosted zone");
            Ok(HostedZone {
                id: zone_id,
                domain_name: actual,
                managed: false,
            })
        }
    }
}

/// Make sure a provider-side health check exists for every region.
///
/// Checks are looked up by reference and created only when missing, so calling this
/// again is a no-op.
///
/// # Errors
///
/// Returns [`ZoneError::HealthCheckSetup`] naming the first region whose check could
/// not be looked up or created.
pub async fn ensure_health_checks(
    provider: &dyn DnsProvider,
    registry: &RegionRegistry,
    max_attempts: u32,
) -> Result<Vec<HealthCheck>, ZoneError> {
    let mut checks = Vec::with_capacity(registry.len());

    for region in registry.regions() {
        let spec = region.health_check_spec();
        let setup_error = |source| ZoneError::HealthCheckSetup {
            region: region.name.clone(),
            source,
        };

        let existing = retry_provider_call(
            || provider.get_health_check(&spec.reference),
            "get_health_check",
            max_attempts,
        )
        .await
        .map_err(setup_error)?;

        let check = match existing {
            Some(check) => {
                if check.spec != spec {
                    warn!(
                        region = %region.name,
                        health_check_id = %check.id,
                        "Existing health check differs from configuration; keeping it"
                    );
                }
                check
            }
            None => {
                let check = retry_provider_call(
                    || provider.create_health_check(&spec),
                    "create_health_check",
                    max_attempts,
                )
                .await
                .map_err(setup_error)?;
                info!(
                    region = %region.name,
                    health_check_id = %check.id,
                    endpoint = %spec.fqdn,
                    "Created health check"
                );
                check
            }
        };
        checks.push(check);
    }

    Ok(checks)
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
