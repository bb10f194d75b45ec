// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for georoute.
//!
//! This module provides specialized error types for:
//! - Configuration and region registry validation (fatal at startup)
//! - Hosted zone creation and resolution (fatal at startup)
//! - DNS provider API calls (transient or permanent)
//! - Reconciliation passes that could not fully converge
//!
//! The desired-state compiler and the diff are pure and have no error type. Probe
//! failures are recorded as health data and never surface here.

use crate::model::{join_keys, RecordKey};
use thiserror::Error;

/// Errors found while loading configuration or building the region registry.
///
/// All of these abort startup; none are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration file '{path}': {reason}")]
    Unreadable {
        /// Path that was read
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// Configuration file is not valid YAML for the expected schema
    #[error("Malformed configuration in '{path}': {reason}")]
    Malformed {
        /// Path that was parsed
        path: String,
        /// Parser message
        reason: String,
    },

    /// The registry contains no regions
    #[error("Region registry is empty; at least one region is required")]
    EmptyRegistry,

    /// Two regions share the same name
    #[error("Duplicate region name '{name}'")]
    DuplicateRegionName {
        /// The repeated region name
        name: String,
    },

    /// Two regions share the same geolocation key
    #[error("Geolocation key '{key}' is used by both '{first}' and '{second}'")]
    DuplicateGeolocationKey {
        /// The repeated key
        key: String,
        /// Region that declared the key first
        first: String,
        /// Region that declared it again
        second: String,
    },

    /// A region field fails validation
    #[error("Invalid region '{region}': {reason}")]
    InvalidRegion {
        /// Region name as written in the configuration
        region: String,
        /// What is wrong with it
        reason: String,
    },

    /// The designated primary region is not in the registry
    #[error("Primary region '{name}' is not defined in the region registry")]
    UnknownPrimaryRegion {
        /// Name given as primary
        name: String,
    },

    /// The domain name is not a valid DNS name
    #[error("Invalid domain name '{domain}': {reason}")]
    InvalidDomainName {
        /// Configured domain
        domain: String,
        /// What is wrong with it
        reason: String,
    },

    /// `create_hosted_zone` is false but no zone id was supplied
    #[error("hosted_zone_id is required when create_hosted_zone is false")]
    MissingHostedZoneId,

    /// Any other invalid setting
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Errors returned by the DNS provider API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Rate limiting or temporary server-side failure (HTTP 429, 5xx)
    #[error("Provider temporarily unavailable (HTTP {status}): {message}")]
    Transient {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// The provider rejected the request (HTTP 4xx other than 404/429)
    #[error("Provider rejected request (HTTP {status}): {message}")]
    Permanent {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// The requested resource does not exist (HTTP 404)
    #[error("Provider resource not found: {resource}")]
    NotFound {
        /// Resource that was looked up
        resource: String,
    },

    /// Connection, TLS or timeout failure before a response was received
    #[error("Provider request failed: {reason}")]
    Transport {
        /// Client error message
        reason: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode provider response: {reason}")]
    Decode {
        /// Decoder message
        reason: String,
    },
}

impl ProviderError {
    /// Returns true if the failed call may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Transport { .. })
    }

    /// Short category used as a metrics label.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::NotFound { .. } => "not_found",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
        }
    }
}

/// Errors from hosted zone creation or resolution. All are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// The provider refused to create the zone (e.g. domain already taken)
    #[error("Failed to create hosted zone for '{domain}': {source}")]
    ZoneCreation {
        /// Domain the zone was requested for
        domain: String,
        /// Provider failure
        source: ProviderError,
    },

    /// The supplied zone id does not exist
    #[error("Hosted zone '{zone_id}' not found")]
    ZoneNotFound {
        /// The id that was looked up
        zone_id: String,
    },

    /// The supplied zone id is not syntactically valid
    #[error("Invalid hosted zone id '{zone_id}': {reason}")]
    InvalidZoneId {
        /// The id as supplied
        zone_id: String,
        /// What is wrong with it
        reason: String,
    },

    /// The resolved zone serves a different domain than configured
    #[error("Hosted zone '{zone_id}' serves '{actual}', expected '{expected}'")]
    DomainMismatch {
        /// Zone id
        zone_id: String,
        /// Configured domain
        expected: String,
        /// Domain reported by the provider
        actual: String,
    },

    /// Looking up the zone failed for a reason other than absence
    #[error("Failed to look up hosted zone '{zone_id}': {source}")]
    Lookup {
        /// Zone id
        zone_id: String,
        /// Provider failure
        source: ProviderError,
    },

    /// Registering the provider-side health check for a region failed
    #[error("Failed to register health check for region '{region}': {source}")]
    HealthCheckSetup {
        /// Region the health check belongs to
        region: String,
        /// Provider failure
        source: ProviderError,
    },
}

/// Errors from a reconciliation pass.
///
/// A failed pass leaves the previously published outputs in place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Retries were exhausted (or a permanent error hit) with records still divergent
    #[error(
        "Failed to converge {} record(s) after {attempts} attempt(s) [{}]: {source}",
        .unresolved.len(),
        join_keys(.unresolved)
    )]
    PartialConvergence {
        /// Records whose provider state still differs from the desired state
        unresolved: Vec<RecordKey>,
        /// Number of apply attempts made
        attempts: u32,
        /// The last provider error observed
        source: ProviderError,
    },

    /// Reading the zone's records failed, so no changes were attempted
    #[error("Failed to {operation} for zone '{zone_id}': {source}")]
    Provider {
        /// Provider call that failed
        operation: String,
        /// Zone being reconciled
        zone_id: String,
        /// Provider failure
        source: ProviderError,
    },

    /// Shutdown was requested between batches
    #[error("Reconciliation cancelled with {} record(s) unresolved", .unresolved.len())]
    Cancelled {
        /// Records still divergent when the pass stopped
        unresolved: Vec<RecordKey>,
    },
}

impl ReconcileError {
    /// Records the failed pass left divergent; empty when the actual state was never read.
    #[must_use]
    pub fn unresolved(&self) -> &[RecordKey] {
        match self {
            Self::PartialConvergence { unresolved, .. } | Self::Cancelled { unresolved } => {
                unresolved
            }
            Self::Provider { .. } => &[],
        }
    }

    /// Short category used as a metrics label.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::PartialConvergence { .. } => "partial_convergence",
            Self::Provider { .. } => "provider_error",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
