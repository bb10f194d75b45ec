// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Static description of the serving regions.
//!
//! The registry is built once from configuration and never changes afterwards. Region
//! names become DNS labels (`<name>.<domain>`), so they are validated as such. The
//! geolocation key is treated as an opaque string: the only rule is that no two regions
//! may share one.

use crate::constants::MAX_DNS_LABEL_LEN;
use crate::dns_errors::ConfigError;
use crate::model::HealthCheckSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Protocol used to probe a region's endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeProtocol {
    Http,
    #[default]
    Https,
}

impl ProbeProtocol {
    #[must_use]
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for ProbeProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// One serving location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Short name, used as the record label (e.g. `seoul`, `us-east`)
    pub name: String,
    /// Opaque geolocation key, unique across the registry
    pub geolocation_key: String,
    /// DNS name of the regional endpoint (load balancer)
    pub endpoint_alias: String,
    /// Zone identifier of the regional endpoint
    pub endpoint_zone_id: String,
    pub health_check_path: String,
    pub health_check_interval_secs: u64,
    /// Consecutive probe results needed to confirm a status change
    pub failure_threshold: u32,
    pub health_check_protocol: ProbeProtocol,
    pub health_check_port: Option<u16>,
    /// Substring the probe response body must contain, if set
    pub expected_body: Option<String>,
}

impl Region {
    /// Fully qualified name of this region's record under `domain`.
    #[must_use]
    pub fn fqdn(&self, domain: &str) -> String {
        format!("{}.{}", self.name, domain.trim_end_matches('.'))
    }

    /// Reference naming this region's health check, both locally and at the provider.
    #[must_use]
    pub fn health_check_ref(&self) -> String {
        self.name.clone()
    }

    #[must_use]
    pub fn probe_port(&self) -> u16 {
        self.health_check_port
            .unwrap_or_else(|| self.health_check_protocol.default_port())
    }

    /// Provider-side health check definition for this region.
    #[must_use]
    pub fn health_check_spec(&self) -> HealthCheckSpec {
        HealthCheckSpec {
            reference: self.health_check_ref(),
            fqdn: self.endpoint_alias.clone(),
            protocol: self.health_check_protocol.scheme().to_uppercase(),
            port: self.probe_port(),
            path: self.health_check_path.clone(),
            interval_secs: self.health_check_interval_secs,
            failure_threshold: self.failure_threshold,
            expected_body: self.expected_body.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRegion {
            region: self.name.clone(),
            reason: reason.to_string(),
        };

        validate_dns_label(&self.name).map_err(|reason| invalid(&reason))?;

        if self.geolocation_key.trim().is_empty() {
            return Err(invalid("geolocation key must not be empty"));
        }
        validate_dns_name(&self.endpoint_alias)
            .map_err(|reason| invalid(&format!("endpoint alias: {reason}")))?;
        if self.endpoint_zone_id.trim().is_empty() {
            return Err(invalid("endpoint zone id must not be empty"));
        }
        if !self.health_check_path.starts_with('/') {
            return Err(invalid("health check path must start with '/'"));
        }
        if self.health_check_interval_secs == 0 {
            return Err(invalid("health check interval must be at least 1 second"));
        }
        if self.failure_threshold == 0 {
            return Err(invalid("failure threshold must be at least 1"));
        }
        Ok(())
    }
}

/// Validated, immutable set of regions plus the designated primary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRegistry {
    regions: Vec<Region>,
    primary: usize,
}

impl RegionRegistry {
    /// Build a registry, validating every region.
    ///
    /// `primary` names the region the default record falls back to when no fallback
    /// target is configured; it defaults to the first region.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the registry is empty, a region is invalid, a name or
    /// geolocation key is repeated, or the primary region is unknown.
    pub fn new(regions: Vec<Region>, primary: Option<&str>) -> Result<Self, ConfigError> {
        if regions.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        let mut names: HashMap<&str, ()> = HashMap::new();
        let mut geo_keys: HashMap<&str, &str> = HashMap::new();

        for region in &regions {
            region.validate()?;

            if names.insert(region.name.as_str(), ()).is_some() {
                return Err(ConfigError::DuplicateRegionName {
                    name: region.name.clone(),
                });
            }
            if let Some(first) = geo_keys.insert(region.geolocation_key.as_str(), &region.name) {
                return Err(ConfigError::DuplicateGeolocationKey {
                    key: region.geolocation_key.clone(),
                    first: first.to_string(),
                    second: region.name.clone(),
                });
            }
        }

        let primary = match primary {
            Some(name) => regions.iter().position(|r| r.name == name).ok_or_else(|| {
                ConfigError::UnknownPrimaryRegion {
                    name: name.to_string(),
                }
            })?,
            None => 0,
        };

        Ok(Self { regions, primary })
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn primary(&self) -> &Region {
        &self.regions[self.primary]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Validate a single DNS label (letters, digits and hyphens, not at either end).
///
/// # Errors
///
/// Returns a human-readable reason when the label is invalid.
pub fn validate_dns_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("label must not be empty".to_string());
    }
    if label.len() > MAX_DNS_LABEL_LEN {
        return Err(format!(
            "label '{label}' exceeds {MAX_DNS_LABEL_LEN} characters"
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!("label '{label}' must not start or end with '-'"));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "label '{label}' may only contain lowercase letters, digits and '-'"
        ));
    }
    Ok(())
}

/// Validate a dotted DNS name; a single trailing dot is accepted.
///
/// # Errors
///
/// Returns a human-readable reason when any label is invalid.
pub fn validate_dns_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() {
        return Err("name must not be empty".to_string());
    }
    trimmed
        .split('.')
        .try_for_each(|label| validate_dns_label(&label.to_ascii_lowercase()))
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
