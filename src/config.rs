// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration file loading and validation.
//!
//! The file is YAML. [`Config`] mirrors it field for field; [`Config::into_settings`]
//! validates it into the typed [`Settings`] the rest of the controller runs on.
//!
//! # Example
//!
//! ```yaml
//! project_name: shop
//! domain_name: shop.example.com
//! create_hosted_zone: true
//! fallback:
//!   domain_name: d123456.cloudfront.net
//!   zone_id: Z2FDTNDATAQYW2
//! primary_region: seoul
//! regions:
//!   - name: seoul
//!     geolocation_key: ap-northeast-2
//!     alias_dns_name: seoul-alb.elb.amazonaws.com
//!     alias_zone_id: ZWKZPGTI48KDX
//!   - name: us-east
//!     geolocation_key: NA/US-East
//!     alias_dns_name: use1-alb.elb.amazonaws.com
//!     alias_zone_id: Z35SXDOTRQ7X7K
//!     health_check_path: /ready
//! provider:
//!   endpoint: https://dns-api.internal
//!   atomic_batches: true
//! ```

use crate::compiler::{DefaultRecordName, FallbackTarget, RecordNaming};
use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_DEBOUNCE_MILLIS, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS, DEFAULT_HEALTH_CHECK_PATH, DEFAULT_MAX_APPLY_ATTEMPTS,
    DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_RECONCILE_INTERVAL_SECS, DEFAULT_SERVER_BIND_ADDRESS,
    PROVIDER_TOKEN_ENV,
};
use crate::controller::ControllerSettings;
use crate::dns_errors::ConfigError;
use crate::registry::{validate_dns_name, ProbeProtocol, Region, RegionRegistry};
use crate::zone::{ZoneSettings, ZoneSource};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

fn default_bind_address() -> String {
    DEFAULT_SERVER_BIND_ADDRESS.to_string()
}

fn default_true() -> bool {
    true
}

/// Raw configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub project_name: String,
    pub domain_name: String,
    #[serde(default)]
    pub create_hosted_zone: bool,
    #[serde(default)]
    pub hosted_zone_id: Option<String>,
    #[serde(default)]
    pub default_record: DefaultRecordName,
    #[serde(default)]
    pub fallback: Option<FallbackConfig>,
    #[serde(default)]
    pub primary_region: Option<String>,
    #[serde(default)]
    pub health_check: HealthCheckDefaults,
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub outputs_file: Option<PathBuf>,
    #[serde(default = "default_bind_address")]
    pub metrics_bind_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    pub domain_name: String,
    pub zone_id: String,
}

/// Probe settings applied to every region unless overridden.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckDefaults {
    pub path: String,
    pub interval_secs: u64,
    pub failure_threshold: u32,
    pub timeout_secs: u64,
    pub protocol: ProbeProtocol,
    pub expected_body: Option<String>,
}

impl Default for HealthCheckDefaults {
    fn default() -> Self {
        Self {
            path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
            interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            protocol: ProbeProtocol::default(),
            expected_body: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub name: String,
    pub geolocation_key: String,
    pub alias_dns_name: String,
    pub alias_zone_id: String,
    #[serde(default)]
    pub health_check_path: Option<String>,
    #[serde(default)]
    pub health_check_interval_secs: Option<u64>,
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub health_check_protocol: Option<ProbeProtocol>,
    #[serde(default)]
    pub health_check_port: Option<u16>,
    #[serde(default)]
    pub expected_body: Option<String>,
}

impl RegionConfig {
    fn into_region(self, defaults: &HealthCheckDefaults) -> Region {
        Region {
            name: self.name,
            geolocation_key: self.geolocation_key,
            endpoint_alias: self.alias_dns_name,
            endpoint_zone_id: self.alias_zone_id,
            health_check_path: self
                .health_check_path
                .unwrap_or_else(|| defaults.path.clone()),
            health_check_interval_secs: self
                .health_check_interval_secs
                .unwrap_or(defaults.interval_secs),
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            health_check_protocol: self.health_check_protocol.unwrap_or(defaults.protocol),
            health_check_port: self.health_check_port,
            expected_body: self.expected_body.or_else(|| defaults.expected_body.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub interval_secs: u64,
    pub debounce_millis: u64,
    pub max_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            debounce_millis: DEFAULT_DEBOUNCE_MILLIS,
            max_attempts: DEFAULT_MAX_APPLY_ATTEMPTS,
        }
    }
}

/// DNS provider connection. Without an endpoint the in-memory provider is used.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default = "default_true")]
    pub atomic_batches: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            atomic_batches: true,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("atomic_batches", &self.atomic_batches)
            .finish()
    }
}

/// Validated settings.
#[derive(Debug)]
pub struct Settings {
    pub registry: RegionRegistry,
    pub naming: RecordNaming,
    pub fallback: Option<FallbackTarget>,
    pub zone: ZoneSettings,
    pub probe_timeout: Duration,
    pub controller: ControllerSettings,
    pub max_attempts: u32,
    pub provider: ProviderConfig,
    pub outputs_file: Option<PathBuf>,
    pub bind_address: SocketAddr,
}

impl Config {
    /// Parse YAML text. `source` names the origin in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] if the text does not match the schema.
    pub fn from_yaml(source: &str, text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Malformed {
            path: source.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the provider token when `token` is set and non-empty.
    #[must_use]
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.provider.token = Some(token);
        }
        self
    }

    /// Validate into [`Settings`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let domain = self.domain_name.trim().trim_end_matches('.').to_ascii_lowercase();
        validate_dns_name(&domain).map_err(|reason| ConfigError::InvalidDomainName {
            domain: self.domain_name.clone(),
            reason,
        })?;

        if self.project_name.trim().is_empty() {
            return Err(invalid("project_name", "must not be empty"));
        }

        let source = if self.create_hosted_zone {
            ZoneSource::Create {
                project_name: self.project_name.trim().to_string(),
            }
        } else {
            let zone_id = self
                .hosted_zone_id
                .filter(|id| !id.trim().is_empty())
                .ok_or(ConfigError::MissingHostedZoneId)?;
            ZoneSource::Existing { zone_id }
        };

        let fallback = match self.fallback {
            Some(fallback) => {
                validate_dns_name(&fallback.domain_name)
                    .map_err(|reason| invalid("fallback.domain_name", &reason))?;
                if fallback.zone_id.trim().is_empty() {
                    return Err(invalid("fallback.zone_id", "must not be empty"));
                }
                Some(FallbackTarget {
                    domain_name: fallback.domain_name,
                    zone_id: fallback.zone_id,
                })
            }
            None => None,
        };

        let defaults = &self.health_check;
        if defaults.timeout_secs == 0 {
            return Err(invalid("health_check.timeout_secs", "must be greater than 0"));
        }

        let regions: Vec<Region> = self
            .regions
            .into_iter()
            .map(|r| r.into_region(defaults))
            .collect();
        let registry = RegionRegistry::new(regions, self.primary_region.as_deref())?;

        let reconcile = &self.reconcile;
        if reconcile.interval_secs == 0 {
            return Err(invalid("reconcile.interval_secs", "must be greater than 0"));
        }
        if reconcile.max_attempts == 0 {
            return Err(invalid("reconcile.max_attempts", "must be at least 1"));
        }

        if let Some(endpoint) = &self.provider.endpoint {
            if endpoint.trim().is_empty() {
                return Err(invalid("provider.endpoint", "must not be empty when set"));
            }
        }

        let bind_address: SocketAddr = self
            .metrics_bind_address
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("metrics_bind_address", &e.to_string()))?;

        debug!(
            domain = %domain,
            regions = registry.len(),
            primary = %registry.primary().name,
            "Configuration validated"
        );

        Ok(Settings {
            naming: RecordNaming::new(&domain, self.default_record),
            zone: ZoneSettings {
                domain_name: domain,
                source,
                max_attempts: reconcile.max_attempts,
            },
            registry,
            fallback,
            probe_timeout: Duration::from_secs(defaults.timeout_secs),
            controller: ControllerSettings {
                interval: Duration::from_secs(reconcile.interval_secs),
                debounce: Duration::from_millis(reconcile.debounce_millis),
            },
            max_attempts: reconcile.max_attempts,
            provider: self.provider,
            outputs_file: self.outputs_file,
            bind_address,
        })
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration path from `GEOROUTE_CONFIG`, or the default location.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Read, parse and validate the configuration file, applying environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Unreadable`] if the file cannot be read, otherwise any
/// parsing or validation error.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: label.clone(),
        reason: e.to_string(),
    })?;

    Config::from_yaml(&label, &text)?
        .with_token_override(std::env::var(PROVIDER_TOKEN_ENV).ok())
        .into_settings()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
