// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! REST/JSON DNS provider client.
//!
//! Endpoints (relative to the configured base URL):
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `v1/zones` | create hosted zone |
//! | GET | `v1/zones/{id}` | get hosted zone |
//! | GET | `v1/zones/{id}/records` | list records |
//! | POST | `v1/zones/{id}/changes` | submit a change batch |
//! | POST | `v1/healthchecks` | create health check |
//! | GET | `v1/healthchecks/{reference}` | get health check |
//!
//! HTTP status codes map to [`ProviderError`]: 404 → `NotFound`, 429 and 5xx →
//! `Transient`, any other non-2xx → `Permanent`.

use super::DnsProvider;
use crate::constants::PROVIDER_REQUEST_TIMEOUT_SECS;
use crate::dns_errors::ProviderError;
use crate::model::{HealthCheck, HealthCheckSpec, HostedZone, RecordChange, RoutingRecord};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateZoneRequest<'a> {
    domain_name: &'a str,
    caller_reference: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneResponse {
    id: String,
    domain_name: String,
}

#[derive(Deserialize)]
struct RecordsResponse {
    records: Vec<RoutingRecord>,
}

#[derive(Serialize)]
struct ChangeBatchRequest<'a> {
    changes: &'a [RecordChange],
}

/// Provider client for a REST/JSON DNS API.
#[derive(Clone, Debug)]
pub struct HttpDnsProvider {
    client: HttpClient,
    base: Url,
    token: Option<String>,
    atomic_batches: bool,
}

impl HttpDnsProvider {
    /// Create a client for the API at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the endpoint is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        atomic_batches: bool,
    ) -> Result<Self, ProviderError> {
        let base = build_api_url(endpoint)?;
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(PROVIDER_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Transport {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base,
            token,
            atomic_batches,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base.join(path).map_err(|e| ProviderError::Transport {
            reason: format!("invalid request path '{path}': {e}"),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<T, ProviderError> {
        let body = self.send_raw(builder, resource).await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode {
            reason: format!("{resource}: {e}"),
        })
    }

    async fn send_raw(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<String, ProviderError> {
        let response = builder.send().await.map_err(|e| ProviderError::Transport {
            reason: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(%resource, status = %status, "provider API response");

        if status.is_success() {
            return Ok(body);
        }
        Err(map_status(status, resource, body))
    }
}

#[async_trait]
impl DnsProvider for HttpDnsProvider {
    async fn create_hosted_zone(
        &self,
        domain: &str,
        caller_reference: &str,
    ) -> Result<HostedZone, ProviderError> {
        let url = self.url("v1/zones")?;
        info!(domain, caller_reference, "creating hosted zone");

        let zone: ZoneResponse = self
            .send(
                self.request(Method::POST, url).json(&CreateZoneRequest {
                    domain_name: domain,
                    caller_reference,
                }),
                &format!("zone {domain}"),
            )
            .await?;

        Ok(HostedZone {
            id: zone.id,
            domain_name: zone.domain_name,
            managed: true,
        })
    }

    async fn get_hosted_zone(&self, zone_id: &str) -> Result<HostedZone, ProviderError> {
        let url = self.url(&format!("v1/zones/{zone_id}"))?;
        let zone: ZoneResponse = self
            .send(self.request(Method::GET, url), &format!("zone {zone_id}"))
            .await?;

        Ok(HostedZone {
            id: zone.id,
            domain_name: zone.domain_name,
            managed: false,
        })
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RoutingRecord>, ProviderError> {
        let url = self.url(&format!("v1/zones/{zone_id}/records"))?;
        let response: RecordsResponse = self
            .send(
                self.request(Method::GET, url),
                &format!("records of zone {zone_id}"),
            )
            .await?;
        Ok(response.records)
    }

    async fn change_records(
        &self,
        zone_id: &str,
        changes: &[RecordChange],
    ) -> Result<(), ProviderError> {
        let url = self.url(&format!("v1/zones/{zone_id}/changes"))?;
        self.send_raw(
            self.request(Method::POST, url)
                .json(&ChangeBatchRequest { changes }),
            &format!("change batch for zone {zone_id}"),
        )
        .await
        .map(|_| ())
    }

    async fn create_health_check(
        &self,
        spec: &HealthCheckSpec,
    ) -> Result<HealthCheck, ProviderError> {
        let url = self.url("v1/healthchecks")?;
        self.send(
            self.request(Method::POST, url).json(spec),
            &format!("health check {}", spec.reference),
        )
        .await
    }

    async fn get_health_check(
        &self,
        reference: &str,
    ) -> Result<Option<HealthCheck>, ProviderError> {
        let url = self.url(&format!("v1/healthchecks/{reference}"))?;
        match self
            .send(
                self.request(Method::GET, url),
                &format!("health check {reference}"),
            )
            .await
        {
            Ok(check) => Ok(Some(check)),
            Err(ProviderError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn supports_atomic_batches(&self) -> bool {
        self.atomic_batches
    }
}

/// Build the API base URL from a server address.
///
/// Converts `dns-api.internal:8443` or `https://dns-api.internal/` into a base URL
/// ending in `/` so relative paths join beneath it.
///
/// # Errors
///
/// Returns [`ProviderError::Transport`] if the result is not a valid URL.
pub fn build_api_url(server: &str) -> Result<Url, ProviderError> {
    let trimmed = server.trim_end_matches('/');
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("{trimmed}/")
    } else {
        format!("http://{trimmed}/")
    };
    Url::parse(&with_scheme).map_err(|e| ProviderError::Transport {
        reason: format!("invalid provider endpoint '{server}': {e}"),
    })
}

/// Map a non-success HTTP status to a [`ProviderError`].
#[must_use]
pub fn map_status(status: StatusCode, resource: &str, body: String) -> ProviderError {
    if status == StatusCode::NOT_FOUND {
        return ProviderError::NotFound {
            resource: resource.to_string(),
        };
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return ProviderError::Transient {
            status: status.as_u16(),
            message: body,
        };
    }
    ProviderError::Permanent {
        status: status.as_u16(),
        message: body,
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
