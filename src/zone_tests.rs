// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `zone.rs`

#[cfg(test)]
mod tests {
    use crate::dns_errors::{ProviderError, ZoneError};
    use crate::model::HostedZone;
    use crate::provider::{DnsProvider, MemoryProvider};
    use crate::test_support::{three_region_registry, DOMAIN};
    use crate::zone::{
        caller_reference, ensure_health_checks, resolve_hosted_zone, validate_zone_id,
        ZoneSettings, ZoneSource,
    };

    fn create_settings() -> ZoneSettings {
        ZoneSettings {
            domain_name: DOMAIN.to_string(),
            source: ZoneSource::Create {
                project_name: "georoute".to_string(),
            },
            max_attempts: 3,
        }
    }

    fn existing_settings(zone_id: &str) -> ZoneSettings {
        ZoneSettings {
            domain_name: DOMAIN.to_string(),
            source: ZoneSource::Existing {
                zone_id: zone_id.to_string(),
            },
            max_attempts: 3,
        }
    }

    fn seeded_provider() -> MemoryProvider {
        let provider = MemoryProvider::atomic();
        provider.insert_zone(HostedZone {
            id: "Z1234567890ABC".to_string(),
            domain_name: "Test.Example.com.".to_string(),
            managed: false,
        });
        provider
    }

    #[test]
    fn test_validate_zone_id() {
        assert_eq!(validate_zone_id("Z1234567890ABC").unwrap(), "Z1234567890ABC");
        assert_eq!(
            validate_zone_id("/hostedzone/Z1234567890ABC").unwrap(),
            "Z1234567890ABC"
        );

        let too_long = "Z".repeat(33);
        for bad in ["", "/hostedzone/", "z123lower", "Z12-34", too_long.as_str()] {
            assert!(
                matches!(validate_zone_id(bad), Err(ZoneError::InvalidZoneId { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_caller_reference() {
        assert_eq!(
            caller_reference("georoute", "Test.Example.com."),
            "georoute-test.example.com"
        );
    }

    #[tokio::test]
    async fn test_create_zone_called_once() {
        let provider = MemoryProvider::atomic();

        let zone = resolve_hosted_zone(&provider, &create_settings())
            .await
            .unwrap();

        assert!(zone.managed);
        assert_eq!(zone.domain_name, DOMAIN);
        assert_eq!(provider.zone_creations(), 1);
    }

    #[tokio::test]
    async fn test_zone_creation_rejection_is_fatal_and_not_retried() {
        let provider = MemoryProvider::atomic();
        provider.fail_zone_creation(ProviderError::Transient {
            status: 503,
            message: "ServiceUnavailable".to_string(),
        });

        let err = resolve_hosted_zone(&provider, &create_settings())
            .await
            .unwrap_err();

        assert!(matches!(err, ZoneError::ZoneCreation { .. }));
        assert_eq!(provider.zone_creations(), 0);
    }

    #[tokio::test]
    async fn test_existing_zone_is_unmanaged() {
        let provider = seeded_provider();

        let zone = resolve_hosted_zone(&provider, &existing_settings("/hostedzone/Z1234567890ABC"))
            .await
            .unwrap();

        assert_eq!(zone.id, "Z1234567890ABC");
        assert_eq!(zone.domain_name, DOMAIN);
        assert!(!zone.managed);
        assert_eq!(provider.zone_creations(), 0);
    }

    #[tokio::test]
    async fn test_unknown_zone_id() {
        let provider = seeded_provider();

        let err = resolve_hosted_zone(&provider, &existing_settings("ZDOESNOTEXIST"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ZoneError::ZoneNotFound {
                zone_id: "ZDOESNOTEXIST".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_zone_id_fails_before_lookup() {
        let provider = seeded_provider();

        let err = resolve_hosted_zone(&provider, &existing_settings("not a zone"))
            .await
            .unwrap_err();
        assert!(matches!(err, ZoneError::InvalidZoneId { .. }));
    }

    #[tokio::test]
    async fn test_domain_mismatch() {
        let provider = seeded_provider();
        let settings = ZoneSettings {
            domain_name: "other.example.com".to_string(),
            ..existing_settings("Z1234567890ABC")
        };

        let err = resolve_hosted_zone(&provider, &settings).await.unwrap_err();
        assert!(matches!(err, ZoneError::DomainMismatch { .. }));
    }

    #[tokio::test]
    async fn test_ensure_health_checks_is_idempotent() {
        let provider = MemoryProvider::atomic();
        let registry = three_region_registry();

        let first = ensure_health_checks(&provider, &registry, 3).await.unwrap();
        let second = ensure_health_checks(&provider, &registry, 3).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(provider.health_checks().len(), 3);

        let seoul = provider.get_health_check("seoul").await.unwrap().unwrap();
        assert_eq!(seoul.spec.fqdn, "seoul-alb.elb.amazonaws.com");
        assert_eq!(seoul.spec.protocol, "HTTPS");
        assert_eq!(seoul.spec.port, 443);
    }
}
