// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for error types.

#[cfg(test)]
mod tests {
    use crate::dns_errors::*;
    use crate::model::RecordKey;

    #[test]
    fn test_duplicate_geolocation_key_message() {
        let error = ConfigError::DuplicateGeolocationKey {
            key: "NA/US-East".to_string(),
            first: "us-east".to_string(),
            second: "us-east-2".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Geolocation key 'NA/US-East' is used by both 'us-east' and 'us-east-2'"
        );
    }

    #[test]
    fn test_zone_creation_wraps_provider_error() {
        let error = ZoneError::ZoneCreation {
            domain: "example.com".to_string(),
            source: ProviderError::Permanent {
                status: 409,
                message: "HostedZoneAlreadyExists".to_string(),
            },
        };

        assert_eq!(
            error.to_string(),
            "Failed to create hosted zone for 'example.com': Provider rejected request (HTTP 409): HostedZoneAlreadyExists"
        );
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_provider_error_retryability() {
        assert!(ProviderError::Transient {
            status: 429,
            message: "slow down".to_string()
        }
        .is_retryable());
        assert!(ProviderError::Transport {
            reason: "connection reset".to_string()
        }
        .is_retryable());

        assert!(!ProviderError::Permanent {
            status: 400,
            message: "bad".to_string()
        }
        .is_retryable());
        assert!(!ProviderError::NotFound {
            resource: "zone Z1".to_string()
        }
        .is_retryable());
        assert!(!ProviderError::Decode {
            reason: "eof".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_partial_convergence_names_unresolved_records() {
        let error = ReconcileError::PartialConvergence {
            unresolved: vec![
                RecordKey::new("seoul.example.com", Some("AS/KR".to_string())),
                RecordKey::new("www.example.com", None),
            ],
            attempts: 5,
            source: ProviderError::Transient {
                status: 503,
                message: "unavailable".to_string(),
            },
        };

        let message = error.to_string();
        assert!(message.contains("2 record(s)"));
        assert!(message.contains("5 attempt(s)"));
        assert!(message.contains("seoul.example.com [AS/KR]"));
        assert!(message.contains("www.example.com [default]"));
        assert!(message.contains("HTTP 503"));
        assert_eq!(error.unresolved().len(), 2);
        assert_eq!(error.error_type(), "partial_convergence");
    }

    #[test]
    fn test_cancelled_error() {
        let error = ReconcileError::Cancelled {
            unresolved: vec![RecordKey::new("www.example.com", None)],
        };

        assert_eq!(
            error.to_string(),
            "Reconciliation cancelled with 1 record(s) unresolved"
        );
        assert_eq!(error.error_type(), "cancelled");
    }
}
