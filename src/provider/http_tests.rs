// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `provider/http.rs`

#[cfg(test)]
mod tests {
    use crate::dns_errors::ProviderError;
    use crate::model::{RecordChange, RoutingRecord};
    use crate::provider::http::{build_api_url, map_status};
    use crate::provider::{DnsProvider, HttpDnsProvider};
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> RoutingRecord {
        RoutingRecord {
            name: "seoul.test.example.com".to_string(),
            geolocation_key: Some("ap-northeast-2".to_string()),
            alias_target: "seoul-alb.elb.amazonaws.com".to_string(),
            alias_zone_id: "Z35SXDOTRQ7X7K".to_string(),
            health_check_ref: Some("seoul".to_string()),
            evaluate_target_health: true,
        }
    }

    fn provider(server: &MockServer) -> HttpDnsProvider {
        HttpDnsProvider::new(&server.uri(), Some("secret-token".to_string()), true).unwrap()
    }

    #[test]
    fn test_build_api_url_adds_scheme_and_trailing_slash() {
        assert_eq!(
            build_api_url("dns-api.internal:8443").unwrap().as_str(),
            "http://dns-api.internal:8443/"
        );
        assert_eq!(
            build_api_url("https://dns-api.internal/").unwrap().as_str(),
            "https://dns-api.internal/"
        );
        assert_eq!(
            build_api_url("https://dns-api.internal/api")
                .unwrap()
                .as_str(),
            "https://dns-api.internal/api/"
        );
    }

    #[test]
    fn test_map_status_categories() {
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, "zone Z1", String::new()),
            ProviderError::NotFound { .. }
        ));
        assert!(map_status(StatusCode::TOO_MANY_REQUESTS, "r", String::new()).is_retryable());
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, "r", String::new()).is_retryable());
        assert_eq!(
            map_status(StatusCode::BAD_REQUEST, "r", "bad alias".to_string()),
            ProviderError::Permanent {
                status: 400,
                message: "bad alias".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_records_sends_token_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/zones/Z1234567890ABC/records"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [record()]
            })))
            .mount(&server)
            .await;

        let records = provider(&server)
            .list_records("Z1234567890ABC")
            .await
            .unwrap();

        assert_eq!(records, vec![record()]);
    }

    #[tokio::test]
    async fn test_change_records_posts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/zones/Z1234567890ABC/changes"))
            .and(body_partial_json(json!({
                "changes": [{"action": "CREATE", "record": {"name": "seoul.test.example.com"}}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server)
            .change_records("Z1234567890ABC", &[RecordChange::Create(record())])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_records_throttled_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/zones/Z1234567890ABC/changes"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Throttling"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .change_records("Z1234567890ABC", &[RecordChange::Delete(record())])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProviderError::Transient {
                status: 429,
                message: "Throttling".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_get_hosted_zone_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/zones/ZMISSING"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = provider(&server)
            .get_hosted_zone("ZMISSING")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_hosted_zone_is_managed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/zones"))
            .and(body_partial_json(json!({
                "domainName": "test.example.com",
                "callerReference": "georoute-test.example.com"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "ZNEW00000001",
                "domainName": "test.example.com"
            })))
            .mount(&server)
            .await;

        let zone = provider(&server)
            .create_hosted_zone("test.example.com", "georoute-test.example.com")
            .await
            .unwrap();

        assert_eq!(zone.id, "ZNEW00000001");
        assert!(zone.managed);
    }

    #[tokio::test]
    async fn test_missing_health_check_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/healthchecks/seoul"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(provider(&server)
            .get_health_check("seoul")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/zones/Z1/records"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(&server).list_records("Z1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));
        assert!(!err.is_retryable());
    }
}
