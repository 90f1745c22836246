//! Test helpers for the OpenTelekomCloud API

#[cfg(test)]
#[allow(dead_code)]
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::with_config(
        url,
        Some("test-token"),
        true,
        super::RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use super::create_test_client;
    use mockito::Server;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn test_api_query_params() {
        let params = ApiQueryParams::new()
            .add("share_type", "WHOLE")
            .add("size", 100)
            .add_optional("name", Some("bw 1"))
            .add_optional("none", None::<String>);

        let query = params.to_query_string();
        assert!(query.starts_with('?'));
        assert!(query.contains("share_type=WHOLE"));
        assert!(query.contains("size=100"));
        assert!(query.contains("name=bw%201"));
        assert!(!query.contains("none="));
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn test_connection_pool_config() {
        use pool::ConnectionPoolConfig;

        let config = ConnectionPoolConfig::default();
        assert_eq!(config.max_idle_per_host, 10);
        assert_eq!(config.idle_timeout.as_secs(), 90);
        assert_eq!(config.connect_timeout.as_secs(), 10);
        assert_eq!(config.request_timeout.as_secs(), 60);
        assert_eq!(config.tcp_keepalive.unwrap().as_secs(), 30);
    }

    #[tokio::test]
    async fn test_unavailable_service_is_retried_and_counted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let retry = RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            timeout_seconds: 5,
        };
        let client = Client::with_config(&server.url(), Some("token"), false, retry).unwrap();
        let derived = client.for_endpoint(&server.url());

        let result: Result<serde_json::Value, ApiError> = derived.get("/jobs").await;
        let err = tokio_test::assert_err!(result);
        assert_eq!(err.status(), Some(503));
        mock.assert_async().await;

        let stats = client.connection_stats();
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.failures, 3);
        assert_eq!(stats.retries, 2);
    }

    #[test]
    fn test_api_error_formatting() {
        let error = ApiError::ApiError {
            status: 400,
            message: r#"{"error_code":"DBS.200019","error_msg":"invalid flavor"}"#.to_string(),
            code: Some("DBS.200019".to_string()),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("invalid flavor"));
        assert_eq!(error.error_code(), Some("DBS.200019"));
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_extract_error_code() {
        use common::extract_error_code;

        assert_eq!(
            extract_error_code(r#"{"error_code":"WAF.00014002","error_msg":"bad"}"#).as_deref(),
            Some("WAF.00014002")
        );
        assert_eq!(
            extract_error_code(r#"{"errCode":"DCS.4001"}"#).as_deref(),
            Some("DCS.4001")
        );
        assert_eq!(
            extract_error_code(r#"{"NeutronError":{"type":"PortNotFound","message":"x"}}"#)
                .as_deref(),
            Some("PortNotFound")
        );
        assert_eq!(
            extract_error_code("<Error><Code>MalformedPolicy</Code></Error>").as_deref(),
            Some("MalformedPolicy")
        );
        assert_eq!(extract_error_code("plain text"), None);
    }

    #[tokio::test]
    async fn client_sends_token_and_extra_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v3/p1/instances")
            .match_header("x-auth-token", "test-token")
            .match_header("x-language", "en-us")
            .with_body(r#"{"instances": []}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url())
            .with_header("X-Language", "en-us")
            .unwrap();
        let body: serde_json::Value = client.get("/v3/p1/instances").await.unwrap();

        assert_eq!(body["instances"], serde_json::json!([]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_retries_server_errors() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/flaky")
            .with_status(503)
            .with_body(r#"{"error_code": "APIGW.0303", "error_msg": "Service busy"}"#)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.get::<serde_json::Value>("/flaky").await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.error_code(), Some("APIGW.0303"));
        assert!(err.to_string().contains("Service busy"));
        failing.assert_async().await;
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let config = RetryConfig {
            max_retries: 1000,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            timeout_seconds: 60,
        };
        assert_eq!(super::super::client::backoff_ms(&config, 1), 100);
        assert_eq!(super::super::client::backoff_ms(&config, 3), 400);
        assert_eq!(super::super::client::backoff_ms(&config, 64), 10_000);
        assert_eq!(super::super::client::backoff_ms(&config, 900), 10_000);
    }

    #[tokio::test]
    async fn client_reports_not_found_with_code() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/os-server-groups/missing")
            .with_status(404)
            .with_body(r#"{"itemNotFound": {"code": 404, "message": "not found"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<serde_json::Value>("/os-server-groups/missing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn empty_body_parses_as_unit() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/thing")
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.delete::<()>("/thing").await.unwrap();
    }

    #[test]
    fn derived_clients_keep_token() {
        let client = create_test_client("http://localhost:1/");
        assert_eq!(client.base_url(), "http://localhost:1");

        let other = client.for_endpoint("https://vpc.eu-de.otc.t-systems.com/v1/p1/");
        assert_eq!(other.base_url(), "https://vpc.eu-de.otc.t-systems.com/v1/p1");
        assert_eq!(other.token(), Some("test-token"));
        assert_eq!(
            other.service_url("/bandwidths"),
            "https://vpc.eu-de.otc.t-systems.com/v1/p1/bandwidths"
        );
    }
}
