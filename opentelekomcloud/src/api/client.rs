use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::common::{extract_error_code, ApiQueryParams};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager};

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Client for one OpenTelekomCloud service endpoint
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    extra_headers: HeaderMap,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
        }
    }
}

/// Exponential backoff before retry number `attempt` (1-based), capped at
/// `max_backoff_ms`
pub(crate) fn backoff_ms(config: &RetryConfig, attempt: u32) -> u64 {
    let factor = 1_u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    config
        .initial_backoff_ms
        .saturating_mul(factor)
        .min(config.max_backoff_ms)
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, token: Option<&str>, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(endpoint, token, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        token: Option<&str>,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };

        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client(insecure)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                token: token.map(str::to_string),
                extra_headers: HeaderMap::new(),
                retry_config,
                pool_manager,
            }),
        })
    }

    /// A client for another service endpoint sharing this client's
    /// connection pool, token and retry settings
    pub fn for_endpoint(&self, endpoint: &str) -> Self {
        self.derive(|inner| inner.base_url = endpoint.trim_end_matches('/').to_string())
    }

    /// Same endpoint with a different token
    pub fn with_token(&self, token: &str) -> Self {
        self.derive(|inner| inner.token = Some(token.to_string()))
    }

    /// Same endpoint with an extra header sent on every request
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, ApiError> {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::ParseError(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::ParseError(format!("invalid header value for {}: {}", name, e)))?;
        Ok(self.derive(|inner| {
            inner.extra_headers.insert(header, value);
        }))
    }

    fn derive(&self, change: impl FnOnce(&mut ClientInner)) -> Self {
        let mut inner = ClientInner {
            http_client: self.inner.http_client.clone(),
            base_url: self.inner.base_url.clone(),
            token: self.inner.token.clone(),
            extra_headers: self.inner.extra_headers.clone(),
            retry_config: self.inner.retry_config.clone(),
            pool_manager: self.inner.pool_manager.clone(),
        };
        change(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.inner.token.as_deref()
    }

    pub fn service_url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.service_url(path);
        tracing::debug!("{} request to: {}", method, url);

        let mut builder = self
            .inner
            .http_client
            .request(method, &url)
            .headers(self.inner.extra_headers.clone());
        if let Some(token) = &self.inner.token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        builder
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async { self.request(reqwest::Method::GET, path).send().await },
            path,
        )
        .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                self.request(reqwest::Method::POST, path)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                self.request(reqwest::Method::PUT, path)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async { self.request(reqwest::Method::DELETE, path).send().await },
            path,
        )
        .await
    }

    /// DELETE carrying a JSON body, used by tag APIs
    pub async fn delete_with_body<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || async {
                self.request(reqwest::Method::DELETE, path)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Request counters shared with every client derived from this one
    pub fn connection_stats(&self) -> super::pool::ConnectionStats {
        self.inner.pool_manager.stats()
    }

    pub fn identity(&self) -> super::auth::IdentityApi<'_> {
        super::auth::IdentityApi::new(self)
    }

    pub fn server_groups(&self) -> super::compute::ServerGroupsApi<'_> {
        super::compute::ServerGroupsApi::new(self)
    }

    pub fn dcs_available_zones(&self) -> super::dcs::AvailableZonesApi<'_> {
        super::dcs::AvailableZonesApi::new(self)
    }

    pub fn rds_v3(&self) -> super::rds::v3::RdsV3Api<'_> {
        super::rds::v3::RdsV3Api::new(self)
    }

    pub fn rds_v1(&self) -> super::rds::v1::RdsV1Api<'_> {
        super::rds::v1::RdsV1Api::new(self)
    }

    pub fn rds_tags(&self) -> super::rds::tags::RdsTagsApi<'_> {
        super::rds::tags::RdsTagsApi::new(self)
    }

    pub fn waf_whiteblackip_rules(&self) -> super::waf::WhiteBlackIpRulesApi<'_> {
        super::waf::WhiteBlackIpRulesApi::new(self)
    }

    pub fn waf_webtamper_rules(&self) -> super::waf::WebTamperProtectionRulesApi<'_> {
        super::waf::WebTamperProtectionRulesApi::new(self)
    }

    pub fn bandwidths(&self) -> super::vpc::BandwidthsApi<'_> {
        super::vpc::BandwidthsApi::new(self)
    }

    pub fn vpc_subnets(&self) -> super::vpc::SubnetsApi<'_> {
        super::vpc::SubnetsApi::new(self)
    }

    pub fn ports(&self) -> super::networking::PortsApi<'_> {
        super::networking::PortsApi::new(self)
    }

    pub fn floating_ips(&self) -> super::networking::FloatingIpsApi<'_> {
        super::networking::FloatingIpsApi::new(self)
    }

    pub fn lb_pools(&self) -> super::elb::PoolsApi<'_> {
        super::elb::PoolsApi::new(self)
    }

    pub fn load_balancers(&self) -> super::elb::LoadBalancersApi<'_> {
        super::elb::LoadBalancersApi::new(self)
    }

    pub fn ecs_tags(&self) -> super::ecs::TagsApi<'_> {
        super::ecs::TagsApi::new(self)
    }

    /// Execute request with retry logic and parse the JSON body
    async fn execute_with_retry<F, Fut, T>(&self, request_fn: F, path: &str) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let response = self.send_with_retry(request_fn, path).await?;
        self.parse_success_response(response).await
    }

    /// Send a request, retrying rate limiting, server errors and connection
    /// failures. Returns the successful response unread.
    pub(crate) async fn send_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(&self.inner.retry_config, attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.inner.pool_manager.record_retry();
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.pool_manager.record_request(true);
                        return Ok(response);
                    }

                    self.inner.pool_manager.record_request(false);

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::AuthError(text));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(Self::error_from_response(response).await);
                    } else {
                        return Err(Self::error_from_response(response).await);
                    }
                }
                Err(e) => {
                    self.inner.pool_manager.record_request(false);

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        tracing::debug!(
            "Giving up on {} after {} attempts, {:?}",
            path,
            attempt,
            self.inner.pool_manager.stats()
        );
        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response. Empty bodies (204, bare 200) parse as JSON null.
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };

        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Build an `ApiError` from a non-success response
    pub(crate) async fn error_from_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        ApiError::ApiError {
            status,
            code: extract_error_code(&text),
            message: text,
        }
    }
}
