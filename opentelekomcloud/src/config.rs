//! Provider configuration: authentication and per-service clients

use std::collections::HashMap;

use tfplug::types::{AttributePath, DynamicValue};

use crate::api::auth::AuthOptions;
use crate::api::rds::LANGUAGE_HEADER;
use crate::api::s3::{S3Client, S3Credentials};
use crate::api::{ApiError, Client, RetryConfig};

pub const DEFAULT_CLOUD: &str = "otc.t-systems.com";

/// Host and path of each service endpoint, keyed by service name.
/// The URL is `https://{host}.{region}.{cloud}/{path}`.
const SERVICE_ENDPOINTS: &[(&str, &str, &str)] = &[
    ("compute", "ecs", "v2.1/{project_id}"),
    ("ecs", "ecs", "v1/{project_id}"),
    ("network", "vpc", "v2.0"),
    ("vpc", "vpc", "v1/{project_id}"),
    ("rds", "rds", "rds/v1/{project_id}"),
    ("rdstag", "rds", "v1/{project_id}/rds"),
    ("rdsv3", "rds", "v3/{project_id}"),
    ("waf", "waf", "v1/{project_id}/waf"),
    ("dcs", "dcs", "v1.0"),
    ("elb", "elb", "v2.0/lbaas"),
    ("s3", "obs", ""),
];

/// Settings gathered from the provider block
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub auth_url: Option<String>,
    pub region: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub domain_name: Option<String>,
    pub tenant_name: Option<String>,
    pub tenant_id: Option<String>,
    pub token: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub insecure: bool,
    pub cloud: Option<String>,
    pub max_retries: Option<u32>,
    pub endpoints: HashMap<String, String>,
}

fn non_empty(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

impl ProviderOptions {
    pub fn from_config(config: &DynamicValue) -> Self {
        Self {
            auth_url: non_empty(config, "auth_url"),
            region: non_empty(config, "region"),
            user_name: non_empty(config, "user_name"),
            password: non_empty(config, "password"),
            domain_name: non_empty(config, "domain_name"),
            tenant_name: non_empty(config, "tenant_name"),
            tenant_id: non_empty(config, "tenant_id"),
            token: non_empty(config, "token"),
            access_key: non_empty(config, "access_key"),
            secret_key: non_empty(config, "secret_key"),
            insecure: config
                .get_bool(&AttributePath::new("insecure"))
                .unwrap_or(false),
            cloud: non_empty(config, "cloud"),
            max_retries: config
                .get_i64(&AttributePath::new("max_retries"))
                .ok()
                .and_then(|n| u32::try_from(n).ok()),
            endpoints: config
                .get_string_map(&AttributePath::new("endpoints"))
                .unwrap_or_default(),
        }
    }

    fn auth_options(&self) -> AuthOptions {
        AuthOptions {
            user_name: self.user_name.clone(),
            password: self.password.clone(),
            domain_name: self.domain_name.clone(),
            tenant_id: self.tenant_id.clone(),
            tenant_name: self.tenant_name.clone(),
            token: self.token.clone(),
        }
    }
}

/// Authenticated configuration shared by every handler
#[derive(Clone)]
pub struct Config {
    pub region: String,
    pub cloud: String,
    pub project_id: Option<String>,
    endpoints: HashMap<String, String>,
    s3_credentials: Option<S3Credentials>,
    client: Client,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("cloud", &self.cloud)
            .field("project_id", &self.project_id)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Authenticate against Keystone when `auth_url` is set. Without it a
    /// token is used as-is, which only works with explicit `endpoints`.
    pub async fn new(options: ProviderOptions) -> Result<Self, ApiError> {
        let region = options
            .region
            .clone()
            .ok_or_else(|| ApiError::MissingCredentials("region is required".to_string()))?;
        let retry_config = RetryConfig {
            max_retries: options.max_retries.unwrap_or(RetryConfig::default().max_retries),
            ..RetryConfig::default()
        };

        let (client, project_id) = match &options.auth_url {
            Some(auth_url) => {
                let identity = Client::with_config(auth_url, None, options.insecure, retry_config)?;
                let issued = identity.identity().issue_token(&options.auth_options()).await?;
                let project_id = issued.project_id.or_else(|| options.tenant_id.clone());
                (identity.with_token(&issued.token), project_id)
            }
            None => {
                let token = options.token.as_deref().ok_or_else(|| {
                    ApiError::MissingCredentials(
                        "auth_url is required unless a token and endpoints are given".to_string(),
                    )
                })?;
                if options.endpoints.is_empty() {
                    return Err(ApiError::MissingCredentials(
                        "auth_url is required unless a token and endpoints are given".to_string(),
                    ));
                }
                let client = Client::with_config("", Some(token), options.insecure, retry_config)?;
                (client, options.tenant_id.clone())
            }
        };

        let s3_credentials = match (&options.access_key, &options.secret_key) {
            (Some(access_key), Some(secret_key)) => Some(S3Credentials {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
            }),
            _ => None,
        };

        tracing::info!(region = %region, project_id = ?project_id, "Configured OpenTelekomCloud provider");

        Ok(Self {
            region,
            cloud: options.cloud.unwrap_or_else(|| DEFAULT_CLOUD.to_string()),
            project_id,
            endpoints: options.endpoints,
            s3_credentials,
            client,
        })
    }

    /// Region of a resource: its `region` attribute when set, else the provider's
    pub fn get_region(&self, state: &DynamicValue) -> String {
        non_empty(state, "region").unwrap_or_else(|| self.region.clone())
    }

    /// Base URL of `service` in `region`
    pub fn endpoint(&self, service: &str, region: &str) -> Result<String, ApiError> {
        let template = match self.endpoints.get(service) {
            Some(url) => url.clone(),
            None => {
                let (_, host, path) = SERVICE_ENDPOINTS
                    .iter()
                    .find(|(key, _, _)| *key == service)
                    .ok_or_else(|| ApiError::MissingEndpoint(service.to_string()))?;
                format!("https://{}.{}.{}/{}", host, region, self.cloud, path)
            }
        };

        if template.contains("{project_id}") {
            let project_id = self.project_id.as_deref().ok_or_else(|| {
                ApiError::MissingCredentials(format!(
                    "project id unknown, needed for the {} endpoint",
                    service
                ))
            })?;
            Ok(template.replace("{project_id}", project_id))
        } else {
            Ok(template)
        }
    }

    fn service_client(&self, service: &str, region: &str) -> Result<Client, ApiError> {
        let url = self.endpoint(service, region)?;
        tracing::debug!(service, url = %url, "Resolved service endpoint");
        Ok(self.client.for_endpoint(&url))
    }

    fn rds_client(&self, service: &str, region: &str) -> Result<Client, ApiError> {
        self.service_client(service, region)?
            .with_header(LANGUAGE_HEADER.0, LANGUAGE_HEADER.1)
    }

    pub fn compute_v2_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("compute", region)
    }

    pub fn ecs_v1_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("ecs", region)
    }

    pub fn networking_v2_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("network", region)
    }

    pub fn vpc_v1_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("vpc", region)
    }

    pub fn rds_v1_client(&self, region: &str) -> Result<Client, ApiError> {
        self.rds_client("rds", region)
    }

    pub fn rds_tag_v1_client(&self, region: &str) -> Result<Client, ApiError> {
        self.rds_client("rdstag", region)
    }

    pub fn rds_v3_client(&self, region: &str) -> Result<Client, ApiError> {
        self.rds_client("rdsv3", region)
    }

    pub fn waf_v1_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("waf", region)
    }

    pub fn dcs_v1_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("dcs", region)
    }

    pub fn elb_v2_client(&self, region: &str) -> Result<Client, ApiError> {
        self.service_client("elb", region)
    }

    pub fn s3_client(&self, region: &str) -> Result<S3Client, ApiError> {
        let credentials = self.s3_credentials.clone().ok_or_else(|| {
            ApiError::MissingCredentials(
                "access_key and secret_key are required for S3".to_string(),
            )
        })?;
        let url = self.endpoint("s3", region)?;
        Ok(S3Client::new(
            self.client.for_endpoint(&url),
            credentials,
            region,
        ))
    }
}
