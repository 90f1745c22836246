//! The `opentelekomcloud` provider: configuration schema and handler registry

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::defaults::EnvDefault;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};

use crate::config::{Config, ProviderOptions, DEFAULT_CLOUD};
use crate::data_sources::{DcsAzV1DataSource, RdsVersionsV3DataSource, VpcBandwidthDataSource};
use crate::provider_data::{OtcProviderData, PollSettings};
use crate::resources::{
    ComputeServerGroupV2Resource, FloatingIpAssociateV2Resource, LbPoolV2Resource,
    RdsInstanceV3Resource, S3BucketPolicyResource, WafWebTamperProtectionRuleV1Resource,
    WafWhiteBlackIpRuleV1Resource,
};

pub const PROVIDER_TYPE_NAME: &str = "opentelekomcloud";

#[derive(Default)]
pub struct OtcProvider {
    poll: PollSettings,
}

impl OtcProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose state waits and retries poll at the given settings
    pub fn with_poll_settings(poll: PollSettings) -> Self {
        Self { poll }
    }
}

fn string_attribute(name: &str, description: &str, env_vars: &[&str]) -> AttributeBuilder {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .default(EnvDefault::any_of(env_vars, None))
}

fn missing(attribute: &str, env_var: &str) -> Diagnostic {
    Diagnostic::error(
        format!(
            "{} is required (set in provider config or {} env var)",
            attribute, env_var
        ),
        format!("The provider attribute '{}' has no value", attribute),
    )
    .with_attribute(AttributePath::new(attribute))
}

/// Checks that a usable combination of settings is present
fn validate_options(options: &ProviderOptions) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    if options.region.is_none() {
        diagnostics.push(missing("region", "OS_REGION_NAME"));
    }
    if options.auth_url.is_none() && options.endpoints.is_empty() {
        diagnostics.push(missing("auth_url", "OS_AUTH_URL"));
    }
    if options.token.is_none() {
        if options.user_name.is_none() {
            diagnostics.push(missing("user_name", "OS_USERNAME"));
        }
        if options.password.is_none() {
            diagnostics.push(missing("password", "OS_PASSWORD"));
        }
    }
    diagnostics
}

fn compute_servergroup_v2() -> Box<dyn ResourceWithConfigure> {
    Box::new(ComputeServerGroupV2Resource::new())
}

fn waf_whiteblackip_rule_v1() -> Box<dyn ResourceWithConfigure> {
    Box::new(WafWhiteBlackIpRuleV1Resource::new())
}

fn waf_webtamperprotection_rule_v1() -> Box<dyn ResourceWithConfigure> {
    Box::new(WafWebTamperProtectionRuleV1Resource::new())
}

fn s3_bucket_policy() -> Box<dyn ResourceWithConfigure> {
    Box::new(S3BucketPolicyResource::new())
}

fn rds_instance_v3() -> Box<dyn ResourceWithConfigure> {
    Box::new(RdsInstanceV3Resource::new())
}

fn lb_pool_v2() -> Box<dyn ResourceWithConfigure> {
    Box::new(LbPoolV2Resource::new())
}

fn networking_floatingip_associate_v2() -> Box<dyn ResourceWithConfigure> {
    Box::new(FloatingIpAssociateV2Resource::new())
}

fn dcs_az_v1() -> Box<dyn DataSourceWithConfigure> {
    Box::new(DcsAzV1DataSource::new())
}

fn rds_versions_v3() -> Box<dyn DataSourceWithConfigure> {
    Box::new(RdsVersionsV3DataSource::new())
}

fn vpc_bandwidth() -> Box<dyn DataSourceWithConfigure> {
    Box::new(VpcBandwidthDataSource::new())
}

#[async_trait]
impl Provider for OtcProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Provider for OpenTelekomCloud")
            .attribute(
                string_attribute(
                    "auth_url",
                    "The Identity authentication URL",
                    &["OS_AUTH_URL"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "region",
                    "The OpenTelekomCloud region to connect to",
                    &["OS_REGION_NAME"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "user_name",
                    "Username to login with",
                    &["OS_USERNAME"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "password",
                    "Password to login with",
                    &["OS_PASSWORD"],
                )
                .sensitive()
                .build(),
            )
            .attribute(
                string_attribute(
                    "domain_name",
                    "The name of the Domain to scope to",
                    &["OS_DOMAIN_NAME", "OS_USER_DOMAIN_NAME"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "tenant_name",
                    "The name of the Tenant (Identity v2) or Project (Identity v3) to login with",
                    &["OS_TENANT_NAME", "OS_PROJECT_NAME"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "tenant_id",
                    "The ID of the Tenant (Identity v2) or Project (Identity v3) to login with",
                    &["OS_TENANT_ID", "OS_PROJECT_ID"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "token",
                    "Authentication token to use as an alternative to username/password",
                    &["OS_AUTH_TOKEN"],
                )
                .sensitive()
                .build(),
            )
            .attribute(
                string_attribute(
                    "access_key",
                    "The access key for API operations",
                    &["OS_ACCESS_KEY"],
                )
                .build(),
            )
            .attribute(
                string_attribute(
                    "secret_key",
                    "The secret key for API operations",
                    &["OS_SECRET_KEY"],
                )
                .sensitive()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Trust self-signed certificates")
                    .optional()
                    .default(EnvDefault::bool(&["OS_INSECURE"], false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud", AttributeType::String)
                    .description("The endpoint for the cloud provider")
                    .optional()
                    .default(EnvDefault::create("OS_CLOUD_DOMAIN", DEFAULT_CLOUD))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("How many times HTTP connection should be retried until giving up")
                    .optional()
                    .default(EnvDefault::number(&["OS_MAX_RETRIES"], 3.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoints", AttributeType::map_of(AttributeType::String))
                    .description("Base URL overrides keyed by service (compute, rdsv3, waf, ...)")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let options = ProviderOptions::from_config(&request.config);

        let diagnostics = validate_options(&options);
        if !diagnostics.is_empty() {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        }

        match Config::new(options).await {
            Ok(config) => ConfigureProviderResponse {
                diagnostics: vec![],
                provider_data: Some(Arc::new(OtcProviderData::new(config, self.poll))),
            },
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to configure OpenTelekomCloud client",
                    format!("API error: {}", e),
                )],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "opentelekomcloud_compute_servergroup_v2".to_string(),
            compute_servergroup_v2,
        );
        resources.insert(
            "opentelekomcloud_waf_whiteblackip_rule_v1".to_string(),
            waf_whiteblackip_rule_v1,
        );
        resources.insert(
            "opentelekomcloud_waf_webtamperprotection_rule_v1".to_string(),
            waf_webtamperprotection_rule_v1,
        );
        resources.insert("opentelekomcloud_s3_bucket_policy".to_string(), s3_bucket_policy);
        resources.insert("opentelekomcloud_rds_instance_v3".to_string(), rds_instance_v3);
        resources.insert("opentelekomcloud_lb_pool_v2".to_string(), lb_pool_v2);
        resources.insert(
            "opentelekomcloud_networking_floatingip_associate_v2".to_string(),
            networking_floatingip_associate_v2,
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert("opentelekomcloud_dcs_az_v1".to_string(), dcs_az_v1);
        data_sources.insert("opentelekomcloud_rds_versions_v3".to_string(), rds_versions_v3);
        data_sources.insert("opentelekomcloud_vpc_bandwidth".to_string(), vpc_bandwidth);
        data_sources
    }
}
