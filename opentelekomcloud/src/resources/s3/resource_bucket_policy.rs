//! S3 bucket policy resource
//!
//! The bucket name doubles as the resource id. Create and update share one
//! put path; the policy text in state is compared by meaning, not by bytes.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{SuppressDiffIf, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::retry::{retry_with_min_wait, RetryableError};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::JsonStringValidator;

use crate::api::s3::S3Client;
use crate::common::{policy_equivalent, provider_not_configured, string_attr};
use crate::provider_data::OtcProviderData;

const PUT_RETRY_TIMEOUT: Duration = Duration::from_secs(60);

fn equivalent_policies(old: &Dynamic, new: &Dynamic) -> bool {
    match (old, new) {
        (Dynamic::String(old), Dynamic::String(new)) => policy_equivalent(old, new),
        _ => false,
    }
}

#[derive(Default)]
pub struct S3BucketPolicyResource {
    provider_data: Option<OtcProviderData>,
}

impl S3BucketPolicyResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn s3_client(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<S3Client, Diagnostic> {
        let region = provider_data.config.get_region(state);
        provider_data.config.s3_client(&region).map_err(|e| {
            Diagnostic::error("Error creating OpenTelekomCloud s3 client", e.to_string())
        })
    }

    /// Shared by create and update
    async fn put_policy(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.s3_client(provider_data, config)?;
        let bucket = string_attr(config, "bucket").unwrap_or_default();
        let policy = string_attr(config, "policy").unwrap_or_default();
        tracing::debug!(bucket = %bucket, policy = %policy, "S3 bucket put policy");

        retry_with_min_wait(
            ctx,
            PUT_RETRY_TIMEOUT,
            provider_data.poll.retry_min_wait(),
            || async {
                match client.put_bucket_policy(&bucket, &policy).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.error_code() == Some("MalformedPolicy") => {
                        Err(RetryableError::retryable(e))
                    }
                    Err(e) => Err(RetryableError::non_retryable(e)),
                }
            },
        )
        .await
        .map_err(|e| Diagnostic::error("Error putting S3 policy", e.to_string()))?;

        let mut state = config.clone();
        let _ = state.set_string(&AttributePath::new("id"), bucket);
        Ok(state)
    }

    async fn read_policy(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let bucket = match string_attr(state, "id") {
            Some(id) => id,
            None => return Err(Diagnostic::error("Missing id", "The bucket policy has no id")),
        };
        let client = self.s3_client(provider_data, state)?;
        tracing::debug!(bucket = %bucket, "S3 bucket policy, read");

        let policy = match client.get_bucket_policy(&bucket).await {
            Ok(policy) => policy,
            Err(e) if e.error_code() == Some("NoSuchBucket") => {
                tracing::warn!(bucket = %bucket, "S3 bucket not found, removing policy from state");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, error = %e, "Failed to read S3 bucket policy");
                String::new()
            }
        };

        let mut new_state = state.clone();
        let _ = new_state.set_string(&AttributePath::new("bucket"), bucket);
        let _ = new_state.set_string(&AttributePath::new("policy"), policy);
        Ok(Some(new_state))
    }
}

#[async_trait]
impl Resource for S3BucketPolicyResource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_s3_bucket_policy"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Attaches a policy to an S3 bucket")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bucket", AttributeType::String)
                    .description("Name of the bucket")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("policy", AttributeType::String)
                    .description("JSON policy document")
                    .required()
                    .validator(JsonStringValidator::create())
                    .plan_modifier(SuppressDiffIf::create(
                        equivalent_policies,
                        "Ignores formatting and ordering differences between policies",
                    ))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![provider_not_configured()],
                };
            }
        };

        match self.put_policy(&ctx, provider_data, &request.config).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![provider_not_configured()],
                };
            }
        };

        match self.read_policy(provider_data, &request.current_state).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
            },
        }
    }

    async fn update(
        &self,
        ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics: vec![provider_not_configured()],
                };
            }
        };

        match self.put_policy(&ctx, provider_data, &request.config).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(provider_not_configured());
                return DeleteResourceResponse { diagnostics };
            }
        };

        let client = match self.s3_client(provider_data, &request.prior_state) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let bucket = string_attr(&request.prior_state, "bucket")
            .or_else(|| string_attr(&request.prior_state, "id"))
            .unwrap_or_default();
        tracing::debug!(bucket = %bucket, "S3 bucket delete policy");

        match client.delete_bucket_policy(&bucket).await {
            Ok(()) => {}
            Err(e) if e.error_code() == Some("NoSuchBucket") => {}
            Err(e) => diagnostics.push(Diagnostic::error("Error deleting S3 policy", e.to_string())),
        }

        DeleteResourceResponse { diagnostics }
    }

    fn importer(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for S3BucketPolicyResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for S3BucketPolicyResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<OtcProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract OtcProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[cfg(test)]
#[path = "./resource_bucket_policy_test.rs"]
mod resource_bucket_policy_test;
