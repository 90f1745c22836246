//! WAF web tamper protection rule resource. Every attribute forces a new rule.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use super::{import_policy_rule, rule_ids, waf_client};
use crate::api::waf::CreateWebTamperProtectionRuleRequest;
use crate::common::{check_deleted, provider_not_configured};
use crate::provider_data::OtcProviderData;

#[derive(Default)]
pub struct WafWebTamperProtectionRuleV1Resource {
    provider_data: Option<OtcProviderData>,
}

impl WafWebTamperProtectionRuleV1Resource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_rule(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let (policy_id, id) = match rule_ids(state) {
            (Some(policy_id), Some(id)) => (policy_id, id),
            (None, Some(id)) => {
                tracing::warn!(id = %id, "No policy_id in state, rule not refreshed");
                return Ok(Some(state.clone()));
            }
            (_, None) => {
                return Err(Diagnostic::error("Missing id", "The rule has no id in state"));
            }
        };

        let client = waf_client(provider_data, state)?;
        let rule = match client.waf_webtamper_rules().get(&policy_id, &id).await {
            Ok(rule) => rule,
            Err(e) => return check_deleted(e, "Waf Web Tamper Protection Rule"),
        };

        let mut new_state = state.clone();
        let _ = new_state.set_string(&AttributePath::new("id"), rule.id);
        let _ = new_state.set_string(&AttributePath::new("hostname"), rule.hostname);
        let _ = new_state.set_string(&AttributePath::new("url"), rule.url);
        if !rule.policy_id.is_empty() {
            let _ = new_state.set_string(&AttributePath::new("policy_id"), rule.policy_id);
        }
        Ok(Some(new_state))
    }
}

#[async_trait]
impl Resource for WafWebTamperProtectionRuleV1Resource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_waf_webtamperprotection_rule_v1"
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
        let required_force_new = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .required()
                .force_new()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a WAF web tamper protection rule")
            .create_timeout(Duration::from_secs(10 * 60))
            .delete_timeout(Duration::from_secs(10 * 60))
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(required_force_new("policy_id", "The WAF policy ID"))
            .attribute(required_force_new("hostname", "The domain name"))
            .attribute(required_force_new("url", "The URL protected by the rule"))
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
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(provider_not_configured());
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let client = match waf_client(provider_data, &request.config) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let get = |name: &str| {
            request
                .config
                .get_string(&AttributePath::new(name))
                .unwrap_or_default()
        };
        let policy_id = get("policy_id");
        let create_request = CreateWebTamperProtectionRuleRequest {
            hostname: get("hostname"),
            url: get("url"),
        };

        let rule = match client
            .waf_webtamper_rules()
            .create(&policy_id, &create_request)
            .await
        {
            Ok(rule) => rule,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating OpenTelekomCloud WAF Web Tamper Protection Rule",
                    e.to_string(),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::debug!(?rule, "Waf web tamper protection rule created");

        let mut state = request.config.clone();
        let _ = state.set_string(&AttributePath::new("id"), rule.id);

        match self.read_rule(provider_data, &state).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud Waf Web Tamper Protection Rule",
                    "The rule disappeared right after creation",
                ));
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
            Err(diag) => {
                diagnostics.push(diag);
                CreateResourceResponse {
                    new_state: state,
                    diagnostics,
                }
            }
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

        match self.read_rule(provider_data, &request.current_state).await {
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
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        // Only reachable after an import without policy_id; adopt the planned values.
        let mut new_state = request.planned_state;
        if let Ok(id) = request.prior_state.get_string(&AttributePath::new("id")) {
            let _ = new_state.set_string(&AttributePath::new("id"), id);
        }
        UpdateResourceResponse {
            new_state,
            diagnostics: vec![],
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

        let (policy_id, id) = match rule_ids(&request.prior_state) {
            (Some(policy_id), Some(id)) => (policy_id, id),
            _ => return DeleteResourceResponse { diagnostics },
        };

        let client = match waf_client(provider_data, &request.prior_state) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.waf_webtamper_rules().delete(&policy_id, &id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "WAF Web Tamper Protection Rule already deleted");
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Error deleting OpenTelekomCloud WAF Web Tamper Protection Rule",
                e.to_string(),
            )),
        }

        DeleteResourceResponse { diagnostics }
    }

    fn importer(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for WafWebTamperProtectionRuleV1Resource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_policy_rule(&ctx, &request)
    }
}

#[async_trait]
impl ResourceWithConfigure for WafWebTamperProtectionRuleV1Resource {
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
