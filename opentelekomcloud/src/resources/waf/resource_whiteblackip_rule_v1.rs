//! WAF white/black IP rule resource

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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
use tfplug::validator::NumberRangeValidator;

use super::{import_policy_rule, rule_ids, waf_client};
use crate::api::waf::{CreateWhiteBlackIpRuleRequest, UpdateWhiteBlackIpRuleRequest};
use crate::common::{check_deleted, provider_not_configured};
use crate::provider_data::OtcProviderData;

#[derive(Default)]
pub struct WafWhiteBlackIpRuleV1Resource {
    provider_data: Option<OtcProviderData>,
}

impl WafWhiteBlackIpRuleV1Resource {
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
        let rule = match client.waf_whiteblackip_rules().get(&policy_id, &id).await {
            Ok(rule) => rule,
            Err(e) => return check_deleted(e, "Waf WhiteBlackIP Rule"),
        };

        let mut new_state = state.clone();
        let _ = new_state.set_string(&AttributePath::new("id"), rule.id);
        let _ = new_state.set_string(&AttributePath::new("addr"), rule.addr);
        let _ = new_state.set_number(&AttributePath::new("white"), rule.white as f64);
        if !rule.policy_id.is_empty() {
            let _ = new_state.set_string(&AttributePath::new("policy_id"), rule.policy_id);
        }
        Ok(Some(new_state))
    }
}

#[async_trait]
impl Resource for WafWhiteBlackIpRuleV1Resource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_waf_whiteblackip_rule_v1"
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
            .description("Manages a WAF blacklist and whitelist rule")
            .create_timeout(Duration::from_secs(10 * 60))
            .delete_timeout(Duration::from_secs(10 * 60))
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("policy_id", AttributeType::String)
                    .description("The WAF policy ID")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("addr", AttributeType::String)
                    .description("IP address or range, e.g. 192.168.0.125 or 192.168.0.0/24")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("white", AttributeType::Number)
                    .description("0 blocks the address, 1 allows it")
                    .optional()
                    .default(StaticDefault::number(0.0))
                    .validator(NumberRangeValidator::int_between(0, 1))
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

        let policy_id = request
            .config
            .get_string(&AttributePath::new("policy_id"))
            .unwrap_or_default();
        let create_request = CreateWhiteBlackIpRuleRequest {
            addr: request
                .config
                .get_string(&AttributePath::new("addr"))
                .unwrap_or_default(),
            white: request
                .planned_state
                .get_i64(&AttributePath::new("white"))
                .unwrap_or(0),
        };

        let rule = match client
            .waf_whiteblackip_rules()
            .create(&policy_id, &create_request)
            .await
        {
            Ok(rule) => rule,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating OpenTelekomCloud WAF WhiteBlackIP Rule",
                    e.to_string(),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::debug!(?rule, "Waf whiteblackip rule created");

        let mut state = request.config.clone();
        let _ = state.set_string(&AttributePath::new("id"), rule.id);

        match self.read_rule(provider_data, &state).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud Waf WhiteBlackIP Rule",
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
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(provider_not_configured());
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let planned_addr = request.planned_state.get_string(&AttributePath::new("addr")).ok();
        let planned_white = request.planned_state.get_i64(&AttributePath::new("white")).ok();
        let prior_addr = request.prior_state.get_string(&AttributePath::new("addr")).ok();
        let prior_white = request.prior_state.get_i64(&AttributePath::new("white")).ok();

        let mut update_request = UpdateWhiteBlackIpRuleRequest::default();
        if planned_addr != prior_addr || planned_white != prior_white {
            update_request.addr = planned_addr;
            update_request.white = Some(planned_white.unwrap_or(0));
        }
        tracing::debug!(?update_request, "updateOpts");

        let mut state = request.config.clone();
        let _ = state.set_string(
            &AttributePath::new("id"),
            request
                .prior_state
                .get_string(&AttributePath::new("id"))
                .unwrap_or_default(),
        );

        if !update_request.is_empty() {
            let client = match waf_client(provider_data, &state) {
                Ok(client) => client,
                Err(diag) => {
                    diagnostics.push(diag);
                    return UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics,
                    };
                }
            };
            let (policy_id, id) = rule_ids(&state);
            if let Err(e) = client
                .waf_whiteblackip_rules()
                .update(
                    &policy_id.unwrap_or_default(),
                    &id.unwrap_or_default(),
                    &update_request,
                )
                .await
            {
                diagnostics.push(Diagnostic::error(
                    "Error updating OpenTelekomCloud WAF WhiteBlackIP Rule",
                    e.to_string(),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        match self.read_rule(provider_data, &state).await {
            Ok(Some(new_state)) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud Waf WhiteBlackIP Rule",
                    "The rule disappeared during the update",
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
            Err(diag) => {
                diagnostics.push(diag);
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
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

        match client.waf_whiteblackip_rules().delete(&policy_id, &id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "WAF WhiteBlackIP Rule already deleted");
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Error deleting OpenTelekomCloud WAF WhiteBlackIP Rule",
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
impl ResourceWithImportState for WafWhiteBlackIpRuleV1Resource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_policy_rule(&ctx, &request)
    }
}

#[async_trait]
impl ResourceWithConfigure for WafWhiteBlackIpRuleV1Resource {
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
#[path = "./resource_whiteblackip_rule_v1_test.rs"]
mod resource_whiteblackip_rule_v1_test;
