//! Compute server group resource

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::compute::CreateServerGroupRequest;
use crate::common::{check_deleted, map_value_specs, provider_not_configured};
use crate::provider_data::OtcProviderData;

#[derive(Default)]
pub struct ComputeServerGroupV2Resource {
    provider_data: Option<OtcProviderData>,
}

impl ComputeServerGroupV2Resource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_server_group(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let id = state
            .get_string(&AttributePath::new("id"))
            .map_err(|_| Diagnostic::error("Missing id", "The server group has no id in state"))?;
        let region = provider_data.config.get_region(state);
        let client = provider_data
            .config
            .compute_v2_client(&region)
            .map_err(|e| {
                Diagnostic::error(
                    "Error creating OpenTelekomCloud compute client",
                    e.to_string(),
                )
            })?;

        let group = match client.server_groups().get(&id).await {
            Ok(group) => group,
            Err(e) => return check_deleted(e, "server group"),
        };
        tracing::debug!(id = %group.id, "Retrieved server group");

        let mut new_state = state.clone();
        let _ = new_state.set_string(&AttributePath::new("name"), group.name);
        let _ = new_state.set(
            &AttributePath::new("policies"),
            Dynamic::string_list(&group.policies),
        );
        let _ = new_state.set(
            &AttributePath::new("members"),
            Dynamic::string_list(&group.members),
        );
        let _ = new_state.set_string(&AttributePath::new("region"), region);
        Ok(Some(new_state))
    }
}

#[async_trait]
impl Resource for ComputeServerGroupV2Resource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_compute_servergroup_v2"
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
            .description("Manages a V2 Server Group resource within OpenTelekomCloud")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The ID of the server group")
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("A unique name for the server group")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("policies", AttributeType::list_of(AttributeType::String))
                    .description("The set of policies for the server group, e.g. affinity")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("members", AttributeType::list_of(AttributeType::String))
                    .description("The instances that are part of this server group")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value_specs", AttributeType::map_of(AttributeType::String))
                    .optional()
                    .force_new()
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

        let region = provider_data.config.get_region(&request.config);
        let client = match provider_data.config.compute_v2_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating OpenTelekomCloud compute client",
                    e.to_string(),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let create_request = CreateServerGroupRequest {
            name: request
                .config
                .get_string(&AttributePath::new("name"))
                .unwrap_or_default(),
            policies: request
                .config
                .get_string_list(&AttributePath::new("policies"))
                .unwrap_or_default(),
            value_specs: map_value_specs(&request.config),
        };
        tracing::debug!(?create_request, "Create Options");

        let group = match client.server_groups().create(&create_request).await {
            Ok(group) => group,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating OpenTelekomCloud server group",
                    e.to_string(),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        tracing::info!(id = %group.id, "Created server group");

        let mut state = request.config.clone();
        let _ = state.set_string(&AttributePath::new("id"), group.id);

        match self.read_server_group(provider_data, &state).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud server group",
                    "The server group disappeared right after creation",
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

        match self
            .read_server_group(provider_data, &request.current_state)
            .await
        {
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
        // Every configurable attribute forces a new group
        UpdateResourceResponse {
            new_state: request.planned_state,
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

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => return DeleteResourceResponse { diagnostics },
        };

        let region = provider_data.config.get_region(&request.prior_state);
        let client = match provider_data.config.compute_v2_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating OpenTelekomCloud compute client",
                    e.to_string(),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        };

        tracing::debug!(id = %id, "Deleting server group");
        match client.server_groups().delete(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "Server group already deleted");
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Error deleting OpenTelekomCloud server group",
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
impl ResourceWithImportState for ComputeServerGroupV2Resource {
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
impl ResourceWithConfigure for ComputeServerGroupV2Resource {
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
#[path = "./resource_servergroup_v2_test.rs"]
mod resource_servergroup_v2_test;
