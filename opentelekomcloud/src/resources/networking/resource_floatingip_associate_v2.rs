//! Association of a floating IP with a Neutron port

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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::IpAddressValidator;

use crate::api::networking::ListFloatingIpsOpts;
use crate::api::Client;
use crate::common::{check_deleted, provider_not_configured, string_attr};
use crate::provider_data::OtcProviderData;

#[derive(Default)]
pub struct FloatingIpAssociateV2Resource {
    provider_data: Option<OtcProviderData>,
}

impl FloatingIpAssociateV2Resource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, provider_data: &OtcProviderData, region: &str) -> Result<Client, Diagnostic> {
        provider_data.config.networking_v2_client(region).map_err(|e| {
            Diagnostic::error(
                "Error creating OpenTelekomCloud network client",
                e.to_string(),
            )
        })
    }

    async fn read_association(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let id = state.get_string(&AttributePath::new("id")).map_err(|_| {
            Diagnostic::error("Missing id", "The floating IP association has no id in state")
        })?;
        let region = provider_data.config.get_region(state);
        let client = self.client(provider_data, &region)?;

        let fip = match client.floating_ips().get(&id).await {
            Ok(fip) => fip,
            Err(e) => return check_deleted(e, "floating IP"),
        };
        tracing::debug!(id = %fip.id, port_id = ?fip.port_id, "Retrieved floating IP");

        let mut new_state = state.clone();
        let _ = new_state.set_string(&AttributePath::new("floating_ip"), fip.floating_ip_address);
        let _ = new_state.set_string(
            &AttributePath::new("port_id"),
            fip.port_id.unwrap_or_default(),
        );
        let _ = new_state.set_string(&AttributePath::new("region"), region);
        Ok(Some(new_state))
    }

    async fn associate(
        &self,
        provider_data: &OtcProviderData,
        config: &DynamicValue,
        region: &str,
    ) -> Result<String, Diagnostic> {
        let client = self.client(provider_data, region)?;
        let address = string_attr(config, "floating_ip").unwrap_or_default();
        let port_id = string_attr(config, "port_id").unwrap_or_default();

        let fips = client
            .floating_ips()
            .list(&ListFloatingIpsOpts {
                floating_ip_address: Some(address.clone()),
                port_id: None,
            })
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("Unable to get ID of floating IP {}", address),
                    e.to_string(),
                )
            })?;
        let fip = fips
            .into_iter()
            .find(|fip| fip.floating_ip_address == address)
            .ok_or_else(|| {
                Diagnostic::error(
                    format!("Unable to get ID of floating IP {}", address),
                    "No floating IP with this address was found",
                )
            })?;

        tracing::debug!(id = %fip.id, port_id = %port_id, "Associating floating IP");
        client
            .floating_ips()
            .set_port(&fip.id, Some(&port_id))
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("Error associating floating IP {} to port {}", address, port_id),
                    e.to_string(),
                )
            })?;
        Ok(fip.id)
    }
}

#[async_trait]
impl Resource for FloatingIpAssociateV2Resource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_networking_floatingip_associate_v2"
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
            .description("Associates a floating IP to a port")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
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
                AttributeBuilder::new("floating_ip", AttributeType::String)
                    .required()
                    .force_new()
                    .validator(IpAddressValidator::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port_id", AttributeType::String)
                    .required()
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
        let id = match self
            .associate(provider_data, &request.config, &region)
            .await
        {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut state = request.planned_state.clone();
        let _ = state.set_string(&AttributePath::new("id"), id);

        match self.read_association(provider_data, &state).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud floating IP",
                    "The floating IP disappeared right after association",
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
            .read_association(provider_data, &request.current_state)
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
        // Every attribute forces replacement
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

        let Some(id) = string_attr(&request.prior_state, "id") else {
            return DeleteResourceResponse { diagnostics };
        };
        let region = provider_data.config.get_region(&request.prior_state);
        let client = match self.client(provider_data, &region) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.floating_ips().set_port(&id, None).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "Floating IP already deleted");
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                format!("Error disassociating floating IP {}", id),
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
impl ResourceWithImportState for FloatingIpAssociateV2Resource {
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
impl ResourceWithConfigure for FloatingIpAssociateV2Resource {
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
