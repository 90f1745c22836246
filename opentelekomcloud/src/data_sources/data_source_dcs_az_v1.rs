//! DCS available zone data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::dcs::{AvailableZone, AvailableZones};
use crate::common::{provider_not_configured, string_attr};
use crate::provider_data::OtcProviderData;

#[derive(Default)]
pub struct DcsAzV1DataSource {
    provider_data: Option<OtcProviderData>,
}

impl DcsAzV1DataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Available zones of `region` matching the optional name and port
fn filter_zones<'a>(
    zones: &'a AvailableZones,
    region: &str,
    name: Option<&str>,
    port: Option<&str>,
) -> Vec<&'a AvailableZone> {
    if zones.region_id != region {
        return vec![];
    }
    zones
        .available_zones
        .iter()
        .filter(|az| az.resource_availability == "true")
        .filter(|az| name.map_or(true, |n| az.name == n))
        .filter(|az| port.map_or(true, |p| az.port == p))
        .collect()
}

#[async_trait]
impl DataSource for DcsAzV1DataSource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_dcs_az_v1"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets an available zone for DCS instances")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the available zone")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("code", AttributeType::String)
                    .description("Code of the available zone")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::String)
                    .description("Port number of the available zone")
                    .optional()
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(provider_not_configured());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let region = provider_data.config.get_region(&request.config);
        let client = match provider_data.config.dcs_v1_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating dcs key client",
                    e.to_string(),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let zones = match client.dcs_available_zones().get().await {
            Ok(zones) => zones,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to list DCS available zones",
                    format!("API error: {}", e),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };
        tracing::debug!(?zones, "Dcs az");

        let name = string_attr(&request.config, "name");
        let port = string_attr(&request.config, "port");
        let filtered = filter_zones(&zones, &region, name.as_deref(), port.as_deref());

        let az = match filtered.first() {
            Some(az) => *az,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Not found any available zones",
                    format!("No available DCS zone in region {} matches the filters", region),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let mut state = request.config.clone();
        let _ = state.set_string(&AttributePath::new("id"), az.id.clone());
        let _ = state.set_string(&AttributePath::new("code"), az.code.clone());
        let _ = state.set_string(&AttributePath::new("name"), az.name.clone());
        let _ = state.set_string(&AttributePath::new("port"), az.port.clone());

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for DcsAzV1DataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
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
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
