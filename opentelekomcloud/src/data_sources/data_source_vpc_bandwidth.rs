//! Shared bandwidth data source

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
use tfplug::validator::NumberRangeValidator;

use crate::api::vpc::{Bandwidth, ListBandwidthsOpts};
use crate::common::{provider_not_configured, string_attr};
use crate::provider_data::OtcProviderData;

#[derive(Default)]
pub struct VpcBandwidthDataSource {
    provider_data: Option<OtcProviderData>,
}

impl VpcBandwidthDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Picks the bandwidth by name, then by size when one is given
fn select_bandwidth(
    bandwidths: Vec<Bandwidth>,
    name: &str,
    size: Option<i64>,
) -> Result<Bandwidth, String> {
    if bandwidths.is_empty() {
        return Err("no OpenTelekomCloud bandwidth was found".to_string());
    }

    let mut by_name = bandwidths.into_iter().filter(|bw| bw.name == name).peekable();
    if by_name.peek().is_none() {
        return Err(format!(
            "no OpenTelekomCloud bandwidth was found by name: {}",
            name
        ));
    }

    match size {
        Some(size) => by_name
            .find(|bw| bw.size == size)
            .ok_or_else(|| format!("no OpenTelekomCloud bandwidth was found by size: {}", size)),
        None => by_name
            .next()
            .ok_or_else(|| format!("no OpenTelekomCloud bandwidth was found by name: {}", name)),
    }
}

#[async_trait]
impl DataSource for VpcBandwidthDataSource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_vpc_bandwidth"
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
        let computed = |name: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .computed()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Gets a shared bandwidth")
            .attribute(computed("id"))
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the bandwidth")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Size of the bandwidth in Mbit/s")
                    .optional()
                    .validator(NumberRangeValidator::int_between(5, 2000))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_project_id", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(computed("share_type"))
            .attribute(computed("bandwidth_type"))
            .attribute(computed("charge_mode"))
            .attribute(computed("status"))
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
        let client = match provider_data.config.vpc_v1_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "error creating OpenTelekomCloud vpc client",
                    e.to_string(),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let opts = ListBandwidthsOpts {
            share_type: Some("WHOLE".to_string()),
            enterprise_project_id: string_attr(&request.config, "enterprise_project_id"),
        };
        let bandwidths = match client.bandwidths().list(&opts).await {
            Ok(bandwidths) => bandwidths,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "unable to list OpenTelekomCloud bandwidths",
                    e.to_string(),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let name = request
            .config
            .get_string(&AttributePath::new("name"))
            .unwrap_or_default();
        let size = request.config.get_i64(&AttributePath::new("size")).ok();

        let result = match select_bandwidth(bandwidths, &name, size) {
            Ok(result) => result,
            Err(message) => {
                diagnostics.push(Diagnostic::error(message, ""));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };
        tracing::debug!(id = %result.id, ?result, "Retrieved OpenTelekomCloud bandwidth");

        let mut state = request.config.clone();
        let _ = state.set_string(&AttributePath::new("id"), result.id);
        let _ = state.set_string(&AttributePath::new("region"), region);
        let _ = state.set_string(&AttributePath::new("name"), result.name);
        let _ = state.set_number(&AttributePath::new("size"), result.size as f64);
        let _ = state.set_string(&AttributePath::new("share_type"), result.share_type);
        let _ = state.set_string(&AttributePath::new("bandwidth_type"), result.bandwidth_type);
        let _ = state.set_string(&AttributePath::new("charge_mode"), result.charge_mode);
        let _ = state.set_string(&AttributePath::new("status"), result.status);
        if let Some(project) = result.enterprise_project_id {
            let _ = state.set_string(&AttributePath::new("enterprise_project_id"), project);
        }

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for VpcBandwidthDataSource {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn bandwidth(id: &str, name: &str, size: i64) -> Bandwidth {
        Bandwidth {
            id: id.to_string(),
            name: name.to_string(),
            size,
            share_type: "WHOLE".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_by_name_then_size() {
        let all = vec![
            bandwidth("a", "other", 10),
            bandwidth("b", "shared", 10),
            bandwidth("c", "shared", 20),
        ];
        assert_eq!(select_bandwidth(all.clone(), "shared", None).unwrap().id, "b");
        assert_eq!(select_bandwidth(all.clone(), "shared", Some(20)).unwrap().id, "c");
        assert_eq!(
            select_bandwidth(all.clone(), "shared", Some(30)).unwrap_err(),
            "no OpenTelekomCloud bandwidth was found by size: 30"
        );
        assert_eq!(
            select_bandwidth(all, "missing", None).unwrap_err(),
            "no OpenTelekomCloud bandwidth was found by name: missing"
        );
        assert_eq!(
            select_bandwidth(vec![], "shared", None).unwrap_err(),
            "no OpenTelekomCloud bandwidth was found"
        );
    }
}
