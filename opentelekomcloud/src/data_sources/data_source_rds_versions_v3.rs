//! RDS v3 datastore versions data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringInSliceValidator;

use crate::common::{provider_not_configured, sort_versions};
use crate::provider_data::OtcProviderData;

pub const DATABASE_NAMES: &[&str] = &["MySQL", "PostgreSQL", "SQLServer"];

#[derive(Default)]
pub struct RdsVersionsV3DataSource {
    provider_data: Option<OtcProviderData>,
}

impl RdsVersionsV3DataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for RdsVersionsV3DataSource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_rds_versions_v3"
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
            .description("Lists the engine versions available for RDS v3 instances")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("database_name", AttributeType::String)
                    .description("Database engine: MySQL, PostgreSQL or SQLServer")
                    .required()
                    .validator(StringInSliceValidator::create(DATABASE_NAMES, true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("versions", AttributeType::list_of(AttributeType::String))
                    .description("Available versions, newest first")
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
        let client = match provider_data.config.rds_v3_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error creating OpenTelekomCloud RDSv3 client",
                    e.to_string(),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let database_name = request
            .config
            .get_string(&AttributePath::new("database_name"))
            .unwrap_or_default();

        let stores = match client.rds_v3().list_datastores(&database_name).await {
            Ok(stores) => stores,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error listing RDS datastore versions",
                    e.to_string(),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let mut versions: Vec<String> = stores.into_iter().map(|store| store.name).collect();
        sort_versions(&mut versions);
        tracing::debug!(database = %database_name, ?versions, "Retrieved RDS versions");

        let mut state = request.config.clone();
        let _ = state.set_string(
            &AttributePath::new("id"),
            format!("{}_versions", database_name),
        );
        let _ = state.set(
            &AttributePath::new("versions"),
            Dynamic::string_list(&versions),
        );

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for RdsVersionsV3DataSource {
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
