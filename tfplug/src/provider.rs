//! Provider trait and related types
//!
//! A provider owns its configuration schema, builds the shared provider data
//! (API clients, credentials) and hands out resource and data source
//! instances through factory maps.

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory creating an unconfigured resource instance
pub type ResourceFactory = fn() -> Box<dyn ResourceWithConfigure>;

/// Factory creating an unconfigured data source instance
pub type DataSourceFactory = fn() -> Box<dyn DataSourceWithConfigure>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name, the prefix of every resource type name
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    /// Schema of the `provider` block
    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Called once with the provider block (defaults already applied).
    /// provider_data in the response is passed to every resource and data source.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Resource factories keyed by type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Data source factories keyed by type name
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub version: String,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
