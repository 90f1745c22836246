//! LBaaS v2 pool resource

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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
use tfplug::retry::{retry_with_min_wait, RetryableError};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringInSliceValidator;

use super::wait_for_load_balancer;
use crate::api::elb::{CreatePoolRequest, Pool, SessionPersistence, UpdatePoolRequest};
use crate::api::{ApiError, Client};
use crate::common::{check_deleted, provider_not_configured, string_attr};
use crate::provider_data::OtcProviderData;

const TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// 409 while the balancer is busy, 5xx while the service settles
fn retryable(err: &ApiError) -> bool {
    matches!(err.status(), Some(409) | Some(500) | Some(503))
}

fn persistence(config: &DynamicValue) -> Option<SessionPersistence> {
    let block = AttributePath::new("persistence").index(0);
    let persistence_type = config
        .get_string(&block.clone().attribute("type"))
        .ok()
        .filter(|t| !t.is_empty())?;
    let cookie_name = config
        .get_string(&block.attribute("cookie_name"))
        .ok()
        .filter(|c| !c.is_empty());
    Some(SessionPersistence {
        persistence_type,
        cookie_name,
    })
}

/// A configured value that is neither null nor unknown
fn is_set(config: &DynamicValue, path: &AttributePath) -> Option<bool> {
    match config.get(path) {
        Some(value) if value.is_unknown() => None,
        Some(value) => Some(!value.is_zero()),
        None => Some(false),
    }
}

#[derive(Default)]
pub struct LbPoolV2Resource {
    provider_data: Option<OtcProviderData>,
}

impl LbPoolV2Resource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, provider_data: &OtcProviderData, region: &str) -> Result<Client, Diagnostic> {
        provider_data.config.elb_v2_client(region).map_err(|e| {
            Diagnostic::error(
                "Error creating OpenTelekomCloud networking client",
                e.to_string(),
            )
        })
    }

    async fn read_pool(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let id = state
            .get_string(&AttributePath::new("id"))
            .map_err(|_| Diagnostic::error("Missing id", "The pool has no id in state"))?;
        let region = provider_data.config.get_region(state);
        let client = self.client(provider_data, &region)?;

        let pool = match client.lb_pools().get(&id).await {
            Ok(pool) => pool,
            Err(e) => return check_deleted(e, "pool"),
        };
        tracing::debug!(id = %pool.id, "Retrieved pool");

        let mut new_state = state.clone();
        let _ = new_state.set_string(&AttributePath::new("tenant_id"), pool.tenant_id);
        let _ = new_state.set_string(&AttributePath::new("name"), pool.name);
        let _ = new_state.set_string(&AttributePath::new("description"), pool.description);
        let _ = new_state.set_string(&AttributePath::new("protocol"), pool.protocol);
        let _ = new_state.set_string(&AttributePath::new("lb_method"), pool.lb_algorithm);
        let _ = new_state.set_bool(&AttributePath::new("admin_state_up"), pool.admin_state_up);
        let persistence = match pool.session_persistence {
            Some(p) => vec![Dynamic::Map(
                [
                    ("type".to_string(), Dynamic::String(p.persistence_type)),
                    (
                        "cookie_name".to_string(),
                        p.cookie_name.map(Dynamic::String).unwrap_or(Dynamic::Null),
                    ),
                ]
                .into_iter()
                .collect(),
            )],
            None => vec![],
        };
        let _ = new_state.set_list(&AttributePath::new("persistence"), persistence);
        let _ = new_state.set_string(&AttributePath::new("region"), region);
        Ok(Some(new_state))
    }

    /// The balancer owning the pool: configured directly, or through the
    /// listener the pool was attached to
    async fn load_balancer_id(
        &self,
        client: &Client,
        state: &DynamicValue,
        pool: Option<&Pool>,
    ) -> Result<Option<String>, ApiError> {
        if let Some(id) = string_attr(state, "loadbalancer_id") {
            return Ok(Some(id));
        }
        let fetched;
        let pool = match pool {
            Some(pool) => pool,
            None => match string_attr(state, "id") {
                Some(id) => {
                    fetched = client.lb_pools().get(&id).await?;
                    &fetched
                }
                None => return Ok(None),
            },
        };
        Ok(pool.loadbalancers.first().map(|lb| lb.id.clone()))
    }

    async fn wait_active(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        client: &Client,
        lb_id: Option<&str>,
    ) -> Result<(), Diagnostic> {
        let Some(lb_id) = lb_id else {
            return Ok(());
        };
        wait_for_load_balancer(ctx, client, provider_data.poll, lb_id, TIMEOUT)
            .await
            .map_err(|e| {
                Diagnostic::error(
                    "Error waiting for load balancer to become ACTIVE",
                    e.to_string(),
                )
            })
    }

    async fn create_pool(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        config: &DynamicValue,
        planned: &DynamicValue,
        region: &str,
    ) -> Result<String, Diagnostic> {
        let client = self.client(provider_data, region)?;
        let lb_id = string_attr(config, "loadbalancer_id");

        let request = CreatePoolRequest {
            tenant_id: string_attr(config, "tenant_id"),
            name: string_attr(config, "name"),
            description: string_attr(config, "description"),
            protocol: string_attr(config, "protocol").unwrap_or_default(),
            loadbalancer_id: lb_id.clone(),
            listener_id: string_attr(config, "listener_id"),
            lb_algorithm: string_attr(config, "lb_method").unwrap_or_default(),
            session_persistence: persistence(config),
            admin_state_up: planned
                .get_bool(&AttributePath::new("admin_state_up"))
                .unwrap_or(true),
        };
        tracing::debug!(?request, "Create Options");

        self.wait_active(ctx, provider_data, &client, lb_id.as_deref())
            .await?;

        let pool = retry_with_min_wait(ctx, TIMEOUT, provider_data.poll.retry_min_wait(), || async {
            client.lb_pools().create(&request).await.map_err(|e| {
                if retryable(&e) {
                    tracing::debug!(error = %e, "Retrying pool creation");
                    RetryableError::retryable(e)
                } else {
                    RetryableError::non_retryable(e)
                }
            })
        })
        .await
        .map_err(|e| Diagnostic::error("Error creating pool", e.to_string()))?;
        tracing::info!(id = %pool.id, "Pool created");

        let owner = lb_id.or_else(|| pool.loadbalancers.first().map(|lb| lb.id.clone()));
        self.wait_active(ctx, provider_data, &client, owner.as_deref())
            .await?;
        Ok(pool.id)
    }

    async fn update_pool(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<(), Diagnostic> {
        let id = prior
            .get_string(&AttributePath::new("id"))
            .map_err(|_| Diagnostic::error("Missing id", "The pool has no id in state"))?;
        let region = provider_data.config.get_region(prior);
        let client = self.client(provider_data, &region)?;

        let changed = |name: &str| {
            let path = AttributePath::new(name);
            prior.get(&path) != planned.get(&path)
        };
        let mut request = UpdatePoolRequest::default();
        if changed("lb_method") {
            request.lb_algorithm = string_attr(planned, "lb_method");
        }
        if changed("name") {
            request.name = Some(string_attr(planned, "name").unwrap_or_default());
        }
        if changed("description") {
            request.description = Some(string_attr(planned, "description").unwrap_or_default());
        }
        if changed("admin_state_up") {
            request.admin_state_up = planned.get_bool(&AttributePath::new("admin_state_up")).ok();
        }
        tracing::debug!(?request, "Updating pool");

        let lb_id = self
            .load_balancer_id(&client, prior, None)
            .await
            .map_err(|e| Diagnostic::error("Error retrieving pool", e.to_string()))?;
        self.wait_active(ctx, provider_data, &client, lb_id.as_deref())
            .await?;

        retry_with_min_wait(ctx, TIMEOUT, provider_data.poll.retry_min_wait(), || async {
            client.lb_pools().update(&id, &request).await.map_err(|e| {
                if retryable(&e) {
                    RetryableError::retryable(e)
                } else {
                    RetryableError::non_retryable(e)
                }
            })
        })
        .await
        .map_err(|e| Diagnostic::error(format!("Unable to update pool {}", id), e.to_string()))?;

        self.wait_active(ctx, provider_data, &client, lb_id.as_deref())
            .await
    }

    async fn delete_pool(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        prior: &DynamicValue,
    ) -> Result<(), Diagnostic> {
        let Some(id) = string_attr(prior, "id") else {
            return Ok(());
        };
        let region = provider_data.config.get_region(prior);
        let client = self.client(provider_data, &region)?;

        let lb_id = match self.load_balancer_id(&client, prior, None).await {
            Ok(lb_id) => lb_id,
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "Pool already deleted");
                return Ok(());
            }
            Err(e) => return Err(Diagnostic::error("Error retrieving pool", e.to_string())),
        };
        self.wait_active(ctx, provider_data, &client, lb_id.as_deref())
            .await?;

        let deleted = retry_with_min_wait(ctx, TIMEOUT, provider_data.poll.retry_min_wait(), || async {
            match client.lb_pools().delete(&id).await {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(id = %id, "Pool already deleted");
                    Ok(())
                }
                Err(e) if retryable(&e) => Err(RetryableError::retryable(e)),
                Err(e) => Err(RetryableError::non_retryable(e)),
            }
        })
        .await;
        if let Err(e) = deleted {
            return Err(Diagnostic::error("Unable to delete pool", e.to_string()));
        }

        self.wait_active(ctx, provider_data, &client, lb_id.as_deref())
            .await
    }
}

#[async_trait]
impl Resource for LbPoolV2Resource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_lb_pool_v2"
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
            .description("Manages a V2 pool resource within OpenTelekomCloud")
            .create_timeout(TIMEOUT)
            .update_timeout(TIMEOUT)
            .delete_timeout(TIMEOUT)
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
                AttributeBuilder::new("tenant_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("protocol", AttributeType::String)
                    .required()
                    .force_new()
                    .validator(StringInSliceValidator::create(&["TCP", "UDP", "HTTP"], false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("loadbalancer_id", AttributeType::String)
                    .description("Exactly one of loadbalancer_id and listener_id must be set")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("listener_id", AttributeType::String)
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("lb_method", AttributeType::String)
                    .required()
                    .validator(StringInSliceValidator::create(
                        &["ROUND_ROBIN", "LEAST_CONNECTIONS", "SOURCE_IP"],
                        false,
                    ))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("admin_state_up", AttributeType::Bool)
                    .optional()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("persistence", NestingMode::List)
                    .max_items(1)
                    .force_new()
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .required()
                            .validator(StringInSliceValidator::create(
                                &["SOURCE_IP", "HTTP_COOKIE", "APP_COOKIE"],
                                false,
                            ))
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("cookie_name", AttributeType::String)
                            .description("Required when type is APP_COOKIE")
                            .optional()
                            .build(),
                    )
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let config = &request.config;

        let lb = is_set(config, &AttributePath::new("loadbalancer_id"));
        let listener = is_set(config, &AttributePath::new("listener_id"));
        if let (Some(lb), Some(listener)) = (lb, listener) {
            if lb == listener {
                diagnostics.push(Diagnostic::error(
                    "Invalid pool configuration",
                    "Exactly one of loadbalancer_id and listener_id must be specified",
                ));
            }
        }

        let block = AttributePath::new("persistence").index(0);
        let persistence_type = config.get_string(&block.clone().attribute("type")).ok();
        let cookie = is_set(config, &block.clone().attribute("cookie_name"));
        if persistence_type.as_deref() == Some("APP_COOKIE") && cookie == Some(false) {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid pool persistence",
                    "persistence.cookie_name must be specified when persistence.type is APP_COOKIE",
                )
                .with_attribute(block.attribute("cookie_name")),
            );
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        ctx: Context,
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
            .create_pool(&ctx, provider_data, &request.config, &request.planned_state, &region)
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

        match self.read_pool(provider_data, &state).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud pool",
                    "The pool disappeared right after creation",
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

        match self.read_pool(provider_data, &request.current_state).await {
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

        if let Err(diag) = self
            .update_pool(&ctx, provider_data, &request.prior_state, &request.planned_state)
            .await
        {
            diagnostics.push(diag);
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        match self.read_pool(provider_data, &request.planned_state).await {
            Ok(Some(new_state)) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud pool",
                    "The pool disappeared during the update",
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
        ctx: Context,
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

        if let Err(diag) = self
            .delete_pool(&ctx, provider_data, &request.prior_state)
            .await
        {
            diagnostics.push(diag);
        }
        DeleteResourceResponse { diagnostics }
    }

    fn importer(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for LbPoolV2Resource {
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
impl ResourceWithConfigure for LbPoolV2Resource {
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
