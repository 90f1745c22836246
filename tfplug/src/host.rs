//! In-process provider host
//!
//! `ProviderHost` drives a provider through the same lifecycle Terraform
//! would: configure the provider, validate and plan configuration, apply the
//! plan, refresh and import. States handed back are normalized against the
//! schema so every attribute is present (null when unset).

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan_modifier::values_equal;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderSchemaRequest, ResourceFactory,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ImportedResource, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    Block, DefaultRequest, NestedBlock, NestingMode, PlanModifier, PlanModifierRequest, Schema,
    ValidatorRequest,
};
use crate::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Operation timeout when a schema does not declare one
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(20 * 60);

const TERRAFORM_VERSION: &str = "1.5.7";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    NoOp,
    Create,
    Update,
    Replace,
    Delete,
}

#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub action: PlanAction,
    /// Null for deletes
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// None when the object no longer exists (deleted or failed create)
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ReadResult {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct DataSourceResult {
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderHost {
    provider: Box<dyn Provider>,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
}

impl ProviderHost {
    pub fn new(provider: impl Provider + 'static) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        Self {
            provider: Box::new(provider),
            provider_data: None,
            resources,
            data_sources,
        }
    }

    pub fn provider_type_name(&self) -> &str {
        self.provider.type_name()
    }

    pub fn resource_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.resources.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn data_source_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data_sources.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }

    /// Validate the provider block, fill env/static defaults and configure the
    /// provider. Provider data is kept for every resource created afterwards.
    pub async fn configure(&mut self, config: DynamicValue) -> Vec<Diagnostic> {
        let ctx = Context::new();
        let schema = self
            .provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await;
        let mut diagnostics = schema.diagnostics;
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let config = apply_defaults(&schema.schema.block, &config.value, &AttributePath::root());
        validate_block(
            &schema.schema.block,
            &config,
            &AttributePath::root(),
            &mut diagnostics,
        );
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let config = normalize(&schema.schema.block, &config);
        let response = self
            .provider
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: TERRAFORM_VERSION.to_string(),
                    config: DynamicValue::new(config),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        if !has_errors(&diagnostics) {
            self.provider_data = response.provider_data;
            tracing::debug!(provider = self.provider.type_name(), "Provider configured");
        }
        diagnostics
    }

    async fn resource(
        &self,
        type_name: &str,
    ) -> Result<(Box<dyn ResourceWithConfigure>, Schema), Vec<Diagnostic>> {
        let factory = self.resources.get(type_name).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unsupported resource type",
                format!("The provider does not support resource type '{}'", type_name),
            )]
        })?;

        let mut resource = factory();
        let ctx = Context::new();
        // Before the provider is configured only the schema is usable
        if let Some(provider_data) = &self.provider_data {
            let configured = resource
                .configure(
                    ctx.clone(),
                    ConfigureResourceRequest {
                        provider_data: Some(provider_data.clone()),
                    },
                )
                .await;
            if has_errors(&configured.diagnostics) {
                return Err(configured.diagnostics);
            }
        }

        let schema = resource.schema(ctx, ResourceSchemaRequest).await;
        if has_errors(&schema.diagnostics) {
            return Err(schema.diagnostics);
        }
        Ok((resource, schema.schema))
    }

    async fn data_source(
        &self,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceWithConfigure>, Schema), Vec<Diagnostic>> {
        let factory = self.data_sources.get(type_name).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unsupported data source",
                format!("The provider does not support data source '{}'", type_name),
            )]
        })?;

        let mut data_source = factory();
        let ctx = Context::new();
        // Before the provider is configured only the schema is usable
        if let Some(provider_data) = &self.provider_data {
            let configured = data_source
                .configure(
                    ctx.clone(),
                    ConfigureDataSourceRequest {
                        provider_data: Some(provider_data.clone()),
                    },
                )
                .await;
            if has_errors(&configured.diagnostics) {
                return Err(configured.diagnostics);
            }
        }

        let schema = data_source.schema(ctx, DataSourceSchemaRequest).await;
        if has_errors(&schema.diagnostics) {
            return Err(schema.diagnostics);
        }
        Ok((data_source, schema.schema))
    }

    pub async fn resource_schema(&self, type_name: &str) -> Result<Schema, Vec<Diagnostic>> {
        self.resource(type_name).await.map(|(_, schema)| schema)
    }

    pub async fn validate_resource_config(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Vec<Diagnostic> {
        let (resource, schema) = match self.resource(type_name).await {
            Ok(found) => found,
            Err(diagnostics) => return diagnostics,
        };

        let mut diagnostics = Vec::new();
        validate_block(
            &schema.block,
            &config.value,
            &AttributePath::root(),
            &mut diagnostics,
        );
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config: DynamicValue::new(normalize(&schema.block, &config.value)),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Vec<Diagnostic> {
        let (data_source, schema) = match self.data_source(type_name).await {
            Ok(found) => found,
            Err(diagnostics) => return diagnostics,
        };

        let mut diagnostics = Vec::new();
        validate_block(
            &schema.block,
            &config.value,
            &AttributePath::root(),
            &mut diagnostics,
        );
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let response = data_source
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: type_name.to_string(),
                    config: DynamicValue::new(normalize(&schema.block, &config.value)),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    /// Compute the change needed to move `prior` to `config`. A null config
    /// plans a delete, a null prior plans a create.
    pub async fn plan_resource(
        &self,
        type_name: &str,
        prior: &DynamicValue,
        config: &DynamicValue,
    ) -> PlannedChange {
        let schema = match self.resource_schema(type_name).await {
            Ok(schema) => schema,
            Err(diagnostics) => return failed_plan(prior, diagnostics),
        };

        if config.is_null() {
            let action = if prior.is_null() {
                PlanAction::NoOp
            } else {
                PlanAction::Delete
            };
            return PlannedChange {
                action,
                planned_state: DynamicValue::null(),
                requires_replace: Vec::new(),
                diagnostics: Vec::new(),
            };
        }

        let prior_value = if prior.is_null() {
            Dynamic::Null
        } else {
            normalize(&schema.block, &prior.value)
        };
        let config_value = normalize(&schema.block, &config.value);

        let mut scratch = PlanScratch::default();
        let planned = plan_block(
            &schema.block,
            &config_value,
            &prior_value,
            &AttributePath::root(),
            &mut scratch,
        );

        if prior_value.is_null() {
            return PlannedChange {
                action: PlanAction::Create,
                planned_state: DynamicValue::new(planned),
                requires_replace: Vec::new(),
                diagnostics: scratch.diagnostics,
            };
        }

        if !scratch.requires_replace.is_empty() {
            // Replacement plans the new object as if it were created fresh
            let mut fresh = PlanScratch::default();
            let planned = plan_block(
                &schema.block,
                &config_value,
                &Dynamic::Null,
                &AttributePath::root(),
                &mut fresh,
            );
            let mut diagnostics = scratch.diagnostics;
            diagnostics.extend(fresh.diagnostics);
            return PlannedChange {
                action: PlanAction::Replace,
                planned_state: DynamicValue::new(planned),
                requires_replace: scratch.requires_replace,
                diagnostics,
            };
        }

        let action = if semantically_equal(&planned, &prior_value) {
            PlanAction::NoOp
        } else {
            PlanAction::Update
        };

        PlannedChange {
            action,
            planned_state: DynamicValue::new(planned),
            requires_replace: Vec::new(),
            diagnostics: scratch.diagnostics,
        }
    }

    /// Carry out a planned change. Failed creates keep nothing, failed
    /// updates and deletes keep the prior state.
    pub async fn apply_resource(
        &self,
        type_name: &str,
        prior: &DynamicValue,
        change: &PlannedChange,
        config: &DynamicValue,
    ) -> ApplyResult {
        let keep_prior = || (!prior.is_null()).then(|| prior.clone());

        let (resource, schema) = match self.resource(type_name).await {
            Ok(found) => found,
            Err(diagnostics) => {
                return ApplyResult {
                    new_state: keep_prior(),
                    diagnostics,
                }
            }
        };
        let config = DynamicValue::new(normalize(&schema.block, &config.value));

        match change.action {
            PlanAction::NoOp => ApplyResult {
                new_state: keep_prior(),
                diagnostics: Vec::new(),
            },
            PlanAction::Create => {
                create(resource.as_ref(), &schema, type_name, change, config).await
            }
            PlanAction::Update => {
                let ctx = operation_context(schema.timeouts.update);
                tracing::info!(resource_type = type_name, "Updating resource");
                let response = resource
                    .update(
                        ctx,
                        UpdateResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior.clone(),
                            planned_state: change.planned_state.clone(),
                            config,
                        },
                    )
                    .await;
                let mut diagnostics = response.diagnostics;
                if has_errors(&diagnostics) {
                    return ApplyResult {
                        new_state: keep_prior(),
                        diagnostics,
                    };
                }
                let new_state = finalize_state(&schema.block, response.new_state, &mut diagnostics);
                ApplyResult {
                    new_state: new_state.or_else(keep_prior),
                    diagnostics,
                }
            }
            PlanAction::Delete => {
                let diagnostics = delete(resource.as_ref(), &schema, type_name, prior).await;
                let new_state = if has_errors(&diagnostics) {
                    keep_prior()
                } else {
                    None
                };
                ApplyResult {
                    new_state,
                    diagnostics,
                }
            }
            PlanAction::Replace => {
                let mut diagnostics = delete(resource.as_ref(), &schema, type_name, prior).await;
                if has_errors(&diagnostics) {
                    return ApplyResult {
                        new_state: keep_prior(),
                        diagnostics,
                    };
                }
                let created = create(resource.as_ref(), &schema, type_name, change, config).await;
                diagnostics.extend(created.diagnostics);
                ApplyResult {
                    new_state: created.new_state,
                    diagnostics,
                }
            }
        }
    }

    /// Refresh: read the remote object behind `state`
    pub async fn read_resource(&self, type_name: &str, state: &DynamicValue) -> ReadResult {
        let (resource, schema) = match self.resource(type_name).await {
            Ok(found) => found,
            Err(diagnostics) => {
                return ReadResult {
                    new_state: Some(state.clone()),
                    diagnostics,
                }
            }
        };

        let response = resource
            .read(
                operation_context(schema.timeouts.read),
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state: state.clone(),
                },
            )
            .await;

        let mut diagnostics = response.diagnostics;
        if has_errors(&diagnostics) {
            return ReadResult {
                new_state: Some(state.clone()),
                diagnostics,
            };
        }

        let new_state = match response.new_state {
            Some(new_state) => finalize_state(&schema.block, new_state, &mut diagnostics),
            None => {
                tracing::info!(resource_type = type_name, "Object no longer exists, removing from state");
                None
            }
        };
        ReadResult {
            new_state,
            diagnostics,
        }
    }

    /// Import by ID, then refresh every imported object
    pub async fn import_resource(&self, type_name: &str, id: &str) -> ImportResult {
        let (resource, _) = match self.resource(type_name).await {
            Ok(found) => found,
            Err(diagnostics) => {
                return ImportResult {
                    imported: Vec::new(),
                    diagnostics,
                }
            }
        };

        let importer = match resource.importer() {
            Some(importer) => importer,
            None => {
                return ImportResult {
                    imported: Vec::new(),
                    diagnostics: vec![Diagnostic::error(
                        "Resource Import Not Implemented",
                        format!("Resource type '{}' does not support import", type_name),
                    )],
                }
            }
        };

        let response = importer
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                },
            )
            .await;
        let mut diagnostics = response.diagnostics;
        if has_errors(&diagnostics) {
            return ImportResult {
                imported: Vec::new(),
                diagnostics,
            };
        }

        let mut imported = Vec::new();
        for candidate in response.imported_resources {
            let read = self.read_resource(&candidate.type_name, &candidate.state).await;
            diagnostics.extend(read.diagnostics);
            match read.new_state {
                Some(state) => imported.push(ImportedResource {
                    type_name: candidate.type_name,
                    state,
                }),
                None => diagnostics.push(Diagnostic::error(
                    "Cannot import non-existent remote object",
                    format!(
                        "While attempting to import an existing object to '{}', the provider \
                         detected that no object exists with the given id '{}'",
                        candidate.type_name, id
                    ),
                )),
            }
        }

        ImportResult {
            imported,
            diagnostics,
        }
    }

    pub async fn read_data_source(&self, type_name: &str, config: &DynamicValue) -> DataSourceResult {
        let mut diagnostics = self.validate_data_source_config(type_name, config).await;
        if has_errors(&diagnostics) {
            return DataSourceResult {
                state: DynamicValue::null(),
                diagnostics,
            };
        }

        let (data_source, schema) = match self.data_source(type_name).await {
            Ok(found) => found,
            Err(diagnostics) => {
                return DataSourceResult {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        };

        let response = data_source
            .read(
                operation_context(schema.timeouts.read),
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config: DynamicValue::new(normalize(&schema.block, &config.value)),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        if has_errors(&diagnostics) {
            return DataSourceResult {
                state: DynamicValue::null(),
                diagnostics,
            };
        }

        let state = finalize_state(&schema.block, response.state, &mut diagnostics)
            .unwrap_or_else(DynamicValue::null);
        DataSourceResult { state, diagnostics }
    }
}

async fn create(
    resource: &dyn ResourceWithConfigure,
    schema: &Schema,
    type_name: &str,
    change: &PlannedChange,
    config: DynamicValue,
) -> ApplyResult {
    tracing::info!(resource_type = type_name, "Creating resource");
    let response = resource
        .create(
            operation_context(schema.timeouts.create),
            CreateResourceRequest {
                type_name: type_name.to_string(),
                planned_state: change.planned_state.clone(),
                config,
            },
        )
        .await;

    let mut diagnostics = response.diagnostics;
    if has_errors(&diagnostics) {
        return ApplyResult {
            new_state: None,
            diagnostics,
        };
    }
    let new_state = finalize_state(&schema.block, response.new_state, &mut diagnostics);
    ApplyResult {
        new_state,
        diagnostics,
    }
}

async fn delete(
    resource: &dyn ResourceWithConfigure,
    schema: &Schema,
    type_name: &str,
    prior: &DynamicValue,
) -> Vec<Diagnostic> {
    tracing::info!(resource_type = type_name, "Deleting resource");
    resource
        .delete(
            operation_context(schema.timeouts.delete),
            DeleteResourceRequest {
                type_name: type_name.to_string(),
                prior_state: prior.clone(),
            },
        )
        .await
        .diagnostics
}

fn operation_context(timeout: Option<Duration>) -> Context {
    Context::new().with_timeout(timeout.unwrap_or(DEFAULT_OPERATION_TIMEOUT))
}

fn failed_plan(prior: &DynamicValue, diagnostics: Vec<Diagnostic>) -> PlannedChange {
    PlannedChange {
        action: PlanAction::NoOp,
        planned_state: prior.clone(),
        requires_replace: Vec::new(),
        diagnostics,
    }
}

/// Normalize a state returned by a handler and reject leftover unknowns
fn finalize_state(
    block: &Block,
    state: DynamicValue,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<DynamicValue> {
    if state.value.contains_unknown() {
        diagnostics.push(Diagnostic::error(
            "Provider produced inconsistent result after apply",
            "The returned state still contains unknown values",
        ));
        return None;
    }
    Some(DynamicValue::new(normalize(block, &state.value)))
}

#[derive(Default)]
struct PlanScratch {
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

fn field<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    match value {
        Dynamic::Map(map) => map.get(name).unwrap_or(&Dynamic::Null),
        _ => &Dynamic::Null,
    }
}

/// Fill every schema attribute and block so values compare structurally:
/// unset attributes become null, unset list/set blocks become empty lists
pub fn normalize(block: &Block, value: &Dynamic) -> Dynamic {
    let map = match value {
        Dynamic::Map(map) => map,
        Dynamic::Null => return Dynamic::Null,
        other => return other.clone(),
    };

    let mut out = map.clone();
    for attr in &block.attributes {
        out.entry(attr.name.clone()).or_insert(Dynamic::Null);
    }
    for nested in &block.block_types {
        let current = map.get(&nested.type_name).unwrap_or(&Dynamic::Null);
        let normalized = match (nested.nesting, current) {
            (NestingMode::Single, Dynamic::Null) => Dynamic::Null,
            (NestingMode::Single, item) => normalize(&nested.block, item),
            (_, Dynamic::List(items)) => Dynamic::List(
                items
                    .iter()
                    .map(|item| normalize(&nested.block, item))
                    .collect(),
            ),
            (_, Dynamic::Null) => Dynamic::List(Vec::new()),
            (_, other) => other.clone(),
        };
        out.insert(nested.type_name.clone(), normalized);
    }
    Dynamic::Map(out)
}

/// Fill null attributes that carry a default. Used for provider blocks,
/// where defaults are typically read from the environment.
fn apply_defaults(block: &Block, value: &Dynamic, path: &AttributePath) -> Dynamic {
    let mut out = match value {
        Dynamic::Map(map) => map.clone(),
        _ => HashMap::new(),
    };
    for attr in &block.attributes {
        let Some(default) = &attr.default else {
            continue;
        };
        if out.get(&attr.name).map_or(true, Dynamic::is_null) {
            let value = default
                .default_value(DefaultRequest {
                    path: path.clone().attribute(&attr.name),
                })
                .value
                .value;
            out.insert(attr.name.clone(), value);
        }
    }
    Dynamic::Map(out)
}

fn validate_block(
    block: &Block,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let map = match value {
        Dynamic::Map(map) => map,
        Dynamic::Null | Dynamic::Unknown => return,
        other => {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect block type",
                    format!("Expected an object, got {}", other.type_name()),
                )
                .with_attribute(path.clone()),
            );
            return;
        }
    };

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        if !block.has_field(key) {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("An argument named '{}' is not expected here", key),
                )
                .with_attribute(path.clone().attribute(key)),
            );
        }
    }

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let value = map.get(&attr.name).unwrap_or(&Dynamic::Null);

        if value.is_null() {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument '{}' is required, but no definition was found", attr.name),
                    )
                    .with_attribute(attr_path),
                );
            }
            continue;
        }

        if attr.computed && !attr.optional && !attr.required {
            diagnostics.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!("Can't configure a value for '{}': its value is decided by the provider", attr.name),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        if !attr.r#type.accepts(value) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!("Inappropriate value for attribute '{}': got {}", attr.name, value.type_name()),
                )
                .with_attribute(attr_path),
            );
            continue;
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(value.clone()),
                path: attr_path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    for nested in &block.block_types {
        validate_nested_block(nested, map.get(&nested.type_name), path, diagnostics);
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Dynamic>,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let block_path = path.clone().attribute(&nested.type_name);
    let items: Vec<&Dynamic> = match (nested.nesting, value) {
        (_, None) | (_, Some(Dynamic::Null)) => Vec::new(),
        (NestingMode::Single, Some(item)) => vec![item],
        (_, Some(Dynamic::List(items))) => items.iter().collect(),
        (_, Some(Dynamic::Map(_))) => value.into_iter().collect(),
        (_, Some(other)) => {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect block type",
                    format!("Block '{}' must be a list, got {}", nested.type_name, other.type_name()),
                )
                .with_attribute(block_path),
            );
            return;
        }
    };

    let count = items.len() as i64;
    if count < nested.min_items && !(nested.computed && count == 0) {
        diagnostics.push(
            Diagnostic::error(
                "Insufficient blocks",
                format!(
                    "At least {} '{}' block(s) are required",
                    nested.min_items, nested.type_name
                ),
            )
            .with_attribute(block_path.clone()),
        );
    }
    if nested.max_items > 0 && count > nested.max_items {
        diagnostics.push(
            Diagnostic::error(
                "Too many blocks",
                format!(
                    "No more than {} '{}' block(s) are allowed",
                    nested.max_items, nested.type_name
                ),
            )
            .with_attribute(block_path.clone()),
        );
    }

    for (idx, item) in items.into_iter().enumerate() {
        let item_path = match nested.nesting {
            NestingMode::Single => block_path.clone(),
            _ => block_path.clone().index(idx as i64),
        };
        validate_block(&nested.block, item, &item_path, diagnostics);
    }
}

fn plan_block(
    block: &Block,
    config: &Dynamic,
    prior: &Dynamic,
    path: &AttributePath,
    scratch: &mut PlanScratch,
) -> Dynamic {
    let mut planned = match config {
        Dynamic::Map(map) => map.clone(),
        _ => HashMap::new(),
    };

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let config_value = field(config, &attr.name).clone();
        let prior_value = field(prior, &attr.name).clone();

        let mut plan_value = config_value.clone();
        if plan_value.is_null() {
            if let Some(default) = &attr.default {
                plan_value = default
                    .default_value(DefaultRequest {
                        path: attr_path.clone(),
                    })
                    .value
                    .value;
            } else if attr.computed {
                plan_value = if prior.is_null() {
                    Dynamic::Unknown
                } else {
                    prior_value.clone()
                };
            }
        }

        let plan_value = run_modifiers(
            &attr.plan_modifiers,
            config_value,
            prior_value,
            plan_value,
            &attr_path,
            scratch,
        );
        planned.insert(attr.name.clone(), plan_value);
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let config_value = field(config, &nested.type_name).clone();
        let prior_value = field(prior, &nested.type_name).clone();

        let configured = !config_value.is_zero();
        let plan_value = if !configured && nested.computed {
            if prior.is_null() {
                Dynamic::Unknown
            } else {
                prior_value.clone()
            }
        } else {
            match (&config_value, nested.nesting) {
                (Dynamic::List(items), _) => Dynamic::List(
                    items
                        .iter()
                        .enumerate()
                        .map(|(idx, item)| {
                            let prior_item = match &prior_value {
                                Dynamic::List(prior_items) => {
                                    prior_items.get(idx).unwrap_or(&Dynamic::Null)
                                }
                                _ => &Dynamic::Null,
                            };
                            plan_block(
                                &nested.block,
                                item,
                                prior_item,
                                &block_path.clone().index(idx as i64),
                                scratch,
                            )
                        })
                        .collect(),
                ),
                (Dynamic::Map(_), NestingMode::Single) => {
                    plan_block(&nested.block, &config_value, &prior_value, &block_path, scratch)
                }
                _ => config_value.clone(),
            }
        };

        let plan_value = run_modifiers(
            &nested.plan_modifiers,
            config_value,
            prior_value,
            plan_value,
            &block_path,
            scratch,
        );
        planned.insert(nested.type_name.clone(), plan_value);
    }

    Dynamic::Map(planned)
}

fn run_modifiers(
    modifiers: &[Arc<dyn PlanModifier>],
    config_value: Dynamic,
    prior_value: Dynamic,
    mut plan_value: Dynamic,
    path: &AttributePath,
    scratch: &mut PlanScratch,
) -> Dynamic {
    for modifier in modifiers {
        let response = modifier.modify(PlanModifierRequest {
            config_value: DynamicValue::new(config_value.clone()),
            state_value: DynamicValue::new(prior_value.clone()),
            plan_value: DynamicValue::new(plan_value),
            path: path.clone(),
        });
        if response.requires_replace && !scratch.requires_replace.contains(path) {
            scratch.requires_replace.push(path.clone());
        }
        scratch.diagnostics.extend(response.diagnostics);
        plan_value = response.plan_value.value;
    }
    plan_value
}

/// Equality used to decide whether an update is needed. Null and empty
/// strings or collections are the same, as in flatmapped state.
pub fn semantically_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.into_iter().all(|key| {
                semantically_equal(
                    a.get(key).unwrap_or(&Dynamic::Null),
                    b.get(key).unwrap_or(&Dynamic::Null),
                )
            })
        }
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| semantically_equal(x, y))
        }
        (Dynamic::Unknown, _) | (_, Dynamic::Unknown) => false,
        (Dynamic::Null, other) | (other, Dynamic::Null) => is_empty(other),
        _ => values_equal(a, b),
    }
}

fn is_empty(value: &Dynamic) -> bool {
    match value {
        Dynamic::Null => true,
        Dynamic::String(s) => s.is_empty(),
        Dynamic::List(items) => items.is_empty(),
        Dynamic::Map(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, SchemaBuilder};

    fn block() -> Block {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .optional()
                    .default(crate::defaults::StaticDefault::number(1.0))
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("volume", NestingMode::List)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build()
            .block
    }

    fn object(pairs: &[(&str, Dynamic)]) -> Dynamic {
        Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn normalize_fills_missing_fields() {
        let normalized = normalize(&block(), &object(&[("name", Dynamic::string("a"))]));
        assert_eq!(field(&normalized, "id"), &Dynamic::Null);
        assert_eq!(field(&normalized, "volume"), &Dynamic::List(vec![]));
    }

    #[test]
    fn validate_reports_missing_unknown_and_mistyped() {
        let mut diagnostics = Vec::new();
        validate_block(
            &block(),
            &object(&[
                ("size", Dynamic::string("big")),
                ("colour", Dynamic::string("red")),
                ("id", Dynamic::string("fixed")),
            ]),
            &AttributePath::root(),
            &mut diagnostics,
        );

        let summaries: Vec<&str> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"Unsupported argument"));
        assert!(summaries.contains(&"Missing required argument"));
        assert!(summaries.contains(&"Incorrect attribute value type"));
        assert!(summaries.contains(&"Value for unconfigurable attribute"));
    }

    #[test]
    fn validate_enforces_block_max_items() {
        let volume = object(&[("type", Dynamic::string("SSD"))]);
        let mut diagnostics = Vec::new();
        validate_block(
            &block(),
            &object(&[
                ("name", Dynamic::string("a")),
                ("volume", Dynamic::List(vec![volume.clone(), volume])),
            ]),
            &AttributePath::root(),
            &mut diagnostics,
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Too many blocks");
    }

    #[test]
    fn plan_marks_computed_unknown_on_create_and_keeps_prior_on_update() {
        let config = normalize(&block(), &object(&[("name", Dynamic::string("a"))]));

        let mut scratch = PlanScratch::default();
        let created = plan_block(&block(), &config, &Dynamic::Null, &AttributePath::root(), &mut scratch);
        assert!(field(&created, "id").is_unknown());
        assert_eq!(field(&created, "size"), &Dynamic::Number(1.0));

        let prior = object(&[
            ("id", Dynamic::string("abc")),
            ("name", Dynamic::string("a")),
            ("size", Dynamic::Number(1.0)),
            ("volume", Dynamic::List(vec![])),
        ]);
        let updated = plan_block(&block(), &config, &prior, &AttributePath::root(), &mut scratch);
        assert_eq!(field(&updated, "id"), &Dynamic::string("abc"));
        assert!(semantically_equal(&updated, &prior));
        assert!(scratch.requires_replace.is_empty());
    }

    #[test]
    fn plan_collects_requires_replace() {
        let config = normalize(&block(), &object(&[("name", Dynamic::string("b"))]));
        let prior = object(&[
            ("id", Dynamic::string("abc")),
            ("name", Dynamic::string("a")),
            ("size", Dynamic::Number(1.0)),
        ]);

        let mut scratch = PlanScratch::default();
        plan_block(&block(), &config, &prior, &AttributePath::root(), &mut scratch);
        assert_eq!(scratch.requires_replace, vec![AttributePath::new("name")]);
    }

    #[test]
    fn semantic_equality_treats_null_as_empty() {
        assert!(semantically_equal(&Dynamic::Null, &Dynamic::string("")));
        assert!(semantically_equal(
            &Dynamic::Null,
            &Dynamic::Map(HashMap::new())
        ));
        assert!(!semantically_equal(&Dynamic::Null, &Dynamic::Bool(false)));
        assert!(!semantically_equal(&Dynamic::Unknown, &Dynamic::Unknown));
    }
}
