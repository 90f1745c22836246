//! RDS v3 instance resource
//!
//! Instances are created through the v3 API and tracked by job. Flavor and
//! volume resizes still go through the v1 API against the master node, as do
//! node tags.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::host::semantically_equal;
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
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{IpAddressValidator, ListLengthValidator};

use super::expand::build_create_body;
use super::flatten::{flatten_instance, flatten_nodes, master_node_id};
use super::public_ip;
use crate::api::rds::v3::BackupPolicy;
use crate::api::{ApiError, Client};
use crate::common::{diff_tags, navigate_value, provider_not_configured, tags_to_map};
use crate::provider_data::OtcProviderData;

const CREATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const BACKUP_PERIOD: &str = "1,2,3,4,5,6,7";

fn client_error(service: &str, e: ApiError) -> Diagnostic {
    Diagnostic::error(
        format!("Error creating OpenTelekomCloud {} client", service),
        e.to_string(),
    )
}

/// True when `name` differs between prior state and plan
fn changed(prior: &DynamicValue, planned: &DynamicValue, name: &str) -> bool {
    let path = AttributePath::new(name);
    match (prior.get(&path), planned.get(&path)) {
        (Some(a), Some(b)) => !semantically_equal(a, b),
        (None, None) => false,
        _ => true,
    }
}

fn block_changed(prior: &DynamicValue, planned: &DynamicValue, block: &str, field: &str) -> bool {
    let path = AttributePath::new(block).index(0).attribute(field);
    match (prior.get(&path), planned.get(&path)) {
        (Some(a), Some(b)) => !semantically_equal(a, b),
        (None, None) => false,
        _ => true,
    }
}

fn first_string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(state: &DynamicValue, name: &str) -> Vec<String> {
    state
        .get_string_list(&AttributePath::new(name))
        .unwrap_or_default()
}

/// Status of a node being resized to `flavor_id`
fn flavor_resize_state(status: &str, current_flavor: &str, flavor_id: &str) -> String {
    match status {
        "ACTIVE" if current_flavor == flavor_id => "ACTIVE".to_string(),
        "ACTIVE" | "MODIFYING" => "MODIFYING".to_string(),
        other => other.to_string(),
    }
}

/// Status of a node whose volume grows to `size`
fn volume_resize_state(status: &str, current_size: i64, size: i64) -> String {
    match status {
        "ACTIVE" if current_size == size => "UPDATED".to_string(),
        "ACTIVE" | "MODIFYING" => "MODIFYING".to_string(),
        other => other.to_string(),
    }
}

#[derive(Default)]
pub struct RdsInstanceV3Resource {
    provider_data: Option<OtcProviderData>,
}

impl RdsInstanceV3Resource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_instance(
        &self,
        provider_data: &OtcProviderData,
        state: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let id = state
            .get_string(&AttributePath::new("id"))
            .map_err(|_| Diagnostic::error("Missing id", "The RDS instance has no id in state"))?;
        let region = provider_data.config.get_region(state);
        let client = provider_data
            .config
            .rds_v3_client(&region)
            .map_err(|e| client_error("rds v3", e))?;

        let instance = match client.rds_v3().find_instance(&id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                tracing::warn!(id = %id, "RDS instance not found, removing from state");
                return Ok(None);
            }
            Err(e) => {
                return Err(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud RdsInstanceV3",
                    e.to_string(),
                ))
            }
        };
        tracing::debug!(id = %id, "Retrieved RDS instance");

        let mut flattened = flatten_instance(&instance, &state.to_json()).map_err(|e| {
            Diagnostic::error("Error setting RdsInstanceV3 attributes", e.to_string())
        })?;
        flattened["region"] = Value::String(region.clone());

        let has_public_ip = flattened
            .get("public_ips")
            .and_then(Value::as_array)
            .is_some_and(|ips| !ips.is_empty());
        if !has_public_ip {
            let ips = match self
                .lookup_public_ip(provider_data, &region, &flattened)
                .await
            {
                Ok(Some(ip)) => vec![Value::String(ip)],
                Ok(None) => vec![],
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Unable to look up public IP of RDS instance");
                    vec![]
                }
            };
            flattened["public_ips"] = Value::Array(ips);
        }

        if let Some(node_id) = flattened.get("nodes").and_then(master_node_id) {
            let tag_client = provider_data
                .config
                .rds_tag_v1_client(&region)
                .map_err(|e| client_error("rds tag", e))?;
            let tags = tag_client.rds_tags().list(&node_id).await.map_err(|e| {
                Diagnostic::error(
                    "Error fetching OpenTelekomCloud rds instance tags",
                    e.to_string(),
                )
            })?;
            flattened["tag"] = serde_json::to_value(tags_to_map(&tags)).unwrap_or(Value::Null);
        }

        Ok(Some(DynamicValue::from_json(&flattened)))
    }

    /// Floating IP bound to the port that carries the first private IP
    async fn lookup_public_ip(
        &self,
        provider_data: &OtcProviderData,
        region: &str,
        instance: &Value,
    ) -> Result<Option<String>, ApiError> {
        let (Some(private_ip), Some(subnet_id)) = (
            first_string(instance, "private_ips"),
            instance.get("subnet_id").and_then(Value::as_str),
        ) else {
            return Ok(None);
        };

        let vpc = provider_data.config.vpc_v1_client(region)?;
        let subnet = vpc.vpc_subnets().get(subnet_id).await?;
        let network = provider_data.config.networking_v2_client(region)?;
        public_ip::assigned_public_ip(&network, &private_ip, &subnet.subnet_id).await
    }

    async fn network_clients(
        &self,
        provider_data: &OtcProviderData,
        region: &str,
        subnet_id: &str,
    ) -> Result<(Client, String), Diagnostic> {
        let vpc = provider_data
            .config
            .vpc_v1_client(region)
            .map_err(|e| client_error("vpc", e))?;
        let subnet = vpc.vpc_subnets().get(subnet_id).await.map_err(|e| {
            Diagnostic::error("Unable to get subnet of RDS instance", e.to_string())
        })?;
        let network = provider_data
            .config
            .networking_v2_client(region)
            .map_err(|e| client_error("networking", e))?;
        Ok((network, subnet.subnet_id))
    }

    /// POST the instance and wait for its creation job
    async fn create_instance(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        client: &Client,
        config: &DynamicValue,
        region: &str,
    ) -> Result<String, Diagnostic> {
        let mut opts = config.to_json();
        opts["region"] = Value::String(region.to_string());
        let body = build_create_body(&opts).map_err(|e| {
            Diagnostic::error(
                "Error building the request body of api(create)",
                e.to_string(),
            )
        })?;
        tracing::debug!(name = ?body.get("name"), "Creating RDS instance");

        let response = client.rds_v3().create_instance(&body).await.map_err(|e| {
            Diagnostic::error("Error creating RdsInstanceV3", e.to_string())
        })?;
        let job_id = response
            .get("job_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Error creating RdsInstanceV3",
                    "The response carries no job_id",
                )
            })?
            .to_string();

        let job = provider_data
            .poll
            .state_change(
                &["Running"],
                &["Completed"],
                CREATE_TIMEOUT,
                Duration::from_secs(10),
                Duration::from_secs(1),
            )
            .wait_for_state(ctx, || async {
                match client.rds_v3().get_job(&job_id).await {
                    Ok(job) => {
                        let status = navigate_value(&job, &["job", "status"], None)
                            .ok()
                            .flatten()
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        Ok::<_, ApiError>(Some((job, status)))
                    }
                    Err(e) => {
                        tracing::debug!(job_id = %job_id, error = %e, "Error querying RDS job");
                        Ok(None)
                    }
                }
            })
            .await
            .map_err(|e| {
                Diagnostic::error("Error waiting for RdsInstanceV3 to be created", e.to_string())
            })?;

        navigate_value(&job, &["job", "instance", "id"], None)
            .ok()
            .flatten()
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Error creating RdsInstanceV3",
                    "The creation job carries no instance id",
                )
            })
    }

    /// Tags and public IP of a freshly created instance. Failures only warn.
    async fn finish_create(
        &self,
        provider_data: &OtcProviderData,
        client: &Client,
        region: &str,
        id: &str,
        config: &DynamicValue,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let tags = config
            .get_string_map(&AttributePath::new("tag"))
            .unwrap_or_default();
        let public_ips = string_list(config, "public_ips");
        if tags.is_empty() && public_ips.is_empty() {
            return;
        }

        let instance = match client.rds_v3().find_instance(id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                diagnostics.push(Diagnostic::warning(
                    "RDS instance not found after creation",
                    format!("Tags and public IP of {} were not set", id),
                ));
                return;
            }
            Err(e) => {
                diagnostics.push(Diagnostic::warning(
                    "Error retrieving RDS instance after creation",
                    e.to_string(),
                ));
                return;
            }
        };

        if !tags.is_empty() {
            if let Err(diag) = self
                .create_tags(provider_data, region, &instance, &tags)
                .await
            {
                tracing::warn!(id, summary = %diag.summary, "Error setting tags of RDS instance");
                diagnostics.push(Diagnostic::warning(diag.summary, diag.detail));
            }
        }

        if let Some(ip) = public_ips.first() {
            if let Err(diag) = self
                .assign_public_ip(provider_data, region, &instance, ip)
                .await
            {
                tracing::warn!(id, summary = %diag.summary, "Error assigning public IP to RDS instance");
                diagnostics.push(Diagnostic::warning(diag.summary, diag.detail));
            }
        }
    }

    async fn create_tags(
        &self,
        provider_data: &OtcProviderData,
        region: &str,
        instance: &Value,
        tags: &HashMap<String, String>,
    ) -> Result<(), Diagnostic> {
        let nodes = flatten_nodes(instance).map_err(|e| {
            Diagnostic::error("Error reading RDS instance nodes", e.to_string())
        })?;
        let node_id = master_node_id(&nodes).ok_or_else(|| {
            Diagnostic::error(
                "Error setting tags of RDS instance",
                "Unable to find the master node",
            )
        })?;
        let tag_client = provider_data
            .config
            .rds_tag_v1_client(region)
            .map_err(|e| client_error("rds tag", e))?;

        let (create, _) = diff_tags(&HashMap::new(), tags);
        for tag in &create {
            tag_client
                .rds_tags()
                .create(&node_id, tag)
                .await
                .map_err(|e| {
                    Diagnostic::error(
                        format!("Error setting tag {} of RDS instance", tag.key),
                        e.to_string(),
                    )
                })?;
        }
        Ok(())
    }

    async fn assign_public_ip(
        &self,
        provider_data: &OtcProviderData,
        region: &str,
        instance: &Value,
        public: &str,
    ) -> Result<(), Diagnostic> {
        let (Some(private_ip), Some(subnet_id)) = (
            first_string(instance, "private_ips"),
            instance.get("subnet_id").and_then(Value::as_str),
        ) else {
            return Err(Diagnostic::error(
                "Error assigning public IP to RDS instance",
                "The instance has no private IP",
            ));
        };

        let (network, neutron_subnet) = self
            .network_clients(provider_data, region, subnet_id)
            .await?;
        public_ip::assign(&network, public, &private_ip, &neutron_subnet)
            .await
            .map_err(|e| {
                Diagnostic::error("Error assigning public IP to RDS instance", e.to_string())
            })
    }

    /// Applies every changed attribute in order, stopping at the first failure
    async fn apply_update(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        request: &UpdateResourceRequest,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), Diagnostic> {
        let prior = &request.prior_state;
        let planned = &request.planned_state;
        let id = prior
            .get_string(&AttributePath::new("id"))
            .map_err(|_| Diagnostic::error("Missing id", "The RDS instance has no id in state"))?;
        let region = provider_data.config.get_region(prior);
        let client = provider_data
            .config
            .rds_v3_client(&region)
            .map_err(|e| client_error("rds v3", e))?;

        if changed(prior, planned, "backup_strategy") {
            let block = AttributePath::new("backup_strategy").index(0);
            let policy = BackupPolicy {
                keep_days: planned
                    .get_i64(&block.clone().attribute("keep_days"))
                    .unwrap_or(0),
                start_time: planned
                    .get_string(&block.attribute("start_time"))
                    .unwrap_or_default(),
                period: BACKUP_PERIOD.to_string(),
            };
            tracing::debug!(?policy, "Updating RDS backup policy");
            client
                .rds_v3()
                .update_backup_policy(&id, &policy)
                .await
                .map_err(|e| {
                    Diagnostic::error("Error updating backup_strategy of RDS instance", e.to_string())
                })?;
        }

        let nodes = prior
            .get(&AttributePath::new("nodes"))
            .map(Dynamic::to_json)
            .unwrap_or(Value::Null);
        let Some(node_id) = master_node_id(&nodes) else {
            tracing::warn!(id = %id, "RDS instance has no master node, skipping node updates");
            diagnostics.push(Diagnostic::warning(
                "Unable to find the master node of the RDS instance",
                "Tags, flavor, volume and public IP were not updated",
            ));
            return Ok(());
        };

        if changed(prior, planned, "tag") {
            self.update_tags(provider_data, &region, &node_id, prior, planned, diagnostics)
                .await?;
        }

        if changed(prior, planned, "flavor") {
            let flavor = planned
                .get_string(&AttributePath::new("flavor"))
                .unwrap_or_default();
            self.resize_flavor(ctx, provider_data, &region, &node_id, planned, &flavor)
                .await?;
        }

        if block_changed(prior, planned, "volume", "size") {
            let size = planned
                .get_i64(&AttributePath::new("volume").index(0).attribute("size"))
                .unwrap_or(0);
            self.resize_volume(ctx, provider_data, &region, &node_id, size)
                .await?;
        }

        if changed(prior, planned, "public_ips") {
            self.update_public_ips(provider_data, &region, prior, planned)
                .await?;
        }

        Ok(())
    }

    /// Individual tag failures are reported as warnings and do not stop
    /// the remaining updates
    async fn update_tags(
        &self,
        provider_data: &OtcProviderData,
        region: &str,
        node_id: &str,
        prior: &DynamicValue,
        planned: &DynamicValue,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), Diagnostic> {
        let tag_client = provider_data
            .config
            .rds_tag_v1_client(region)
            .map_err(|e| client_error("rds tag", e))?;
        let old = prior
            .get_string_map(&AttributePath::new("tag"))
            .unwrap_or_default();
        let new = planned
            .get_string_map(&AttributePath::new("tag"))
            .unwrap_or_default();
        let (create, remove) = diff_tags(&old, &new);

        for tag in &remove {
            if let Err(e) = tag_client.rds_tags().delete(node_id, &tag.key).await {
                tracing::warn!(node_id, key = %tag.key, error = %e, "Error deleting RDS instance tag");
                diagnostics.push(Diagnostic::warning(
                    format!("Error deleting tag {} of RDS instance", tag.key),
                    e.to_string(),
                ));
            }
        }
        for tag in &create {
            if let Err(e) = tag_client.rds_tags().create(node_id, tag).await {
                tracing::warn!(node_id, key = %tag.key, error = %e, "Error setting RDS instance tag");
                diagnostics.push(Diagnostic::warning(
                    format!("Error setting tag {} of RDS instance", tag.key),
                    e.to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn resize_flavor(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        region: &str,
        node_id: &str,
        planned: &DynamicValue,
        flavor: &str,
    ) -> Result<(), Diagnostic> {
        let client = provider_data
            .config
            .rds_v1_client(region)
            .map_err(|e| client_error("rds v1", e))?;
        let db = AttributePath::new("db").index(0);
        let db_type = planned
            .get_string(&db.clone().attribute("type"))
            .unwrap_or_default();
        let db_version = planned
            .get_string(&db.attribute("version"))
            .unwrap_or_default();

        let versions = client
            .rds_v1()
            .list_datastore_versions(&db_type)
            .await
            .map_err(|e| Diagnostic::error("Unable to list RDS datastores", e.to_string()))?;
        let datastore = versions
            .iter()
            .find(|version| version.name.starts_with(&db_version))
            .ok_or_else(|| {
                Diagnostic::error("Unable to resize RDS instance", "Returned no datastore ID.")
            })?;

        let flavors = client
            .rds_v1()
            .list_flavors(&datastore.id, region)
            .await
            .map_err(|e| Diagnostic::error("Unable to list RDS flavors", e.to_string()))?;
        let flavor_id = flavors
            .iter()
            .find(|candidate| candidate.spec_code == flavor)
            .map(|candidate| candidate.id.clone())
            .ok_or_else(|| {
                Diagnostic::error(
                    "Unable to resize RDS instance",
                    format!("No flavor with spec code {}", flavor),
                )
            })?;

        tracing::debug!(node_id, flavor_id = %flavor_id, "Resizing RDS instance flavor");
        client
            .rds_v1()
            .resize_flavor(node_id, &flavor_id)
            .await
            .map_err(|e| Diagnostic::error("Error resizing RDS instance flavor", e.to_string()))?;

        provider_data
            .poll
            .state_change(
                &["MODIFYING"],
                &["ACTIVE"],
                UPDATE_TIMEOUT,
                Duration::from_secs(15),
                Duration::from_secs(3),
            )
            .wait_for_state(ctx, || async {
                let instance = client.rds_v1().get_instance(node_id).await?;
                let state = flavor_resize_state(&instance.status, &instance.flavor.id, &flavor_id);
                Ok::<_, ApiError>(Some(((), state)))
            })
            .await
            .map_err(|e| {
                Diagnostic::error(
                    "Error waiting for RDS instance flavor to be resized",
                    e.to_string(),
                )
            })
    }

    async fn resize_volume(
        &self,
        ctx: &Context,
        provider_data: &OtcProviderData,
        region: &str,
        node_id: &str,
        size: i64,
    ) -> Result<(), Diagnostic> {
        let client = provider_data
            .config
            .rds_v1_client(region)
            .map_err(|e| client_error("rds v1", e))?;

        tracing::debug!(node_id, size, "Resizing RDS instance volume");
        client
            .rds_v1()
            .resize_volume(node_id, size)
            .await
            .map_err(|e| Diagnostic::error("Error resizing RDS instance volume", e.to_string()))?;

        provider_data
            .poll
            .state_change(
                &["MODIFYING"],
                &["UPDATED"],
                UPDATE_TIMEOUT,
                Duration::from_secs(15),
                Duration::from_secs(3),
            )
            .wait_for_state(ctx, || async {
                let instance = client.rds_v1().get_instance(node_id).await?;
                let state = volume_resize_state(&instance.status, instance.volume.size, size);
                Ok::<_, ApiError>(Some(((), state)))
            })
            .await
            .map_err(|e| {
                Diagnostic::error(
                    "Error waiting for RDS instance volume to be resized",
                    e.to_string(),
                )
            })
    }

    async fn update_public_ips(
        &self,
        provider_data: &OtcProviderData,
        region: &str,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<(), Diagnostic> {
        let old = string_list(prior, "public_ips");
        let new = string_list(planned, "public_ips");
        if new.len() > 1 {
            return Err(Diagnostic::error(
                "Error updating public IP of RDS instance",
                "RDS instance can't have more than one public IP",
            ));
        }

        let network = provider_data
            .config
            .networking_v2_client(region)
            .map_err(|e| client_error("networking", e))?;
        if let Some(ip) = old.first() {
            public_ip::unassign(&network, ip).await.map_err(|e| {
                Diagnostic::error("Error unassigning public IP from RDS instance", e.to_string())
            })?;
        }

        if let Some(ip) = new.first() {
            let instance = serde_json::json!({
                "private_ips": prior
                    .get(&AttributePath::new("private_ips"))
                    .map(Dynamic::to_json)
                    .unwrap_or(Value::Null),
                "subnet_id": prior
                    .get_string(&AttributePath::new("subnet_id"))
                    .unwrap_or_default(),
            });
            self.assign_public_ip(provider_data, region, &instance, ip)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for RdsInstanceV3Resource {
    fn type_name(&self) -> &str {
        "opentelekomcloud_rds_instance_v3"
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
        let required_new = |name: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .required()
                .force_new()
                .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an RDS v3 database instance")
            .create_timeout(CREATE_TIMEOUT)
            .update_timeout(UPDATE_TIMEOUT)
            .delete_timeout(DELETE_TIMEOUT)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability_zone", AttributeType::list_of(AttributeType::String))
                    .description("Availability zones; two for primary/standby flavors")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("flavor", AttributeType::String)
                    .description("Specification code of the instance flavor")
                    .required()
                    .build(),
            )
            .attribute(required_new("name"))
            .attribute(required_new("security_group_id"))
            .attribute(required_new("subnet_id"))
            .attribute(required_new("vpc_id"))
            .attribute(
                AttributeBuilder::new("ha_replication_mode", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("param_group_id", AttributeType::String)
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tag", AttributeType::map_of(AttributeType::String))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_ips", AttributeType::list_of(AttributeType::String))
                    .optional()
                    .computed()
                    .validator(ListLengthValidator::create(None, Some(1)))
                    .validator(IpAddressValidator::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("private_ips", AttributeType::list_of(AttributeType::String))
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "nodes",
                    AttributeType::list_of(AttributeType::object(&[
                        ("availability_zone", AttributeType::String),
                        ("id", AttributeType::String),
                        ("name", AttributeType::String),
                        ("role", AttributeType::String),
                        ("status", AttributeType::String),
                    ])),
                )
                .computed()
                .build(),
            )
            .block(
                NestedBlockBuilder::new("db", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .force_new()
                    .attribute(
                        AttributeBuilder::new("password", AttributeType::String)
                            .required()
                            .sensitive()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .description("PostgreSQL, MySQL or SQLServer")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("version", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("port", AttributeType::Number)
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("user_name", AttributeType::String)
                            .computed()
                            .build(),
                    )
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("volume", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("size", AttributeType::Number)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .required()
                            .force_new()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("disk_encryption_id", AttributeType::String)
                            .optional()
                            .computed()
                            .force_new()
                            .build(),
                    )
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("backup_strategy", NestingMode::List)
                    .max_items(1)
                    .computed()
                    .attribute(
                        AttributeBuilder::new("start_time", AttributeType::String)
                            .description("Backup window, e.g. 08:00-09:00")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("keep_days", AttributeType::Number)
                            .optional()
                            .computed()
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
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
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
        let client = match provider_data.config.rds_v3_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(client_error("rds v3", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let id = match self
            .create_instance(&ctx, provider_data, &client, &request.config, &region)
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
        tracing::info!(id = %id, "RDS instance created");

        self.finish_create(
            provider_data,
            &client,
            &region,
            &id,
            &request.config,
            &mut diagnostics,
        )
        .await;

        let mut state = request.planned_state.clone();
        let _ = state.set_string(&AttributePath::new("id"), id);
        let _ = state.set_string(&AttributePath::new("region"), region);

        match self.read_instance(provider_data, &state).await {
            Ok(Some(new_state)) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud RdsInstanceV3",
                    "The instance disappeared right after creation",
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
            .read_instance(provider_data, &request.current_state)
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
            .apply_update(&ctx, provider_data, &request, &mut diagnostics)
            .await
        {
            diagnostics.push(diag);
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        match self
            .read_instance(provider_data, &request.planned_state)
            .await
        {
            Ok(Some(new_state)) => UpdateResourceResponse {
                new_state,
                diagnostics,
            },
            Ok(None) => {
                diagnostics.push(Diagnostic::error(
                    "Error retrieving OpenTelekomCloud RdsInstanceV3",
                    "The instance disappeared during the update",
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

        let Ok(id) = request.prior_state.get_string(&AttributePath::new("id")) else {
            return DeleteResourceResponse { diagnostics };
        };
        let region = provider_data.config.get_region(&request.prior_state);
        let client = match provider_data.config.rds_v3_client(&region) {
            Ok(client) => client,
            Err(e) => {
                diagnostics.push(client_error("rds v3", e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.rds_v3().delete_instance(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(id = %id, "RDS instance already deleted");
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Error deleting RdsInstanceV3",
                    e.to_string(),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let waited = provider_data
            .poll
            .state_change(
                &["Pending"],
                &["Done"],
                DELETE_TIMEOUT,
                Duration::from_secs(10),
                Duration::from_secs(1),
            )
            .wait_for_state(&ctx, || async {
                match client.rds_v3().find_instance(&id).await {
                    Ok(Some(_)) => Ok::<_, ApiError>(Some(((), "Pending".to_string()))),
                    Ok(None) => Ok(Some(((), "Done".to_string()))),
                    Err(e) => {
                        tracing::debug!(id = %id, error = %e, "Error querying deleted RDS instance");
                        Ok(None)
                    }
                }
            })
            .await;
        if let Err(e) = waited {
            diagnostics.push(Diagnostic::error(
                "Error waiting for RdsInstanceV3 to be deleted",
                e.to_string(),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn importer(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for RdsInstanceV3Resource {
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
impl ResourceWithConfigure for RdsInstanceV3Resource {
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
#[path = "./resource_instance_v3_test.rs"]
mod resource_instance_v3_test;
