//! Maps an instance from the list API onto resource state

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::common::{navigate_value, NavigateError};

fn at(
    instance: &Value,
    path: &[&str],
    indexes: Option<&HashMap<String, usize>>,
) -> Result<Value, NavigateError> {
    Ok(navigate_value(instance, path, indexes)?
        .cloned()
        .unwrap_or(Value::Null))
}

fn node_at(instance: &Value, index: usize, field: &str) -> Result<Value, NavigateError> {
    let indexes = HashMap::from([("nodes".to_string(), index)]);
    at(instance, &["nodes", field], Some(&indexes))
}

/// First item of a single-item block in `current`, or an empty object
fn block_item(current: &Value, block: &str) -> Map<String, Value> {
    match current.get(block) {
        Some(Value::Array(items)) => match items.first() {
            Some(Value::Object(item)) => item.clone(),
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

/// Zones in configuration order. For HA flavors the master node's zone
/// comes first.
pub fn flatten_availability_zone(instance: &Value) -> Result<Value, NavigateError> {
    let first = node_at(instance, 0, "availability_zone")?;
    let flavor = at(instance, &["flavor_ref"], None)?;
    if !flavor.as_str().is_some_and(|f| f.ends_with(".ha")) {
        return Ok(Value::Array(vec![first]));
    }

    let second = node_at(instance, 1, "availability_zone")?;
    let second_role = node_at(instance, 1, "role")?;
    if second_role.as_str() == Some("master") {
        Ok(Value::Array(vec![second, first]))
    } else {
        Ok(Value::Array(vec![first, second]))
    }
}

pub fn flatten_nodes(instance: &Value) -> Result<Value, NavigateError> {
    let count = match at(instance, &["nodes"], None)? {
        Value::Array(nodes) => nodes.len(),
        _ => 0,
    };

    let mut nodes = Vec::with_capacity(count);
    for index in 0..count {
        let mut node = Map::new();
        for field in ["availability_zone", "id", "name", "role", "status"] {
            node.insert(field.to_string(), node_at(instance, index, field)?);
        }
        nodes.push(Value::Object(node));
    }
    Ok(Value::Array(nodes))
}

/// Id of the master node in flattened `nodes`
pub fn master_node_id(nodes: &Value) -> Option<String> {
    nodes.as_array()?.iter().find_map(|node| {
        (node.get("role").and_then(Value::as_str) == Some("master"))
            .then(|| node.get("id").and_then(Value::as_str).map(str::to_string))
            .flatten()
    })
}

/// The new state. Values the API never returns, such as the database
/// password, are carried over from `current`.
pub fn flatten_instance(instance: &Value, current: &Value) -> Result<Value, NavigateError> {
    let mut state = match current {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };

    state.insert(
        "availability_zone".to_string(),
        flatten_availability_zone(instance)?,
    );

    let mut backup = block_item(current, "backup_strategy");
    backup.insert(
        "keep_days".to_string(),
        at(instance, &["backup_strategy", "keep_days"], None)?,
    );
    backup.insert(
        "start_time".to_string(),
        at(instance, &["backup_strategy", "start_time"], None)?,
    );
    state.insert(
        "backup_strategy".to_string(),
        Value::Array(vec![Value::Object(backup)]),
    );

    let mut db = block_item(current, "db");
    db.insert("port".to_string(), at(instance, &["port"], None)?);
    db.insert("type".to_string(), at(instance, &["datastore", "type"], None)?);
    db.insert("user_name".to_string(), at(instance, &["db_user_name"], None)?);
    db.insert(
        "version".to_string(),
        at(instance, &["datastore", "version"], None)?,
    );
    state.insert("db".to_string(), Value::Array(vec![Value::Object(db)]));

    let mut volume = block_item(current, "volume");
    volume.insert(
        "disk_encryption_id".to_string(),
        instance.get("disk_encryption_id").cloned().unwrap_or(Value::Null),
    );
    volume.insert("size".to_string(), at(instance, &["volume", "size"], None)?);
    volume.insert("type".to_string(), at(instance, &["volume", "type"], None)?);
    state.insert("volume".to_string(), Value::Array(vec![Value::Object(volume)]));

    for (attribute, key) in [
        ("created", "created"),
        ("flavor", "flavor_ref"),
        ("name", "name"),
        ("private_ips", "private_ips"),
        ("public_ips", "public_ips"),
        ("security_group_id", "security_group_id"),
        ("subnet_id", "subnet_id"),
        ("vpc_id", "vpc_id"),
    ] {
        state.insert(attribute.to_string(), at(instance, &[key], None)?);
    }

    state.insert("nodes".to_string(), flatten_nodes(instance)?);

    if let Some(mode) = instance
        .get("ha")
        .and_then(|ha| ha.get("replication_mode"))
        .filter(|mode| !mode.is_null())
    {
        state.insert("ha_replication_mode".to_string(), mode.clone());
    }
    if let Some(group) = instance
        .get("configuration_id")
        .filter(|group| !group.is_null())
    {
        state.insert("param_group_id".to_string(), group.clone());
    }

    Ok(Value::Object(state))
}
