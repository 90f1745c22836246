//! Builds the instance create body from configuration. Empty values are left
//! out of the body entirely.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::common::{is_empty_value, navigate_value, NavigateError};

#[derive(Debug, Error, PartialEq)]
pub enum ExpandError {
    #[error(transparent)]
    Navigate(#[from] NavigateError),

    #[error("must input two available zones for primary/standby instance")]
    HaZones,

    #[error("must input only one available zone for single instance")]
    SingleZone,

    #[error("can not convert availability_zone to array")]
    ZonesNotList,
}

/// `db`, `volume` and `backup_strategy` are single-item blocks
fn block_indexes() -> HashMap<String, usize> {
    ["backup_strategy", "db", "volume"]
        .into_iter()
        .map(|block| (block.to_string(), 0))
        .collect()
}

/// Like `navigate_value`, but an absent key reads as null
fn lookup(
    opts: &Value,
    path: &[&str],
    indexes: &HashMap<String, usize>,
) -> Result<Option<Value>, NavigateError> {
    match navigate_value(opts, path, Some(indexes)) {
        Ok(value) => Ok(value.cloned()),
        Err(NavigateError::MissingKey(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn put(target: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value.filter(|v| !is_empty_value(v)) {
        target.insert(key.to_string(), value);
    }
}

/// HA flavors (suffix `.ha`) take a primary and a standby zone
pub fn expand_availability_zone(opts: &Value) -> Result<Value, ExpandError> {
    let indexes = block_indexes();
    let flavor = lookup(opts, &["flavor"], &indexes)?;
    let is_ha = flavor
        .as_ref()
        .and_then(Value::as_str)
        .is_some_and(|f| f.ends_with(".ha"));

    let zones: Vec<String> = match lookup(opts, &["availability_zone"], &indexes)? {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|zone| zone.as_str().map(str::to_string))
            .collect(),
        _ => return Err(ExpandError::ZonesNotList),
    };

    match (is_ha, zones.as_slice()) {
        (true, [primary, standby]) => Ok(Value::String(format!("{},{}", primary, standby))),
        (true, _) => Err(ExpandError::HaZones),
        (false, [zone]) => Ok(Value::String(zone.clone())),
        (false, _) => Err(ExpandError::SingleZone),
    }
}

fn expand_ha(opts: &Value, indexes: &HashMap<String, usize>) -> Result<Value, ExpandError> {
    let mut ha = Map::new();
    let replication_mode = lookup(opts, &["ha_replication_mode"], indexes)?;
    if replication_mode
        .as_ref()
        .and_then(Value::as_str)
        .is_some_and(|mode| !mode.is_empty())
    {
        ha.insert("mode".to_string(), json!("ha"));
    }
    put(&mut ha, "replication_mode", replication_mode);
    Ok(Value::Object(ha))
}

fn expand_nested(
    opts: &Value,
    indexes: &HashMap<String, usize>,
    fields: &[(&str, [&str; 2])],
) -> Result<Value, ExpandError> {
    let mut nested = Map::new();
    for (key, path) in fields {
        put(&mut nested, key, lookup(opts, path, indexes)?);
    }
    Ok(Value::Object(nested))
}

/// `opts` is the resource configuration as JSON with `region` filled in
pub fn build_create_body(opts: &Value) -> Result<Value, ExpandError> {
    let indexes = block_indexes();
    let mut body = Map::new();

    put(&mut body, "availability_zone", Some(expand_availability_zone(opts)?));
    put(
        &mut body,
        "backup_strategy",
        Some(expand_nested(
            opts,
            &indexes,
            &[
                ("keep_days", ["backup_strategy", "keep_days"]),
                ("start_time", ["backup_strategy", "start_time"]),
            ],
        )?),
    );
    put(&mut body, "configuration_id", lookup(opts, &["param_group_id"], &indexes)?);
    put(
        &mut body,
        "datastore",
        Some(expand_nested(
            opts,
            &indexes,
            &[("type", ["db", "type"]), ("version", ["db", "version"])],
        )?),
    );
    put(
        &mut body,
        "disk_encryption_id",
        lookup(opts, &["volume", "disk_encryption_id"], &indexes)?,
    );
    put(&mut body, "flavor_ref", lookup(opts, &["flavor"], &indexes)?);
    put(&mut body, "ha", Some(expand_ha(opts, &indexes)?));
    put(&mut body, "name", lookup(opts, &["name"], &indexes)?);
    put(&mut body, "password", lookup(opts, &["db", "password"], &indexes)?);
    put(&mut body, "port", lookup(opts, &["db", "port"], &indexes)?);
    put(&mut body, "region", lookup(opts, &["region"], &indexes)?);
    put(
        &mut body,
        "security_group_id",
        lookup(opts, &["security_group_id"], &indexes)?,
    );
    put(&mut body, "subnet_id", lookup(opts, &["subnet_id"], &indexes)?);
    put(
        &mut body,
        "volume",
        Some(expand_nested(
            opts,
            &indexes,
            &[("size", ["volume", "size"]), ("type", ["volume", "type"])],
        )?),
    );
    put(&mut body, "vpc_id", lookup(opts, &["vpc_id"], &indexes)?);

    Ok(Value::Object(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(flavor: &str, zones: &[&str]) -> Value {
        json!({
            "name": "db-1",
            "flavor": flavor,
            "availability_zone": zones,
            "region": "eu-de",
            "vpc_id": "vpc-1",
            "subnet_id": "subnet-1",
            "security_group_id": "sg-1",
            "param_group_id": null,
            "ha_replication_mode": null,
            "db": [{"type": "PostgreSQL", "version": "10", "password": "Secret123!", "port": 8635, "user_name": null}],
            "volume": [{"type": "COMMON", "size": 100, "disk_encryption_id": null}],
            "backup_strategy": [{"start_time": "08:00-09:00", "keep_days": null}]
        })
    }

    #[test]
    fn single_instance_body_skips_empty_values() {
        let body = build_create_body(&config("rds.pg.c2.medium", &["eu-de-01"])).unwrap();
        assert_eq!(
            body,
            json!({
                "availability_zone": "eu-de-01",
                "backup_strategy": {"start_time": "08:00-09:00"},
                "datastore": {"type": "PostgreSQL", "version": "10"},
                "flavor_ref": "rds.pg.c2.medium",
                "name": "db-1",
                "password": "Secret123!",
                "port": 8635,
                "region": "eu-de",
                "security_group_id": "sg-1",
                "subnet_id": "subnet-1",
                "volume": {"size": 100, "type": "COMMON"},
                "vpc_id": "vpc-1"
            })
        );
    }

    #[test]
    fn ha_instance_joins_zones_and_sets_mode() {
        let mut opts = config("rds.pg.c2.medium.ha", &["eu-de-01", "eu-de-02"]);
        opts["ha_replication_mode"] = json!("async");
        let body = build_create_body(&opts).unwrap();
        assert_eq!(body["availability_zone"], json!("eu-de-01,eu-de-02"));
        assert_eq!(body["ha"], json!({"mode": "ha", "replication_mode": "async"}));
    }

    #[test]
    fn zone_count_must_match_flavor() {
        assert_eq!(
            expand_availability_zone(&config("rds.pg.c2.medium.ha", &["eu-de-01"])),
            Err(ExpandError::HaZones)
        );
        assert_eq!(
            expand_availability_zone(&config("rds.pg.c2.medium", &["eu-de-01", "eu-de-02"])),
            Err(ExpandError::SingleZone)
        );
        assert_eq!(
            expand_availability_zone(&json!({"flavor": "rds.pg.c2.medium"})),
            Err(ExpandError::ZonesNotList)
        );
    }
}
