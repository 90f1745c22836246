//! Walking loosely typed JSON API responses

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum NavigateError {
    #[error("navigate: '{0}' may not exist")]
    MissingKey(String),

    #[error("navigate: can not convert value at '{0}' to a map")]
    NotAMap(String),

    #[error("navigate: can not convert value at '{0}' to a list")]
    NotAList(String),

    #[error("navigate: index {index} is out of the list at '{path}'")]
    IndexOutOfRange { path: String, index: usize },

    #[error("replace_vars: no value for '{0}'")]
    MissingVar(String),
}

/// Follows `path` through nested objects. `array_index` maps a dotted path
/// prefix to the list element to step into at that point. A null anywhere
/// along the way yields `Ok(None)`.
pub fn navigate_value<'a>(
    value: &'a Value,
    path: &[&str],
    array_index: Option<&HashMap<String, usize>>,
) -> Result<Option<&'a Value>, NavigateError> {
    let mut current = value;
    for (n, key) in path.iter().enumerate() {
        if current.is_null() {
            return Ok(None);
        }
        let prefix = path[..=n].join(".");
        current = match current {
            Value::Object(fields) => fields
                .get(*key)
                .ok_or_else(|| NavigateError::MissingKey(prefix.clone()))?,
            _ => return Err(NavigateError::NotAMap(prefix)),
        };

        if let Some(index) = array_index.and_then(|indexes| indexes.get(&prefix)) {
            current = match current {
                Value::Null => return Ok(None),
                Value::Array(items) if items.is_empty() => return Ok(None),
                Value::Array(items) => items.get(*index).ok_or(NavigateError::IndexOutOfRange {
                    path: prefix,
                    index: *index,
                })?,
                _ => return Err(NavigateError::NotAList(prefix)),
            };
        }
    }
    Ok(if current.is_null() { None } else { Some(current) })
}

/// True for null, false, 0, "" and empty collections
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Substitutes `{name}` placeholders in a URL template
pub fn replace_vars<F>(template: &str, lookup: F) -> Result<String, NavigateError>
where
    F: Fn(&str) -> Option<String>,
{
    static VARS: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = VARS.get_or_init(|| Regex::new(r"\{(\w+)\}").ok()).as_ref() else {
        return Ok(template.to_string());
    };

    let mut missing = None;
    let replaced = pattern.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(NavigateError::MissingVar(name)),
        None => Ok(replaced.into_owned()),
    }
}
