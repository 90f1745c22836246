//! Common types and utilities for the OpenTelekomCloud APIs

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Pulls the cloud error code out of an error body. JSON bodies carry it as
/// `error_code`, `code`, `errCode` or nested under `error`; S3 bodies carry
/// an XML `<Code>` element.
pub fn extract_error_code(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return json_error_code(&value);
    }

    static XML_CODE: OnceLock<Option<Regex>> = OnceLock::new();
    XML_CODE
        .get_or_init(|| Regex::new(r"<Code>([^<]+)</Code>").ok())
        .as_ref()
        .and_then(|re| re.captures(body))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn json_error_code(value: &serde_json::Value) -> Option<String> {
    let object = value.as_object()?;

    for key in ["error_code", "errCode", "code"] {
        match object.get(key) {
            Some(serde_json::Value::String(code)) if !code.is_empty() => return Some(code.clone()),
            _ => {}
        }
    }

    // Nova/Neutron style: {"itemNotFound": {"code": 404, ...}} or {"error": {"code": "..."}}
    object.values().find_map(|nested| {
        let nested = nested.as_object()?;
        match nested.get("code").or_else(|| nested.get("type")) {
            Some(serde_json::Value::String(code)) if !code.is_empty() => Some(code.clone()),
            _ => None,
        }
    })
}

/// Accepts numbers sent either as JSON numbers or as strings
pub mod string_or_i64 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrI64 {
            String(String),
            I64(i64),
        }

        match Option::<StringOrI64>::deserialize(deserializer)? {
            Some(StringOrI64::String(s)) if s.is_empty() => Ok(None),
            Some(StringOrI64::String(s)) => {
                s.parse::<i64>().map(Some).map_err(serde::de::Error::custom)
            }
            Some(StringOrI64::I64(i)) => Ok(Some(i)),
            None => Ok(None),
        }
    }
}

/// Treats a JSON null like a missing field for `#[serde(default)]` strings
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
