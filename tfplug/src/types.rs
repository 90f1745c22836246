//! Core type system for tfplug
//!
//! This module provides the value types passed between the host and handlers:
//! Dynamic values, attribute paths and diagnostics.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

const UNKNOWN_MARKER: &str = "__unknown__";

impl Dynamic {
    pub fn string(value: impl Into<String>) -> Self {
        Dynamic::String(value.into())
    }

    pub fn string_list<S: AsRef<str>>(values: &[S]) -> Self {
        Dynamic::List(
            values
                .iter()
                .map(|v| Dynamic::String(v.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn string_map(values: &HashMap<String, String>) -> Self {
        Dynamic::Map(
            values
                .iter()
                .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True when the value or anything nested inside it is unknown
    pub fn contains_unknown(&self) -> bool {
        match self {
            Dynamic::Unknown => true,
            Dynamic::List(items) => items.iter().any(Dynamic::contains_unknown),
            Dynamic::Map(map) => map.values().any(Dynamic::contains_unknown),
            _ => false,
        }
    }

    /// Zero-value check mirroring Go's `GetOk`: null, unknown, "", 0, false
    /// and empty collections all count as unset
    pub fn is_zero(&self) -> bool {
        match self {
            Dynamic::Null | Dynamic::Unknown => true,
            Dynamic::Bool(b) => !b,
            Dynamic::Number(n) => *n == 0.0,
            Dynamic::String(s) => s.is_empty(),
            Dynamic::List(l) => l.is_empty(),
            Dynamic::Map(m) => m.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    /// Convert into a JSON value. Integral numbers become JSON integers so API
    /// payloads carry `5432` rather than `5432.0`; unknowns become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Dynamic::Null | Dynamic::Unknown => serde_json::Value::Null,
            Dynamic::Bool(b) => serde_json::Value::Bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Dynamic::String(s) => serde_json::Value::String(s.clone()),
            Dynamic::List(l) => serde_json::Value::Array(l.iter().map(Dynamic::to_json).collect()),
            Dynamic::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Dynamic::Null,
            serde_json::Value::Bool(b) => Dynamic::Bool(*b),
            serde_json::Value::Number(n) => Dynamic::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Dynamic::String(s.clone()),
            serde_json::Value::Array(a) => Dynamic::List(a.iter().map(Dynamic::from_json).collect()),
            serde_json::Value::Object(o) => Dynamic::Map(
                o.iter()
                    .map(|(k, v)| (k.clone(), Dynamic::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str(UNKNOWN_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                if value == UNKNOWN_MARKER {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Dynamic, E> {
                if value == UNKNOWN_MARKER {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps Dynamic and provides encoding/decoding capabilities
/// This is what gets passed between the host and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    pub fn unknown() -> Self {
        Self {
            value: Dynamic::Unknown,
        }
    }

    /// An empty object, the starting point for building state
    pub fn object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    /// State is persisted as msgpack, matching what Terraform stores
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        match &self.value {
            Dynamic::Null => Ok(vec![]),
            _ => rmp_serde::encode::to_vec(&self.value)
                .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e))),
        }
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        rmp_serde::decode::from_slice::<Dynamic>(data)
            .map(Self::new)
            .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.value.to_json()
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::new(Dynamic::from_json(value))
    }

    /// Raw access without type checking. Missing paths yield None.
    pub fn get(&self, path: &AttributePath) -> Option<&Dynamic> {
        self.navigate_path(path).ok()
    }

    /// Type-safe accessors - ALWAYS use these instead of pattern matching
    /// These handle path navigation and type checking
    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::String(s) => Ok(s.clone()),
            _ => Err(type_mismatch("string", value)),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::Number(n) => Ok(*n),
            _ => Err(type_mismatch("number", value)),
        }
    }

    pub fn get_i64(&self, path: &AttributePath) -> Result<i64> {
        self.get_number(path).map(|n| n as i64)
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::Bool(b) => Ok(*b),
            _ => Err(type_mismatch("bool", value)),
        }
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::List(l) => Ok(l.clone()),
            _ => Err(type_mismatch("list", value)),
        }
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        let value = self.navigate_path(path)?;
        match value {
            Dynamic::Map(m) => Ok(m.clone()),
            _ => Err(type_mismatch("map", value)),
        }
    }

    pub fn get_string_list(&self, path: &AttributePath) -> Result<Vec<String>> {
        self.get_list(path)?
            .iter()
            .map(|item| match item {
                Dynamic::String(s) => Ok(s.clone()),
                other => Err(type_mismatch("string", other)),
            })
            .collect()
    }

    pub fn get_string_map(&self, path: &AttributePath) -> Result<HashMap<String, String>> {
        self.get_map(path)?
            .into_iter()
            .map(|(k, v)| match v {
                Dynamic::String(s) => Ok((k, s)),
                other => Err(type_mismatch("string", &other)),
            })
            .collect()
    }

    /// True when the attribute is set to a non-zero value
    pub fn has_value(&self, path: &AttributePath) -> bool {
        self.get(path).is_some_and(|v| !v.is_zero())
    }

    /// Type-safe setters - Use for building state/config objects
    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::List(value))
    }

    pub fn set_map(&mut self, path: &AttributePath, value: HashMap<String, Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::Map(value))
    }

    pub fn set(&mut self, path: &AttributePath, value: Dynamic) -> Result<()> {
        self.set_value(path, value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.value, Dynamic::Unknown)
    }

    /// Mark computed values as unknown during planning
    pub fn mark_unknown(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Unknown)
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => l
                    .get(*idx as usize)
                    .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?,
                (Dynamic::Null, _) => {
                    return Err(TfplugError::AttributeNotFound(path.to_string()))
                }
                _ => {
                    return Err(TfplugError::Custom(format!(
                        "invalid path navigation at {}",
                        path
                    )))
                }
            };
        }

        Ok(current)
    }

    fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        if path.steps.is_empty() {
            self.value = new_value;
            return Ok(());
        }

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        let last_idx = path.steps.len() - 1;

        for (idx, step) in path.steps.iter().enumerate() {
            // Intermediate nulls are replaced by the container the next step needs
            if current.is_null() {
                *current = match step {
                    AttributePathStep::ElementKeyInt(_) => Dynamic::List(Vec::new()),
                    _ => Dynamic::Map(HashMap::new()),
                };
            }

            if idx == last_idx {
                return match (current, step) {
                    (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                    | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                        m.insert(name.clone(), new_value);
                        Ok(())
                    }
                    (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                        let i = *i as usize;
                        if i < l.len() {
                            l[i] = new_value;
                            Ok(())
                        } else if i == l.len() {
                            l.push(new_value);
                            Ok(())
                        } else {
                            Err(TfplugError::Custom(format!("list index {} out of bounds", i)))
                        }
                    }
                    _ => Err(TfplugError::Custom(format!(
                        "invalid path navigation at {}",
                        path
                    ))),
                };
            }

            let next_container = match path.steps.get(idx + 1) {
                Some(AttributePathStep::ElementKeyInt(_)) => Dynamic::List(Vec::new()),
                _ => Dynamic::Map(HashMap::new()),
            };

            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    m.entry(name.clone()).or_insert(next_container)
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                    let i = *i as usize;
                    if i == l.len() {
                        l.push(next_container);
                    }
                    l.get_mut(i).ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds", i))
                    })?
                }
                _ => {
                    return Err(TfplugError::Custom(format!(
                        "invalid path navigation at {}",
                        path
                    )))
                }
            };
        }

        Err(TfplugError::Custom("failed to set value".to_string()))
    }
}

fn type_mismatch(expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .steps
            .iter()
            .map(|step| match step {
                AttributePathStep::AttributeName(name) => name.clone(),
                AttributePathStep::ElementKeyString(key) => key.clone(),
                AttributePathStep::ElementKeyInt(idx) => idx.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(path) => write!(f, "{}: {} ({})", self.summary, self.detail, path),
            None if self.detail.is_empty() => write!(f, "{}", self.summary),
            None => write!(f, "{}: {}", self.summary, self.detail),
        }
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Invalid,
    Error,
    Warning,
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;
