//! Default value providers for attributes
//!
//! Defaults are evaluated during planning (and provider configuration) when an
//! optional attribute is null in configuration. They never override a value
//! the user set.

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;
use std::sync::Arc;

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    /// Create a new static default provider with the given value
    pub fn create(value: Dynamic) -> Arc<dyn Default> {
        Arc::new(Self { value })
    }

    pub fn string(value: &str) -> Arc<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Arc<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Arc<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EnvKind {
    String,
    Number,
    Bool,
}

/// EnvDefault reads the first set environment variable from a list, falling
/// back to a fixed value. Mirrors the `MultiEnvDefaultFunc` convention of
/// provider blocks (`OS_TENANT_NAME` then `OS_PROJECT_NAME`, ...).
pub struct EnvDefault {
    env_vars: Vec<String>,
    fallback: Dynamic,
    kind: EnvKind,
}

impl EnvDefault {
    /// String default from a single environment variable
    pub fn create(env_var: &str, fallback: &str) -> Arc<dyn Default> {
        Self::any_of(&[env_var], Some(fallback))
    }

    /// String default from the first set variable; null when none is set and
    /// there is no fallback
    pub fn any_of(env_vars: &[&str], fallback: Option<&str>) -> Arc<dyn Default> {
        Arc::new(Self {
            env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
            fallback: fallback.map_or(Dynamic::Null, Dynamic::string),
            kind: EnvKind::String,
        })
    }

    pub fn number(env_vars: &[&str], fallback: f64) -> Arc<dyn Default> {
        Arc::new(Self {
            env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
            fallback: Dynamic::Number(fallback),
            kind: EnvKind::Number,
        })
    }

    pub fn bool(env_vars: &[&str], fallback: bool) -> Arc<dyn Default> {
        Arc::new(Self {
            env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
            fallback: Dynamic::Bool(fallback),
            kind: EnvKind::Bool,
        })
    }

    fn parse(&self, raw: String) -> Option<Dynamic> {
        match self.kind {
            EnvKind::String => Some(Dynamic::String(raw)),
            EnvKind::Number => raw.trim().parse::<f64>().ok().map(Dynamic::Number),
            EnvKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Some(Dynamic::Bool(true)),
                "0" | "false" => Some(Dynamic::Bool(false)),
                _ => None,
            },
        }
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        format!(
            "default from environment variables {} (fallback: {:?})",
            self.env_vars.join(", "),
            self.fallback
        )
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = self
            .env_vars
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|raw| !raw.is_empty())
            .and_then(|raw| self.parse(raw))
            .unwrap_or_else(|| self.fallback.clone());

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    fn evaluate(default: &Arc<dyn Default>) -> Dynamic {
        default
            .default_value(DefaultRequest {
                path: AttributePath::new("test"),
            })
            .value
            .value
    }

    #[test]
    fn static_defaults() {
        assert_eq!(evaluate(&StaticDefault::string("x")), Dynamic::string("x"));
        assert_eq!(evaluate(&StaticDefault::number(0.0)), Dynamic::Number(0.0));
        assert_eq!(evaluate(&StaticDefault::bool(true)), Dynamic::Bool(true));
    }

    #[test]
    fn env_default_with_fallback() {
        let default = EnvDefault::create("TFPLUG_TEST_UNSET_VAR_A", "fallback");
        assert_eq!(evaluate(&default), Dynamic::string("fallback"));
    }

    #[test]
    fn env_default_takes_first_set_variable() {
        env::set_var("TFPLUG_TEST_SECOND_VAR", "second");
        let default = EnvDefault::any_of(
            &["TFPLUG_TEST_UNSET_VAR_B", "TFPLUG_TEST_SECOND_VAR"],
            None,
        );
        assert_eq!(evaluate(&default), Dynamic::string("second"));
        env::remove_var("TFPLUG_TEST_SECOND_VAR");
    }

    #[test]
    fn env_default_without_fallback_is_null() {
        let default = EnvDefault::any_of(&["TFPLUG_TEST_UNSET_VAR_C"], None);
        assert_eq!(evaluate(&default), Dynamic::Null);
    }

    #[test]
    fn typed_env_defaults_parse_values() {
        env::set_var("TFPLUG_TEST_NUMBER_VAR", "7");
        env::set_var("TFPLUG_TEST_BOOL_VAR", "true");
        env::set_var("TFPLUG_TEST_BAD_NUMBER_VAR", "seven");

        assert_eq!(
            evaluate(&EnvDefault::number(&["TFPLUG_TEST_NUMBER_VAR"], 3.0)),
            Dynamic::Number(7.0)
        );
        assert_eq!(
            evaluate(&EnvDefault::bool(&["TFPLUG_TEST_BOOL_VAR"], false)),
            Dynamic::Bool(true)
        );
        assert_eq!(
            evaluate(&EnvDefault::number(&["TFPLUG_TEST_BAD_NUMBER_VAR"], 3.0)),
            Dynamic::Number(3.0)
        );

        env::remove_var("TFPLUG_TEST_NUMBER_VAR");
        env::remove_var("TFPLUG_TEST_BOOL_VAR");
        env::remove_var("TFPLUG_TEST_BAD_NUMBER_VAR");
    }
}
