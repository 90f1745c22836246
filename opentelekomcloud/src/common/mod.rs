//! Helpers shared by resources and data sources

pub mod navigate;
pub mod policy;
pub mod tags;
pub mod versions;

use std::collections::HashMap;

use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::ApiError;

pub use navigate::{is_empty_value, navigate_value, replace_vars, NavigateError};
pub use policy::policy_equivalent;
pub use tags::{diff_tags, set_tags_for_instance, tag_ignored, tags_from_map, tags_to_map};
pub use versions::sort_versions;

pub fn provider_not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// Read-path handling of an API error: a 404 means the object is gone and
/// leaves state, anything else is reported
pub fn check_deleted(err: ApiError, what: &str) -> Result<Option<DynamicValue>, Diagnostic> {
    if err.is_not_found() {
        tracing::warn!("{} not found, removing from state", what);
        return Ok(None);
    }
    Err(Diagnostic::error(
        format!("Error retrieving OpenTelekomCloud {}", what),
        err.to_string(),
    ))
}

/// A string attribute, treating null and "" as unset
pub fn string_attr(value: &DynamicValue, name: &str) -> Option<String> {
    value
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
}

/// Free-form `value_specs` merged into request bodies
pub fn map_value_specs(config: &DynamicValue) -> HashMap<String, String> {
    config
        .get_string_map(&AttributePath::new("value_specs"))
        .unwrap_or_default()
}
