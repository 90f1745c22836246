//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state.
///
/// Example: ID "3c0ac0d9-..." -> state.id = "3c0ac0d9-..."
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

/// Splits a composite import ID such as `<policy_id>/<rule_id>` and stores
/// each part under the matching attribute. The number of parts must match.
pub fn import_state_composite_id(
    _ctx: &Context,
    separator: char,
    attributes: &[&str],
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let parts: Vec<&str> = request.id.split(separator).collect();
    if parts.len() != attributes.len() || parts.iter().any(|p| p.is_empty()) {
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!(
                "Expected import ID in the format '{}', got '{}'",
                attributes.join(&separator.to_string()),
                request.id
            ),
        ));
        return;
    }

    let mut state = DynamicValue::object();
    for (attr, part) in attributes.iter().zip(parts) {
        if let Err(e) = state.set_string(&AttributePath::new(attr), part.to_string()) {
            response.diagnostics.push(Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}'", attr),
            ));
            return;
        }
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "test_resource".to_string(),
            id: id.to_string(),
        }
    }

    fn empty_response() -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        }
    }

    #[test]
    fn passthrough_sets_id() {
        let mut response = empty_response();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("abc"),
            &mut response,
        );

        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "abc"
        );
    }

    #[test]
    fn composite_id_is_split_into_attributes() {
        let mut response = empty_response();
        import_state_composite_id(
            &Context::new(),
            '/',
            &["policy_id", "id"],
            &request("policy-1/rule-2"),
            &mut response,
        );

        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("policy_id")).unwrap(),
            "policy-1"
        );
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "rule-2");
    }

    #[test]
    fn composite_id_rejects_wrong_shape() {
        let mut response = empty_response();
        import_state_composite_id(
            &Context::new(),
            '/',
            &["policy_id", "id"],
            &request("rule-2"),
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
    }
}
