//! WAF policy rule resources

pub mod resource_webtamperprotection_rule_v1;
pub mod resource_whiteblackip_rule_v1;

pub use resource_webtamperprotection_rule_v1::WafWebTamperProtectionRuleV1Resource;
pub use resource_whiteblackip_rule_v1::WafWhiteBlackIpRuleV1Resource;

use tfplug::context::Context;
use tfplug::import::{import_state_composite_id, import_state_passthrough_id};
use tfplug::resource::{ImportResourceStateRequest, ImportResourceStateResponse};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::Client;
use crate::provider_data::OtcProviderData;

/// Rules are addressed as `<policy_id>/<id>`. A bare `<id>` is accepted too;
/// the policy then comes from configuration on the next apply.
pub(crate) fn import_policy_rule(
    ctx: &Context,
    request: &ImportResourceStateRequest,
) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse {
        imported_resources: vec![],
        diagnostics: vec![],
    };
    if request.id.contains('/') {
        import_state_composite_id(ctx, '/', &["policy_id", "id"], request, &mut response);
    } else {
        import_state_passthrough_id(ctx, AttributePath::new("id"), request, &mut response);
    }
    response
}

/// The `(policy_id, id)` pair of a rule in state
pub(crate) fn rule_ids(state: &DynamicValue) -> (Option<String>, Option<String>) {
    let get = |name: &str| {
        state
            .get_string(&AttributePath::new(name))
            .ok()
            .filter(|s| !s.is_empty())
    };
    (get("policy_id"), get("id"))
}

pub(crate) fn waf_client(
    provider_data: &OtcProviderData,
    state: &DynamicValue,
) -> Result<Client, Diagnostic> {
    let region = provider_data.config.get_region(state);
    provider_data.config.waf_v1_client(&region).map_err(|e| {
        Diagnostic::error("Error creating OpenTelekomCloud WAF client", e.to_string())
    })
}
