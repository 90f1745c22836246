//! Built-in plan modifiers
//!
//! Plan modifiers run after the host has built the proposed plan and can:
//! - Modify the planned value
//! - Mark an attribute as requiring replacement
//! - Add warnings or errors to the plan

use crate::host::semantically_equal;
use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic, DynamicValue};
use std::sync::Arc;

/// Marks an attribute as requiring replacement when it changes (ForceNew)
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "requires replacement when the value changes".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // Creation never reaches here; a null prior attribute is just unset
        let state = &request.state_value.value;
        let plan = &request.plan_value.value;
        let requires_replace = !matches!((state, plan), (Dynamic::Null, Dynamic::Null))
            && !state.contains_unknown()
            && !plan.contains_unknown()
            && !semantically_equal(state, plan);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Uses the current state value when the planned value is unknown
///
/// Useful for computed attributes that do not change once the object exists,
/// such as identifiers and creation timestamps.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "keeps the prior state value while the planned value is unknown".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

pub struct RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    predicate: F,
    description: String,
}

impl<F> RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync + 'static,
{
    pub fn create(predicate: F, description: impl Into<String>) -> Arc<dyn PlanModifier> {
        Arc::new(Self {
            predicate,
            description: description.into(),
        })
    }
}

impl<F> PlanModifier for RequiresReplaceIf<F>
where
    F: Fn(&PlanModifierRequest) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let mut diagnostics = vec![];
        let requires_replace = !request.state_value.is_null() && (self.predicate)(&request);

        if requires_replace {
            diagnostics.push(Diagnostic::warning(
                format!("Attribute '{}' requires resource replacement", request.path),
                self.description.clone(),
            ));
        }

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics,
        }
    }
}

/// Keeps the prior state value when the predicate says the old and new values
/// are semantically equal, so formatting-only edits plan no change
pub struct SuppressDiffIf<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    equivalent: F,
    description: String,
}

impl<F> SuppressDiffIf<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync + 'static,
{
    pub fn create(equivalent: F, description: impl Into<String>) -> Arc<dyn PlanModifier> {
        Arc::new(Self {
            equivalent,
            description: description.into(),
        })
    }
}

impl<F> PlanModifier for SuppressDiffIf<F>
where
    F: Fn(&Dynamic, &Dynamic) -> bool + Send + Sync,
{
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let suppress = !request.state_value.is_null()
            && !request.plan_value.is_unknown()
            && (self.equivalent)(&request.state_value.value, &request.plan_value.value);

        let plan_value = if suppress {
            DynamicValue::new(request.state_value.value)
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Compare two Dynamic values for equality, treating numbers with tolerance
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}
