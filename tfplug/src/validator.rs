//! Built-in attribute validators
//!
//! Validators run during configuration validation on known, non-null values.
//! Null and unknown values always pass; presence is checked by `required`.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};
use std::sync::Arc;

fn respond(diagnostic: Option<Diagnostic>) -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: diagnostic.into_iter().collect(),
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Arc<dyn Validator> {
        Arc::new(Self { min, max })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return respond(None);
        };
        let len = s.chars().count();
        if let Some(min) = self.min {
            if len < min {
                return respond(Some(
                    Diagnostic::error(
                        format!("{} must have minimum length of {}", request.path, min),
                        format!("Got length {}", len),
                    )
                    .with_attribute(request.path),
                ));
            }
        }
        if let Some(max) = self.max {
            if len > max {
                return respond(Some(
                    Diagnostic::error(
                        format!("{} must have maximum length of {}", request.path, max),
                        format!("Got length {}", len),
                    )
                    .with_attribute(request.path),
                ));
            }
        }
        respond(None)
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn create(pattern: regex::Regex, description: &str) -> Arc<dyn Validator> {
        Arc::new(Self {
            pattern,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match request.config_value.value.as_str() {
            Some(s) if !self.pattern.is_match(s) => respond(Some(
                Diagnostic::error(
                    format!("{} must match {}", request.path, self.description),
                    format!("Value '{}' does not match pattern", s),
                )
                .with_attribute(request.path),
            )),
            _ => respond(None),
        }
    }
}

/// Accepts only one of a fixed set of strings
pub struct StringInSliceValidator {
    pub values: Vec<String>,
    pub ignore_case: bool,
}

impl StringInSliceValidator {
    pub fn create(values: &[&str], ignore_case: bool) -> Arc<dyn Validator> {
        Arc::new(Self {
            values: values.iter().map(|v| v.to_string()).collect(),
            ignore_case,
        })
    }
}

impl Validator for StringInSliceValidator {
    fn description(&self) -> String {
        format!("value must be one of {:?}", self.values)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return respond(None);
        };
        let found = self.values.iter().any(|v| {
            if self.ignore_case {
                v.eq_ignore_ascii_case(s)
            } else {
                v == s
            }
        });
        if found {
            respond(None)
        } else {
            respond(Some(
                Diagnostic::error(
                    format!("expected {} to be one of {:?}", request.path, self.values),
                    format!("got {}", s),
                )
                .with_attribute(request.path),
            ))
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn create(min: Option<f64>, max: Option<f64>) -> Arc<dyn Validator> {
        Arc::new(Self { min, max })
    }

    /// Inclusive integer range
    pub fn int_between(min: i64, max: i64) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: Some(min as f64),
            max: Some(max as f64),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(n) = request.config_value.value.as_number() else {
            return respond(None);
        };
        let below = self.min.is_some_and(|min| n < min);
        let above = self.max.is_some_and(|max| n > max);
        if below || above {
            return respond(Some(
                Diagnostic::error(
                    format!(
                        "expected {} to be in the range ({} - {})",
                        request.path,
                        self.min.map_or("-inf".to_string(), |v| v.to_string()),
                        self.max.map_or("inf".to_string(), |v| v.to_string()),
                    ),
                    format!("got {}", n),
                )
                .with_attribute(request.path),
            ));
        }
        respond(None)
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Arc<dyn Validator> {
        Arc::new(Self { min, max })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Dynamic::List(items) = &request.config_value.value else {
            return respond(None);
        };
        if let Some(min) = self.min {
            if items.len() < min {
                return respond(Some(
                    Diagnostic::error(
                        format!("{} must have at least {} items", request.path, min),
                        format!("Got {} items", items.len()),
                    )
                    .with_attribute(request.path),
                ));
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                return respond(Some(
                    Diagnostic::error(
                        format!("{} must have at most {} items", request.path, max),
                        format!("Got {} items", items.len()),
                    )
                    .with_attribute(request.path),
                ));
            }
        }
        respond(None)
    }
}

/// The string must parse as a JSON document
pub struct JsonStringValidator;

impl JsonStringValidator {
    pub fn create() -> Arc<dyn Validator> {
        Arc::new(Self)
    }
}

impl Validator for JsonStringValidator {
    fn description(&self) -> String {
        "value must be valid JSON".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = request.config_value.value.as_str() else {
            return respond(None);
        };
        match serde_json::from_str::<serde_json::Value>(s) {
            Ok(_) => respond(None),
            Err(e) => respond(Some(
                Diagnostic::error(
                    format!("{} contains an invalid JSON", request.path),
                    e.to_string(),
                )
                .with_attribute(request.path),
            )),
        }
    }
}

/// The string (or every string of a list) must be an IPv4 or IPv6 address
pub struct IpAddressValidator;

impl IpAddressValidator {
    pub fn create() -> Arc<dyn Validator> {
        Arc::new(Self)
    }

    fn check(value: &Dynamic) -> Option<String> {
        match value {
            Dynamic::String(s) if s.parse::<std::net::IpAddr>().is_err() => Some(s.clone()),
            Dynamic::List(items) => items.iter().find_map(Self::check),
            _ => None,
        }
    }
}

impl Validator for IpAddressValidator {
    fn description(&self) -> String {
        "value must be an IP address".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match Self::check(&request.config_value.value) {
            Some(bad) => respond(Some(
                Diagnostic::error(
                    format!("{} must contain a valid IP address", request.path),
                    format!("got {}", bad),
                )
                .with_attribute(request.path),
            )),
            None => respond(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn run(validator: &Arc<dyn Validator>, value: Dynamic) -> Vec<Diagnostic> {
        validator
            .validate(ValidatorRequest {
                config_value: DynamicValue::new(value),
                path: AttributePath::new("field"),
            })
            .diagnostics
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator::create(Some(5), None);
        let diags = run(&validator, Dynamic::string("hi"));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length of 5"));
        assert!(run(&validator, Dynamic::string("hello")).is_empty());
    }

    #[test]
    fn string_pattern_validator_matches() {
        let validator =
            StringPatternValidator::create(regex::Regex::new("^[a-z]+$").unwrap(), "lowercase");
        assert!(run(&validator, Dynamic::string("abc")).is_empty());
        assert_eq!(run(&validator, Dynamic::string("ABC")).len(), 1);
    }

    #[test]
    fn string_in_slice_honours_case_flag() {
        let insensitive =
            StringInSliceValidator::create(&["MySQL", "PostgreSQL", "SQLServer"], true);
        assert!(run(&insensitive, Dynamic::string("mysql")).is_empty());
        assert_eq!(run(&insensitive, Dynamic::string("oracle")).len(), 1);

        let sensitive = StringInSliceValidator::create(&["HTTP", "TCP"], false);
        assert_eq!(run(&sensitive, Dynamic::string("http")).len(), 1);
    }

    #[test]
    fn number_range_validator_is_inclusive() {
        let validator = NumberRangeValidator::int_between(5, 2000);
        assert!(run(&validator, Dynamic::Number(5.0)).is_empty());
        assert!(run(&validator, Dynamic::Number(2000.0)).is_empty());
        assert_eq!(run(&validator, Dynamic::Number(4.0)).len(), 1);
        assert_eq!(run(&validator, Dynamic::Number(2001.0)).len(), 1);
    }

    #[test]
    fn list_length_validator_enforces_bounds() {
        let validator = ListLengthValidator::create(None, Some(1));
        let two = Dynamic::string_list(&["a", "b"]);
        assert_eq!(run(&validator, two).len(), 1);
        assert!(run(&validator, Dynamic::string_list(&["a"])).is_empty());
    }

    #[test]
    fn json_validator_reports_parse_errors() {
        let validator = JsonStringValidator::create();
        assert!(run(&validator, Dynamic::string(r#"{"Version":"2008-10-17"}"#)).is_empty());
        assert_eq!(run(&validator, Dynamic::string("{not json")).len(), 1);
    }

    #[test]
    fn ip_validator_checks_list_elements() {
        let validator = IpAddressValidator::create();
        assert!(run(&validator, Dynamic::string_list(&["80.158.1.1"])).is_empty());
        assert!(run(&validator, Dynamic::string("::1")).is_empty());
        assert_eq!(
            run(&validator, Dynamic::string_list(&["80.158.1.1", "nope"])).len(),
            1
        );
    }

    #[test]
    fn null_and_unknown_always_pass() {
        let validator = StringLengthValidator::create(Some(1), None);
        assert!(run(&validator, Dynamic::Null).is_empty());
        assert!(run(&validator, Dynamic::Unknown).is_empty());
    }
}
