//! Comparing JSON access policies by meaning rather than by text

use serde_json::{Map, Value};

const LIST_KEYS: &[&str] = &["Action", "NotAction", "Resource", "NotResource"];

fn as_sorted_list(value: &Value) -> Value {
    let mut items = match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    items.sort_by_key(|v| v.to_string());
    Value::Array(items)
}

fn normalize_principal(value: &Value) -> Value {
    match value {
        Value::Object(principals) => Value::Object(
            principals
                .iter()
                .map(|(k, v)| (k.clone(), as_sorted_list(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn normalize_statement(statement: &Value) -> Value {
    let Value::Object(fields) = statement else {
        return statement.clone();
    };
    let mut normalized = Map::new();
    for (key, value) in fields {
        let value = if LIST_KEYS.contains(&key.as_str()) {
            as_sorted_list(value)
        } else if key == "Principal" || key == "NotPrincipal" {
            normalize_principal(value)
        } else {
            value.clone()
        };
        normalized.insert(key.clone(), value);
    }
    Value::Object(normalized)
}

fn normalize_policy(policy: Value) -> Value {
    let Value::Object(mut fields) = policy else {
        return policy;
    };
    if let Some(statement) = fields.remove("Statement") {
        let mut statements: Vec<Value> = match statement {
            Value::Array(items) => items.iter().map(normalize_statement).collect(),
            single => vec![normalize_statement(&single)],
        };
        statements.sort_by_key(|v| v.to_string());
        fields.insert("Statement".to_string(), Value::Array(statements));
    }
    Value::Object(fields)
}

/// True when both documents parse and describe the same policy. Statement
/// order, single-value lists and list order do not matter.
pub fn policy_equivalent(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(left), Ok(right)) => normalize_policy(left) == normalize_policy(right),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_single_element_lists_match() {
        let a = r#"{"Version":"2008-10-17","Statement":{"Effect":"Allow","Action":"s3:GetObject","Principal":{"ID":"*"},"Resource":"arn:aws:s3:::b/*"}}"#;
        let b = r#"{
            "Version": "2008-10-17",
            "Statement": [{
                "Resource": ["arn:aws:s3:::b/*"],
                "Principal": {"ID": ["*"]},
                "Action": ["s3:GetObject"],
                "Effect": "Allow"
            }]
        }"#;
        assert!(policy_equivalent(a, b));
    }

    #[test]
    fn list_order_is_ignored_but_content_is_not() {
        let a = r#"{"Statement":[{"Effect":"Allow","Action":["s3:GetObject","s3:PutObject"]}]}"#;
        let b = r#"{"Statement":[{"Effect":"Allow","Action":["s3:PutObject","s3:GetObject"]}]}"#;
        let c = r#"{"Statement":[{"Effect":"Deny","Action":["s3:PutObject","s3:GetObject"]}]}"#;
        assert!(policy_equivalent(a, b));
        assert!(!policy_equivalent(a, c));
    }

    #[test]
    fn invalid_json_never_matches() {
        assert!(!policy_equivalent("{", "{"));
    }
}
