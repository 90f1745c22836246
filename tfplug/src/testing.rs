//! Acceptance test harness
//!
//! A [`TestCase`] runs configuration steps through a [`ProviderHost`]:
//! each step plans and applies its blocks, runs checks against the
//! resulting state and requires a follow-up plan to be empty. After the last
//! step every resource is destroyed and `check_destroy` confirms the remote
//! objects are gone.
//!
//! State is persisted between steps in msgpack form and checks work on the
//! flattened attribute view (`tags.%`, `nodes.#`, `db.0.port`).

use crate::host::{PlanAction, ProviderHost};
use crate::provider::Provider;
use crate::types::{has_errors, Diagnostic, Dynamic, DynamicValue};
use futures::future::BoxFuture;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write as _;

pub type CheckFn = Box<dyn Fn(&TestState) -> Result<(), String> + Send + Sync>;
pub type CheckDestroyFn = Box<dyn Fn(TestState) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;
pub type PreCheckFn = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("pre-check failed: {0}")]
    PreCheck(String),

    #[error("provider configuration failed: {0}")]
    Configure(String),

    #[error("step {step}: {message}")]
    Step { step: usize, message: String },

    #[error("destroy failed: {0}")]
    Destroy(String),

    #[error("check destroy failed: {0}")]
    CheckDestroy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Resource,
    Data,
}

#[derive(Debug, Clone)]
pub struct ConfigBlock {
    pub kind: BlockKind,
    pub type_name: String,
    pub name: String,
    pub config: serde_json::Value,
}

impl ConfigBlock {
    /// `type.name` for resources, `data.type.name` for data sources
    pub fn address(&self) -> String {
        match self.kind {
            BlockKind::Resource => format!("{}.{}", self.type_name, self.name),
            BlockKind::Data => format!("data.{}.{}", self.type_name, self.name),
        }
    }
}

/// Ordered set of `resource` and `data` blocks. String values may reference
/// earlier blocks with `${address.attribute}` interpolations.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub blocks: Vec<ConfigBlock>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, type_name: &str, name: &str, config: serde_json::Value) -> Self {
        self.blocks.push(ConfigBlock {
            kind: BlockKind::Resource,
            type_name: type_name.to_string(),
            name: name.to_string(),
            config,
        });
        self
    }

    pub fn data(mut self, type_name: &str, name: &str, config: serde_json::Value) -> Self {
        self.blocks.push(ConfigBlock {
            kind: BlockKind::Data,
            type_name: type_name.to_string(),
            name: name.to_string(),
            config,
        });
        self
    }
}

#[derive(Default)]
pub struct TestStep {
    pub config: Configuration,
    pub check: Option<CheckFn>,
    pub plan_only: bool,
    pub expect_non_empty_plan: bool,
    pub expect_error: Option<Regex>,
    pub import_state: bool,
    /// Address of the resource an import step imports
    pub resource_name: String,
    /// Import ID; defaults to the `id` attribute of the resource in state
    pub import_state_id: Option<String>,
    pub import_state_verify: bool,
    pub import_state_verify_ignore: Vec<String>,
}

impl TestStep {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Import `address` and compare with the state the previous steps built
    pub fn import(address: &str) -> Self {
        Self {
            import_state: true,
            resource_name: address.to_string(),
            ..Self::default()
        }
    }

    pub fn check(mut self, check: CheckFn) -> Self {
        self.check = Some(check);
        self
    }

    pub fn plan_only(mut self) -> Self {
        self.plan_only = true;
        self
    }

    pub fn expect_non_empty_plan(mut self) -> Self {
        self.expect_non_empty_plan = true;
        self
    }

    pub fn expect_error(mut self, pattern: Regex) -> Self {
        self.expect_error = Some(pattern);
        self
    }

    pub fn import_state_id(mut self, id: &str) -> Self {
        self.import_state_id = Some(id.to_string());
        self
    }

    pub fn import_state_verify(mut self, ignore: &[&str]) -> Self {
        self.import_state_verify = true;
        self.import_state_verify_ignore = ignore.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Default)]
pub struct TestCase {
    /// Runs even without `TF_ACC`, for tests against mocked endpoints
    pub is_unit_test: bool,
    pub pre_check: Option<PreCheckFn>,
    pub provider_config: serde_json::Value,
    pub steps: Vec<TestStep>,
    pub check_destroy: Option<CheckDestroyFn>,
}

#[derive(Debug, Clone)]
struct StateEntry {
    kind: BlockKind,
    type_name: String,
    encoded: Vec<u8>,
}

/// State of every object the test has created, keyed by address
#[derive(Debug, Clone, Default)]
pub struct TestState {
    entries: HashMap<String, StateEntry>,
    order: Vec<String>,
}

impl TestState {
    fn insert(&mut self, kind: BlockKind, address: &str, type_name: &str, state: &DynamicValue) -> Result<(), String> {
        let encoded = state.encode_msgpack().map_err(|e| e.to_string())?;
        if !self.entries.contains_key(address) {
            self.order.push(address.to_string());
        }
        self.entries.insert(
            address.to_string(),
            StateEntry {
                kind,
                type_name: type_name.to_string(),
                encoded,
            },
        );
        Ok(())
    }

    fn remove(&mut self, address: &str) {
        self.entries.remove(address);
        self.order.retain(|a| a != address);
    }

    fn type_name(&self, address: &str) -> Option<&str> {
        self.entries.get(address).map(|e| e.type_name.as_str())
    }

    /// Addresses of managed resources in creation order
    pub fn resources(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|a| {
                self.entries
                    .get(*a)
                    .is_some_and(|e| e.kind == BlockKind::Resource)
            })
            .cloned()
            .collect()
    }

    pub fn get(&self, address: &str) -> Option<DynamicValue> {
        self.entries
            .get(address)
            .and_then(|e| DynamicValue::decode_msgpack(&e.encoded).ok())
    }

    /// Flattened attributes of the object at `address`
    pub fn attributes(&self, address: &str) -> Option<HashMap<String, String>> {
        self.get(address).map(|state| flatmap(&state.value))
    }

    /// The `id` attribute of the object at `address`
    pub fn id(&self, address: &str) -> Option<String> {
        self.attributes(address)
            .and_then(|attrs| attrs.get("id").cloned())
    }

    /// Resource addresses of the given type
    pub fn of_type(&self, type_name: &str) -> Vec<String> {
        self.resources()
            .into_iter()
            .filter(|a| self.type_name(a) == Some(type_name))
            .collect()
    }
}

/// Flatten a value into `key -> string` pairs: lists add `key.#`, maps add
/// `key.%`, nested objects use dotted keys. Nulls are omitted.
pub fn flatmap(value: &Dynamic) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if let Dynamic::Map(map) = value {
        for (key, item) in map {
            flatten_into(key, item, false, &mut out);
        }
    }
    out
}

fn flatten_into(prefix: &str, value: &Dynamic, in_list: bool, out: &mut HashMap<String, String>) {
    match value {
        Dynamic::Null | Dynamic::Unknown => {}
        Dynamic::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Dynamic::Number(n) => {
            let text = if n.fract() == 0.0 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            };
            out.insert(prefix.to_string(), text);
        }
        Dynamic::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Dynamic::List(items) => {
            out.insert(format!("{}.#", prefix), items.len().to_string());
            for (idx, item) in items.iter().enumerate() {
                flatten_into(&format!("{}.{}", prefix, idx), item, true, out);
            }
        }
        Dynamic::Map(map) => {
            if !in_list {
                out.insert(format!("{}.%", prefix), map.len().to_string());
            }
            for (key, item) in map {
                flatten_into(&format!("{}.{}", prefix, key), item, false, out);
            }
        }
    }
}

fn is_count_key(key: &str) -> bool {
    key.ends_with(".#") || key.ends_with(".%")
}

/// The attribute at `key` equals `value`
pub fn check_resource_attr(address: &str, key: &str, value: &str) -> CheckFn {
    let (address, key, value) = (address.to_string(), key.to_string(), value.to_string());
    Box::new(move |state: &TestState| {
        let attrs = state
            .attributes(&address)
            .ok_or_else(|| format!("Not found: {}", address))?;
        match attrs.get(&key) {
            Some(actual) if *actual == value => Ok(()),
            None if value == "0" && is_count_key(&key) => Ok(()),
            Some(actual) => Err(format!(
                "{}: Attribute '{}' expected {:?}, got {:?}",
                address, key, value, actual
            )),
            None => Err(format!(
                "{}: Attribute '{}' expected {:?}, got nothing",
                address, key, value
            )),
        }
    })
}

/// The attribute at `key` is set to a non-empty value
pub fn check_resource_attr_set(address: &str, key: &str) -> CheckFn {
    let (address, key) = (address.to_string(), key.to_string());
    Box::new(move |state: &TestState| {
        let attrs = state
            .attributes(&address)
            .ok_or_else(|| format!("Not found: {}", address))?;
        match attrs.get(&key) {
            Some(value) if !value.is_empty() => Ok(()),
            _ => Err(format!("{}: Attribute '{}' expected to be set", address, key)),
        }
    })
}

/// The attribute at `key` is absent (or an empty collection)
pub fn check_no_resource_attr(address: &str, key: &str) -> CheckFn {
    let (address, key) = (address.to_string(), key.to_string());
    Box::new(move |state: &TestState| {
        let attrs = state
            .attributes(&address)
            .ok_or_else(|| format!("Not found: {}", address))?;
        match attrs.get(&key) {
            None => Ok(()),
            Some(value) if value == "0" && is_count_key(&key) => Ok(()),
            Some(value) => Err(format!(
                "{}: Attribute '{}' found when not expected: {:?}",
                address, key, value
            )),
        }
    })
}

/// Run checks in order, stopping at the first failure
pub fn compose_check(checks: Vec<CheckFn>) -> CheckFn {
    Box::new(move |state: &TestState| {
        for (idx, check) in checks.iter().enumerate() {
            check(state).map_err(|e| format!("Check {}/{} error: {}", idx + 1, checks.len(), e))?;
        }
        Ok(())
    })
}

/// Acceptance tests talk to a real cloud and only run with `TF_ACC` set
pub fn acc_enabled() -> bool {
    std::env::var("TF_ACC").is_ok_and(|v| !v.is_empty())
}

/// Fails unless every variable is set and non-empty
pub fn pre_check_required_env_vars(vars: &[&str]) -> Result<(), String> {
    let missing: Vec<&str> = vars
        .iter()
        .copied()
        .filter(|name| std::env::var(name).map_or(true, |v| v.is_empty()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} must be set for acceptance tests",
            missing.join(", ")
        ))
    }
}

/// Random lower-case alphanumeric string of length `len`
pub fn rand_string(len: usize) -> String {
    let mut out = String::with_capacity(len);
    while out.len() < len {
        out.push_str(&uuid::Uuid::new_v4().simple().to_string());
    }
    out.truncate(len);
    out
}

/// Unique name for test objects, e.g. `tf-acc-test-3f9c1a0b`
pub fn rand_name(prefix: &str) -> String {
    format!("{}-{}", prefix, rand_string(8))
}

fn diagnostics_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn ensure_ok(diagnostics: &[Diagnostic]) -> Result<(), String> {
    if has_errors(diagnostics) {
        Err(diagnostics_message(diagnostics))
    } else {
        Ok(())
    }
}

/// Replace `${address.attribute}` references with values from state
fn interpolate(value: &serde_json::Value, state: &TestState) -> Result<serde_json::Value, String> {
    let reference = Regex::new(r"\$\{([^}]+)\}").map_err(|e| e.to_string())?;
    Ok(match value {
        serde_json::Value::String(text) => {
            let mut error = None;
            let replaced = reference.replace_all(text, |caps: &regex::Captures| {
                let expr = &caps[1];
                match resolve_reference(expr, state) {
                    Some(found) => found,
                    None => {
                        error.get_or_insert_with(|| format!("Reference to undeclared value: {}", expr));
                        String::new()
                    }
                }
            });
            if let Some(error) = error {
                return Err(error);
            }
            serde_json::Value::String(replaced.into_owned())
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| interpolate(item, state))
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| interpolate(v, state).map(|v| (k.clone(), v)))
                .collect::<Result<_, _>>()?,
        ),
        other => other.clone(),
    })
}

fn resolve_reference(expr: &str, state: &TestState) -> Option<String> {
    let parts: Vec<&str> = expr.split('.').collect();
    let split = if parts.first() == Some(&"data") { 3 } else { 2 };
    if parts.len() <= split {
        return None;
    }
    let address = parts[..split].join(".");
    let key = parts[split..].join(".");
    state.attributes(&address)?.get(&key).cloned()
}

/// Run a test case against a fresh host for `provider`
pub async fn run_test<P: Provider + 'static>(provider: P, case: TestCase) -> Result<(), TestError> {
    if !case.is_unit_test && !acc_enabled() {
        tracing::info!("Acceptance tests skipped unless env 'TF_ACC' set");
        return Ok(());
    }

    if let Some(pre_check) = &case.pre_check {
        pre_check().map_err(TestError::PreCheck)?;
    }

    let mut host = ProviderHost::new(provider);
    let diagnostics = host
        .configure(DynamicValue::from_json(&case.provider_config))
        .await;
    ensure_ok(&diagnostics).map_err(TestError::Configure)?;

    let mut state = TestState::default();
    let mut step_error = None;

    for (idx, step) in case.steps.iter().enumerate() {
        let step_number = idx + 1;
        tracing::debug!(step = step_number, "Running test step");

        let result = if step.import_state {
            run_import_step(&host, &state, step).await
        } else {
            run_config_step(&host, &mut state, step).await
        };

        let outcome = match (&step.expect_error, result) {
            (Some(pattern), Err(message)) if pattern.is_match(&message) => Ok(()),
            (Some(pattern), Err(message)) => Err(format!(
                "expected an error matching {}, got: {}",
                pattern, message
            )),
            (Some(pattern), Ok(())) => Err(format!("expected an error matching {}, got none", pattern)),
            (None, result) => result,
        };

        if let Err(message) = outcome {
            step_error = Some(TestError::Step {
                step: step_number,
                message,
            });
            break;
        }
    }

    let snapshot = state.clone();
    let destroy_result = destroy_all(&host, &mut state).await;

    if let Some(error) = step_error {
        return Err(error);
    }
    destroy_result.map_err(TestError::Destroy)?;

    if let Some(check_destroy) = &case.check_destroy {
        check_destroy(snapshot)
            .await
            .map_err(TestError::CheckDestroy)?;
    }
    Ok(())
}

async fn run_config_step(host: &ProviderHost, state: &mut TestState, step: &TestStep) -> Result<(), String> {
    // Objects dropped from the configuration are destroyed first
    let wanted: Vec<String> = step.config.blocks.iter().map(ConfigBlock::address).collect();
    let stale: Vec<String> = state
        .resources()
        .into_iter()
        .filter(|address| !wanted.contains(address))
        .rev()
        .collect();
    for address in stale {
        destroy(host, state, &address).await?;
    }

    let mut non_empty_plan = false;
    for block in &step.config.blocks {
        let address = block.address();
        let config = DynamicValue::from_json(&interpolate(&block.config, state)?);

        match block.kind {
            BlockKind::Data => {
                let result = host.read_data_source(&block.type_name, &config).await;
                ensure_ok(&result.diagnostics)?;
                state.insert(BlockKind::Data, &address, &block.type_name, &result.state)?;
            }
            BlockKind::Resource => {
                ensure_ok(&host.validate_resource_config(&block.type_name, &config).await)?;

                let prior = refresh(host, state, &address, &block.type_name).await?;
                let change = host.plan_resource(&block.type_name, &prior, &config).await;
                ensure_ok(&change.diagnostics)?;

                if step.plan_only {
                    non_empty_plan |= change.action != PlanAction::NoOp;
                    continue;
                }

                let applied = host
                    .apply_resource(&block.type_name, &prior, &change, &config)
                    .await;
                match &applied.new_state {
                    Some(new_state) => {
                        state.insert(BlockKind::Resource, &address, &block.type_name, new_state)?
                    }
                    None => state.remove(&address),
                }
                ensure_ok(&applied.diagnostics)?;
            }
        }
    }

    if step.plan_only {
        return match (non_empty_plan, step.expect_non_empty_plan) {
            (true, false) => Err("Expected an empty plan, but got changes".to_string()),
            (false, true) => Err("Expected a non-empty plan, but got an empty plan".to_string()),
            _ => Ok(()),
        };
    }

    if let Some(check) = &step.check {
        check(state)?;
    }

    // Refreshing and planning again must not show any change
    let mut pending = Vec::new();
    for block in step.config.blocks.iter().filter(|b| b.kind == BlockKind::Resource) {
        let address = block.address();
        let config = DynamicValue::from_json(&interpolate(&block.config, state)?);
        let prior = refresh(host, state, &address, &block.type_name).await?;
        let change = host.plan_resource(&block.type_name, &prior, &config).await;
        ensure_ok(&change.diagnostics)?;
        if change.action != PlanAction::NoOp {
            pending.push(format!("{} ({:?})", address, change.action));
        }
    }

    match (pending.is_empty(), step.expect_non_empty_plan) {
        (false, false) => Err(format!(
            "After applying this step, the plan was not empty: {}",
            pending.join(", ")
        )),
        _ => Ok(()),
    }
}

async fn refresh(
    host: &ProviderHost,
    state: &mut TestState,
    address: &str,
    type_name: &str,
) -> Result<DynamicValue, String> {
    let Some(current) = state.get(address) else {
        return Ok(DynamicValue::null());
    };
    let read = host.read_resource(type_name, &current).await;
    ensure_ok(&read.diagnostics)?;
    match read.new_state {
        Some(new_state) => {
            state.insert(BlockKind::Resource, address, type_name, &new_state)?;
            Ok(new_state)
        }
        None => {
            state.remove(address);
            Ok(DynamicValue::null())
        }
    }
}

async fn run_import_step(host: &ProviderHost, state: &TestState, step: &TestStep) -> Result<(), String> {
    let address = &step.resource_name;
    let type_name = state
        .type_name(address)
        .ok_or_else(|| format!("Resource {} not found in state", address))?
        .to_string();
    let id = match &step.import_state_id {
        Some(id) => id.clone(),
        None => state
            .id(address)
            .ok_or_else(|| format!("Resource {} has no id", address))?,
    };

    let result = host.import_resource(&type_name, &id).await;
    ensure_ok(&result.diagnostics)?;
    let imported = result
        .imported
        .first()
        .ok_or_else(|| format!("Import of {} returned no resources", id))?;

    if !step.import_state_verify {
        return Ok(());
    }

    let ignored = |key: &str| {
        step.import_state_verify_ignore
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
    };
    let expected: HashMap<String, String> = state
        .attributes(address)
        .unwrap_or_default()
        .into_iter()
        .filter(|(k, _)| !ignored(k))
        .collect();
    let actual: HashMap<String, String> = flatmap(&imported.state.value)
        .into_iter()
        .filter(|(k, _)| !ignored(k))
        .collect();

    if expected == actual {
        return Ok(());
    }

    let mut keys: Vec<&String> = expected.keys().chain(actual.keys()).collect();
    keys.sort();
    keys.dedup();
    let mut report = String::from("ImportStateVerify attributes not equivalent:");
    for key in keys {
        let (want, got) = (expected.get(key), actual.get(key));
        if want != got {
            let _ = write!(report, "\n  {}: expected {:?}, imported {:?}", key, want, got);
        }
    }
    Err(report)
}

async fn destroy(host: &ProviderHost, state: &mut TestState, address: &str) -> Result<(), String> {
    let (Some(prior), Some(type_name)) = (state.get(address), state.type_name(address).map(str::to_string)) else {
        return Ok(());
    };
    let change = host
        .plan_resource(&type_name, &prior, &DynamicValue::null())
        .await;
    let applied = host
        .apply_resource(&type_name, &prior, &change, &DynamicValue::null())
        .await;
    ensure_ok(&applied.diagnostics).map_err(|e| format!("{}: {}", address, e))?;
    state.remove(address);
    Ok(())
}

async fn destroy_all(host: &ProviderHost, state: &mut TestState) -> Result<(), String> {
    let mut errors = Vec::new();
    for address in state.resources().into_iter().rev() {
        if let Err(e) = destroy(host, state, &address).await {
            errors.push(e);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatmap_uses_count_keys() {
        let value = DynamicValue::from_json(&json!({
            "id": "abc",
            "size": 100,
            "tags": {"env": "test"},
            "nodes": [{"role": "master"}],
            "description": null
        }));
        let flat = flatmap(&value.value);

        assert_eq!(flat["id"], "abc");
        assert_eq!(flat["size"], "100");
        assert_eq!(flat["tags.%"], "1");
        assert_eq!(flat["tags.env"], "test");
        assert_eq!(flat["nodes.#"], "1");
        assert_eq!(flat["nodes.0.role"], "master");
        assert!(!flat.contains_key("nodes.0.%"));
        assert!(!flat.contains_key("description"));
    }

    #[test]
    fn checks_read_flattened_state() {
        let mut state = TestState::default();
        state
            .insert(
                BlockKind::Resource,
                "test_thing.foo",
                "test_thing",
                &DynamicValue::from_json(&json!({"id": "1", "name": "foo", "tags": {}})),
            )
            .unwrap();

        let check = compose_check(vec![
            check_resource_attr("test_thing.foo", "name", "foo"),
            check_resource_attr_set("test_thing.foo", "id"),
            check_resource_attr("test_thing.foo", "tags.%", "0"),
            check_no_resource_attr("test_thing.foo", "description"),
        ]);
        assert!(check(&state).is_ok());

        let failing = check_resource_attr("test_thing.foo", "name", "bar");
        assert!(failing(&state).unwrap_err().contains("expected \"bar\""));
        assert!(check_resource_attr_set("test_thing.missing", "id")(&state).is_err());
    }

    #[test]
    fn interpolation_resolves_references() {
        let mut state = TestState::default();
        state
            .insert(
                BlockKind::Data,
                "data.test_az.all",
                "test_az",
                &DynamicValue::from_json(&json!({"id": "eu-de", "ids": ["az1"]})),
            )
            .unwrap();

        let resolved = interpolate(
            &json!({"zone": "${data.test_az.all.ids.0}", "name": "x-${data.test_az.all.id}"}),
            &state,
        )
        .unwrap();
        assert_eq!(resolved, json!({"zone": "az1", "name": "x-eu-de"}));

        assert!(interpolate(&json!("${test_thing.foo.id}"), &state).is_err());
    }

    #[test]
    fn random_names_have_expected_shape() {
        assert_eq!(rand_string(40).len(), 40);
        let name = rand_name("tf-acc-test");
        assert!(name.starts_with("tf-acc-test-"));
        assert_eq!(name.len(), "tf-acc-test-".len() + 8);
    }

    #[test]
    fn required_env_vars_are_reported() {
        let err = pre_check_required_env_vars(&["TFPLUG_TEST_NEVER_SET_VAR"]).unwrap_err();
        assert!(err.contains("TFPLUG_TEST_NEVER_SET_VAR"));
    }
}
