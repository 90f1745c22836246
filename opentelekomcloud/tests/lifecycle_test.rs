//! Resource lifecycles driven through the in-process host against mock endpoints

use mockito::{Matcher, Server};
use opentelekomcloud::{OtcProvider, PollSettings};
use serde_json::json;
use std::time::Duration;
use tfplug::types::DynamicValue;
use tfplug::{PlanAction, ProviderHost};
use tfplug::testing::{
    check_resource_attr, check_resource_attr_set, compose_check, run_test, Configuration,
    TestCase, TestStep,
};

fn provider() -> OtcProvider {
    OtcProvider::with_poll_settings(PollSettings::fixed(Duration::from_millis(1)))
}

fn provider_config(endpoints: serde_json::Value) -> serde_json::Value {
    json!({
        "region": "eu-de",
        "token": "test-token",
        "tenant_id": "proj-1",
        "max_retries": 0,
        "endpoints": endpoints
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn servergroup_create_refresh_destroy() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/os-server-groups")
        .match_body(Matcher::Json(json!({
            "server_group": {"name": "sg-acc", "policies": ["anti-affinity"]}
        })))
        .with_body(r#"{"server_group": {"id": "sg-1", "name": "sg-acc", "policies": ["anti-affinity"], "members": []}}"#)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/os-server-groups/sg-1")
        .with_body(r#"{"server_group": {"id": "sg-1", "name": "sg-acc", "policies": ["anti-affinity"], "members": []}}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/os-server-groups/sg-1")
        .with_status(204)
        .create_async()
        .await;

    let address = "opentelekomcloud_compute_servergroup_v2.sg_1";
    let case = TestCase {
        is_unit_test: true,
        provider_config: provider_config(json!({"compute": server.url()})),
        steps: vec![TestStep::new(Configuration::new().resource(
            "opentelekomcloud_compute_servergroup_v2",
            "sg_1",
            json!({"name": "sg-acc", "policies": ["anti-affinity"]}),
        ))
        .check(compose_check(vec![
            check_resource_attr(address, "id", "sg-1"),
            check_resource_attr(address, "policies.#", "1"),
            check_resource_attr(address, "policies.0", "anti-affinity"),
            check_resource_attr(address, "region", "eu-de"),
        ]))],
        ..Default::default()
    };

    run_test(provider(), case).await.unwrap();
    create.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn whiteblackip_rule_import_by_policy_and_id() {
    let mut server = Server::new_async().await;
    let rule = r#"{"id": "rule-1", "policy_id": "policy-1", "addr": "192.168.0.0/24", "white": 1}"#;
    let _create = server
        .mock("POST", "/policy/policy-1/whiteblackip")
        .with_body(rule)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/policy/policy-1/whiteblackip/rule-1")
        .with_body(rule)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/policy/policy-1/whiteblackip/rule-1")
        .with_status(204)
        .create_async()
        .await;

    let address = "opentelekomcloud_waf_whiteblackip_rule_v1.rule_1";
    let case = TestCase {
        is_unit_test: true,
        provider_config: provider_config(json!({"waf": server.url()})),
        steps: vec![
            TestStep::new(Configuration::new().resource(
                "opentelekomcloud_waf_whiteblackip_rule_v1",
                "rule_1",
                json!({"policy_id": "policy-1", "addr": "192.168.0.0/24", "white": 1}),
            ))
            .check(compose_check(vec![
                check_resource_attr(address, "addr", "192.168.0.0/24"),
                check_resource_attr(address, "white", "1"),
                check_resource_attr_set(address, "id"),
            ])),
            TestStep::import(address)
                .import_state_id("policy-1/rule-1")
                .import_state_verify(&[]),
        ],
        ..Default::default()
    };

    run_test(provider(), case).await.unwrap();
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rds_versions_data_source_lists_newest_first() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/datastores/PostgreSQL")
        .with_body(r#"{"dataStores": [{"id": "a", "name": "9.6"}, {"id": "b", "name": "11"}, {"id": "c", "name": "10"}]}"#)
        .create_async()
        .await;

    let address = "data.opentelekomcloud_rds_versions_v3.pg";
    let case = TestCase {
        is_unit_test: true,
        provider_config: provider_config(json!({"rdsv3": server.url()})),
        steps: vec![TestStep::new(Configuration::new().data(
            "opentelekomcloud_rds_versions_v3",
            "pg",
            json!({"database_name": "PostgreSQL"}),
        ))
        .check(compose_check(vec![
            check_resource_attr(address, "versions.#", "3"),
            check_resource_attr(address, "versions.0", "11"),
            check_resource_attr(address, "versions.2", "9.6"),
        ]))],
        ..Default::default()
    };

    run_test(provider(), case).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn lb_pool_without_owner_is_rejected() {
    let server = Server::new_async().await;
    let case = TestCase {
        is_unit_test: true,
        provider_config: provider_config(json!({"elb": server.url()})),
        steps: vec![TestStep::new(Configuration::new().resource(
            "opentelekomcloud_lb_pool_v2",
            "pool_1",
            json!({"protocol": "HTTP", "lb_method": "ROUND_ROBIN"}),
        ))
        .expect_error(regex::Regex::new("Exactly one of loadbalancer_id and listener_id").unwrap())],
        ..Default::default()
    };

    run_test(provider(), case).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn servergroup_value_specs_added_later_forces_new_group() {
    let server = Server::new_async().await;
    let mut host = ProviderHost::new(provider());
    let diagnostics = host
        .configure(DynamicValue::from_json(&provider_config(
            json!({"compute": server.url()}),
        )))
        .await;
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let prior = DynamicValue::from_json(&json!({
        "id": "sg-1",
        "name": "sg-acc",
        "policies": ["anti-affinity"],
        "members": [],
        "region": "eu-de",
        "value_specs": null
    }));
    let config = DynamicValue::from_json(&json!({
        "name": "sg-acc",
        "policies": ["anti-affinity"],
        "value_specs": {"foo": "bar"}
    }));

    let plan = host
        .plan_resource("opentelekomcloud_compute_servergroup_v2", &prior, &config)
        .await;
    assert_eq!(plan.action, PlanAction::Replace);
    assert_eq!(plan.requires_replace.len(), 1);
    assert_eq!(plan.requires_replace[0].to_string(), "value_specs");
}
