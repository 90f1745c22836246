//! Acceptance tests for LBaaS v2 pools. Run with `TF_ACC=1` and
//! `OS_LOADBALANCER_ID` naming an existing load balancer.

mod common;

use serde_json::json;
use tfplug::testing::{
    check_resource_attr, check_resource_attr_set, compose_check, rand_name, run_test,
    Configuration, TestCase, TestStep,
};

const POOL: &str = "opentelekomcloud_lb_pool_v2.pool_1";

fn pool_config(name: &str, lb_method: &str) -> Configuration {
    Configuration::new().resource(
        "opentelekomcloud_lb_pool_v2",
        "pool_1",
        json!({
            "name": name,
            "protocol": "HTTP",
            "lb_method": lb_method,
            "loadbalancer_id": common::env("OS_LOADBALANCER_ID")
        }),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn acc_lb_pool_v2_basic() {
    let name = rand_name("pool");
    let updated = format!("{}_updated", name);
    let case = TestCase {
        pre_check: Some(common::pre_check(&["OS_LOADBALANCER_ID"])),
        provider_config: json!({}),
        steps: vec![
            TestStep::new(pool_config(&name, "ROUND_ROBIN")).check(compose_check(vec![
                check_resource_attr_set(POOL, "id"),
                check_resource_attr(POOL, "name", &name),
                check_resource_attr(POOL, "lb_method", "ROUND_ROBIN"),
            ])),
            TestStep::new(pool_config(&updated, "LEAST_CONNECTIONS")).check(compose_check(vec![
                check_resource_attr(POOL, "name", &updated),
                check_resource_attr(POOL, "lb_method", "LEAST_CONNECTIONS"),
                check_resource_attr(POOL, "admin_state_up", "true"),
            ])),
        ],
        ..Default::default()
    };

    run_test(common::provider(), case).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn acc_lb_pool_v2_app_cookie_persistence() {
    let case = TestCase {
        pre_check: Some(common::pre_check(&["OS_LOADBALANCER_ID"])),
        provider_config: json!({}),
        steps: vec![TestStep::new(Configuration::new().resource(
            "opentelekomcloud_lb_pool_v2",
            "pool_1",
            json!({
                "name": rand_name("pool"),
                "protocol": "HTTP",
                "lb_method": "ROUND_ROBIN",
                "loadbalancer_id": common::env("OS_LOADBALANCER_ID"),
                "persistence": [{"type": "APP_COOKIE", "cookie_name": "testCookie"}]
            }),
        ))
        .check(compose_check(vec![
            check_resource_attr(POOL, "persistence.#", "1"),
            check_resource_attr(POOL, "persistence.0.cookie_name", "testCookie"),
        ]))],
        ..Default::default()
    };

    run_test(common::provider(), case).await.unwrap();
}
