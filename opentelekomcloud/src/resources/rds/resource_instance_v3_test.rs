#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::provider_data::test_provider_data;
    use mockito::{Matcher, Mock, Server};
    use serde_json::json;
    use std::any::Any;
    use tfplug::types::DiagnosticSeverity;

    async fn configured(server: &Server) -> RdsInstanceV3Resource {
        let url = server.url();
        let data = test_provider_data(&[
            ("rdsv3", url.clone()),
            ("rdstag", url.clone()),
            ("rds", url.clone()),
            ("vpc", url.clone()),
            ("network", url),
        ])
        .await;
        let mut resource = RdsInstanceV3Resource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(data) as Arc<dyn Any + Send + Sync>),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    fn instance(flavor: &str, public_ips: Value) -> Value {
        json!({
            "id": "inst-1",
            "name": "db-1",
            "status": "ACTIVE",
            "flavor_ref": flavor,
            "port": 8635,
            "db_user_name": "root",
            "created": "2024-01-01T00:00:00+0000",
            "private_ips": ["192.168.0.10"],
            "public_ips": public_ips,
            "security_group_id": "sg-1",
            "subnet_id": "subnet-1",
            "vpc_id": "vpc-1",
            "datastore": {"type": "PostgreSQL", "version": "10"},
            "volume": {"type": "COMMON", "size": 100},
            "backup_strategy": {"start_time": "08:00-09:00", "keep_days": 7},
            "nodes": [
                {"id": "node-1", "name": "db-1_node0", "role": "master", "status": "ACTIVE", "availability_zone": "eu-de-01"}
            ]
        })
    }

    fn config() -> Value {
        json!({
            "id": null,
            "name": "db-1",
            "flavor": "rds.pg.c2.medium",
            "availability_zone": ["eu-de-01"],
            "region": null,
            "vpc_id": "vpc-1",
            "subnet_id": "subnet-1",
            "security_group_id": "sg-1",
            "param_group_id": null,
            "ha_replication_mode": null,
            "tag": {"env": "dev"},
            "public_ips": null,
            "private_ips": null,
            "created": null,
            "nodes": null,
            "db": [{"type": "PostgreSQL", "version": "10", "password": "Secret123!", "port": 8635, "user_name": null}],
            "volume": [{"type": "COMMON", "size": 100, "disk_encryption_id": null}],
            "backup_strategy": [{"start_time": "08:00-09:00", "keep_days": null}]
        })
    }

    fn state() -> Value {
        let mut state = config();
        state["id"] = json!("inst-1");
        state["region"] = json!("eu-de");
        state["public_ips"] = json!([]);
        state["private_ips"] = json!(["192.168.0.10"]);
        state["created"] = json!("2024-01-01T00:00:00+0000");
        state["backup_strategy"] = json!([{"start_time": "08:00-09:00", "keep_days": 7}]);
        state["nodes"] = json!([
            {"id": "node-1", "name": "db-1_node0", "role": "master", "status": "ACTIVE", "availability_zone": "eu-de-01"}
        ]);
        state
    }

    async fn mock_instance(server: &mut Server, body: Value) -> Mock {
        server
            .mock("GET", "/instances")
            .match_query(Matcher::UrlEncoded("id".into(), "inst-1".into()))
            .with_body(json!({"instances": [body]}).to_string())
            .create_async()
            .await
    }

    async fn mock_tags(server: &mut Server, body: &str) -> Mock {
        server
            .mock("GET", "/node-1/tags")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_resource_schema() {
        let resource = RdsInstanceV3Resource::new();
        let response = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await;

        let schema = &response.schema;
        let flavor = schema.block.attribute("flavor").unwrap();
        assert!(flavor.required);
        assert!(flavor.plan_modifiers.is_empty());

        let name = schema.block.attribute("name").unwrap();
        assert!(name.required && name.plan_modifiers.len() == 1);

        let public_ips = schema.block.attribute("public_ips").unwrap();
        assert!(public_ips.optional && public_ips.computed);

        assert!(schema.block.attribute("password").is_none());
        assert!(schema.block.nested_block("db").is_some());
        assert!(schema.block.nested_block("volume").is_some());
        assert!(schema.block.nested_block("backup_strategy").is_some());
        assert_eq!(schema.timeouts.create, Some(Duration::from_secs(30 * 60)));
        assert_eq!(schema.timeouts.update, Some(Duration::from_secs(30 * 60)));
    }

    #[test]
    fn test_resize_states() {
        assert_eq!(flavor_resize_state("ACTIVE", "fl-2", "fl-2"), "ACTIVE");
        assert_eq!(flavor_resize_state("ACTIVE", "fl-1", "fl-2"), "MODIFYING");
        assert_eq!(flavor_resize_state("FAILED", "fl-1", "fl-2"), "FAILED");
        assert_eq!(volume_resize_state("ACTIVE", 200, 200), "UPDATED");
        assert_eq!(volume_resize_state("MODIFYING", 100, 200), "MODIFYING");
    }

    #[tokio::test]
    async fn test_create_waits_for_job_and_tags_master_node() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/instances")
            .match_body(Matcher::PartialJson(json!({
                "name": "db-1",
                "flavor_ref": "rds.pg.c2.medium",
                "availability_zone": "eu-de-01",
                "region": "eu-de",
                "datastore": {"type": "PostgreSQL", "version": "10"},
                "volume": {"type": "COMMON", "size": 100}
            })))
            .with_status(202)
            .with_body(r#"{"job_id": "job-1", "instance": {"id": "inst-1"}}"#)
            .create_async()
            .await;
        let job = server
            .mock("GET", "/jobs")
            .match_query(Matcher::UrlEncoded("id".into(), "job-1".into()))
            .with_body(r#"{"job": {"id": "job-1", "status": "Completed", "instance": {"id": "inst-1"}}}"#)
            .create_async()
            .await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.medium", json!(["80.158.1.1"]))).await;
        let tag = server
            .mock("POST", "/node-1/tags")
            .match_body(Matcher::Json(json!({"tag": {"key": "env", "value": "dev"}})))
            .with_status(204)
            .create_async()
            .await;
        let _tags = mock_tags(&mut server, r#"{"tags": [{"key": "env", "value": "dev"}]}"#).await;

        let resource = configured(&server).await;
        let config = DynamicValue::from_json(&config());
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "inst-1");
        assert_eq!(state.get_string(&AttributePath::new("region")).unwrap(), "eu-de");
        assert_eq!(
            state
                .get_string(&AttributePath::new("db").index(0).attribute("password"))
                .unwrap(),
            "Secret123!"
        );
        assert_eq!(
            state
                .get_string(&AttributePath::new("db").index(0).attribute("user_name"))
                .unwrap(),
            "root"
        );
        assert_eq!(
            state.get_string_list(&AttributePath::new("public_ips")).unwrap(),
            vec!["80.158.1.1"]
        );
        assert_eq!(
            state.get_string_map(&AttributePath::new("tag")).unwrap()["env"],
            "dev"
        );
        create.assert_async().await;
        job.assert_async().await;
        tag.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_tag_failure_is_a_warning() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/instances")
            .with_status(202)
            .with_body(r#"{"job_id": "job-1"}"#)
            .create_async()
            .await;
        let _job = server
            .mock("GET", "/jobs")
            .match_query(Matcher::Any)
            .with_body(r#"{"job": {"status": "Completed", "instance": {"id": "inst-1"}}}"#)
            .create_async()
            .await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.medium", json!(["80.158.1.1"]))).await;
        let _tag = server
            .mock("POST", "/node-1/tags")
            .with_status(400)
            .with_body(r#"{"errCode": "DBS.280001", "externalMessage": "bad tag"}"#)
            .create_async()
            .await;
        let _tags = mock_tags(&mut server, r#"{"tags": []}"#).await;

        let resource = configured(&server).await;
        let config = DynamicValue::from_json(&config());
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1, "{:?}", response.diagnostics);
        assert_eq!(response.diagnostics[0].severity, DiagnosticSeverity::Warning);
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "inst-1"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_wrong_zone_count() {
        let server = Server::new_async().await;
        let resource = configured(&server).await;

        let mut config = config();
        config["flavor"] = json!("rds.pg.c2.medium.ha");
        let config = DynamicValue::from_json(&config);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Error building the request body of api(create)"
        );
        assert!(response.diagnostics[0].detail.contains("two available zones"));
    }

    #[tokio::test]
    async fn test_read_looks_up_public_ip_from_port() {
        let mut server = Server::new_async().await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.medium", json!([]))).await;
        let _subnet = server
            .mock("GET", "/subnets/subnet-1")
            .with_body(r#"{"subnet": {"id": "subnet-1", "subnet_id": "neutron-1", "vpc_id": "vpc-1"}}"#)
            .create_async()
            .await;
        let _ports = server
            .mock("GET", "/ports")
            .match_query(Matcher::Any)
            .with_body(r#"{"ports": [{"id": "port-1", "fixed_ips": [{"ip_address": "192.168.0.10", "subnet_id": "neutron-1"}]}]}"#)
            .create_async()
            .await;
        let _fips = server
            .mock("GET", "/floatingips")
            .match_query(Matcher::UrlEncoded("port_id".into(), "port-1".into()))
            .with_body(r#"{"floatingips": [{"id": "fip-1", "floating_ip_address": "80.158.1.1", "port_id": "port-1"}]}"#)
            .create_async()
            .await;
        let _tags = mock_tags(&mut server, r#"{"tags": []}"#).await;

        let resource = configured(&server).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: resource.type_name().to_string(),
                    current_state: DynamicValue::from_json(&state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state.unwrap();
        assert_eq!(
            state.get_string_list(&AttributePath::new("public_ips")).unwrap(),
            vec!["80.158.1.1"]
        );
        assert!(state
            .get_string_map(&AttributePath::new("tag"))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_instance_leaves_state() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/instances")
            .match_query(Matcher::Any)
            .with_body(r#"{"instances": []}"#)
            .create_async()
            .await;

        let resource = configured(&server).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: resource.type_name().to_string(),
                    current_state: DynamicValue::from_json(&state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn test_update_resizes_flavor_and_replaces_tags() {
        let mut server = Server::new_async().await;
        let delete_tag = server
            .mock("DELETE", "/node-1/tags")
            .match_body(Matcher::Json(json!({"key": "env"})))
            .with_status(204)
            .create_async()
            .await;
        let create_tag = server
            .mock("POST", "/node-1/tags")
            .match_body(Matcher::Json(json!({"tag": {"key": "env", "value": "prod"}})))
            .with_status(204)
            .create_async()
            .await;
        let _versions = server
            .mock("GET", "/datastores/PostgreSQL/versions")
            .with_body(r#"{"dataStores": [{"id": "ds-96", "name": "9.6"}, {"id": "ds-10", "name": "10.0"}]}"#)
            .create_async()
            .await;
        let _flavors = server
            .mock("GET", "/flavors")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("dbId".into(), "ds-10".into()),
                Matcher::UrlEncoded("region".into(), "eu-de".into()),
            ]))
            .with_body(r#"{"flavors": [{"id": "fl-1", "specCode": "rds.pg.c2.medium"}, {"id": "fl-2", "specCode": "rds.pg.c2.large"}]}"#)
            .create_async()
            .await;
        let resize = server
            .mock("POST", "/instances/node-1/action")
            .match_body(Matcher::Json(json!({"resize": {"flavorRef": "fl-2"}})))
            .with_status(202)
            .with_body("{}")
            .create_async()
            .await;
        let _node = server
            .mock("GET", "/instances/node-1")
            .with_body(r#"{"instance": {"id": "node-1", "status": "ACTIVE", "flavor": {"id": "fl-2"}, "volume": {"type": "COMMON", "size": 100}}}"#)
            .create_async()
            .await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.large", json!(["80.158.1.1"]))).await;
        let _tags = mock_tags(&mut server, r#"{"tags": [{"key": "env", "value": "prod"}]}"#).await;

        let prior = state();
        let mut planned = prior.clone();
        planned["flavor"] = json!("rds.pg.c2.large");
        planned["tag"] = json!({"env": "prod"});
        planned["public_ips"] = json!([]);

        let resource = configured(&server).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&prior),
                    planned_state: DynamicValue::from_json(&planned),
                    config: DynamicValue::from_json(&planned),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("flavor")).unwrap(),
            "rds.pg.c2.large"
        );
        assert_eq!(
            response.new_state.get_string_map(&AttributePath::new("tag")).unwrap()["env"],
            "prod"
        );
        delete_tag.assert_async().await;
        create_tag.assert_async().await;
        resize.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_tag_failures_are_warnings() {
        let mut server = Server::new_async().await;
        let delete_tag = server
            .mock("DELETE", "/node-1/tags")
            .with_status(400)
            .with_body(r#"{"errCode": "DBS.280001", "externalMessage": "tag locked"}"#)
            .create_async()
            .await;
        let _create_env = server
            .mock("POST", "/node-1/tags")
            .match_body(Matcher::Json(json!({"tag": {"key": "env", "value": "prod"}})))
            .with_status(400)
            .with_body(r#"{"errCode": "DBS.280001", "externalMessage": "tag locked"}"#)
            .create_async()
            .await;
        let create_team = server
            .mock("POST", "/node-1/tags")
            .match_body(Matcher::Json(json!({"tag": {"key": "team", "value": "db"}})))
            .with_status(204)
            .create_async()
            .await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.medium", json!(["80.158.1.1"]))).await;
        let _tags = mock_tags(
            &mut server,
            r#"{"tags": [{"key": "env", "value": "dev"}, {"key": "team", "value": "db"}]}"#,
        )
        .await;

        let prior = state();
        let mut planned = prior.clone();
        planned["tag"] = json!({"env": "prod", "team": "db"});

        let resource = configured(&server).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&prior),
                    planned_state: DynamicValue::from_json(&planned),
                    config: DynamicValue::from_json(&planned),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 2, "{:?}", response.diagnostics);
        assert!(response
            .diagnostics
            .iter()
            .all(|d| d.severity == DiagnosticSeverity::Warning));
        let tags = response
            .new_state
            .get_string_map(&AttributePath::new("tag"))
            .unwrap();
        assert_eq!(tags["env"], "dev");
        assert_eq!(tags["team"], "db");
        delete_tag.assert_async().await;
        create_team.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_resizes_volume_until_updated() {
        let mut server = Server::new_async().await;
        let resize = server
            .mock("POST", "/instances/node-1/action")
            .match_body(Matcher::Json(json!({"resize": {"volume": {"size": 200}}})))
            .with_status(202)
            .with_body("{}")
            .create_async()
            .await;
        let modifying = server
            .mock("GET", "/instances/node-1")
            .with_body(r#"{"instance": {"id": "node-1", "status": "MODIFYING", "flavor": {"id": "fl-1"}, "volume": {"type": "COMMON", "size": 100}}}"#)
            .expect(1)
            .create_async()
            .await;
        let resized = server
            .mock("GET", "/instances/node-1")
            .with_body(r#"{"instance": {"id": "node-1", "status": "ACTIVE", "flavor": {"id": "fl-1"}, "volume": {"type": "COMMON", "size": 200}}}"#)
            .create_async()
            .await;
        let mut grown = instance("rds.pg.c2.medium", json!(["80.158.1.1"]));
        grown["volume"] = json!({"type": "COMMON", "size": 200});
        let _instance = mock_instance(&mut server, grown).await;
        let _tags = mock_tags(&mut server, r#"{"tags": [{"key": "env", "value": "dev"}]}"#).await;

        let prior = state();
        let mut planned = prior.clone();
        planned["volume"] = json!([{"type": "COMMON", "size": 200, "disk_encryption_id": null}]);

        let resource = configured(&server).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&prior),
                    planned_state: DynamicValue::from_json(&planned),
                    config: DynamicValue::from_json(&planned),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response
                .new_state
                .get_i64(&AttributePath::new("volume").index(0).attribute("size"))
                .unwrap(),
            200
        );
        resize.assert_async().await;
        modifying.assert_async().await;
        resized.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_unassigns_removed_public_ip() {
        let mut server = Server::new_async().await;
        let _lookup = server
            .mock("GET", "/floatingips")
            .match_query(Matcher::UrlEncoded(
                "floating_ip_address".into(),
                "80.158.1.1".into(),
            ))
            .with_body(r#"{"floatingips": [{"id": "fip-1", "floating_ip_address": "80.158.1.1", "port_id": "port-1"}]}"#)
            .create_async()
            .await;
        let unbind = server
            .mock("PUT", "/floatingips/fip-1")
            .match_body(Matcher::Json(json!({"floatingip": {"port_id": null}})))
            .with_body(r#"{"floatingip": {"id": "fip-1", "floating_ip_address": "80.158.1.1", "port_id": null}}"#)
            .create_async()
            .await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.medium", json!([]))).await;
        let _subnet = server
            .mock("GET", "/subnets/subnet-1")
            .with_body(r#"{"subnet": {"id": "subnet-1", "subnet_id": "neutron-1", "vpc_id": "vpc-1"}}"#)
            .create_async()
            .await;
        let _ports = server
            .mock("GET", "/ports")
            .match_query(Matcher::Any)
            .with_body(r#"{"ports": []}"#)
            .create_async()
            .await;
        let _tags = mock_tags(&mut server, r#"{"tags": [{"key": "env", "value": "dev"}]}"#).await;

        let mut prior = state();
        prior["public_ips"] = json!(["80.158.1.1"]);
        let mut planned = prior.clone();
        planned["public_ips"] = json!([]);

        let resource = configured(&server).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&prior),
                    planned_state: DynamicValue::from_json(&planned),
                    config: DynamicValue::from_json(&planned),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(response
            .new_state
            .get_string_list(&AttributePath::new("public_ips"))
            .unwrap_or_default()
            .is_empty());
        unbind.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_backup_strategy_uses_every_weekday() {
        let mut server = Server::new_async().await;
        let policy = server
            .mock("PUT", "/instances/inst-1/backups/policy")
            .match_body(Matcher::Json(json!({
                "backup_policy": {"keep_days": 3, "start_time": "02:00-03:00", "period": "1,2,3,4,5,6,7"}
            })))
            .with_body("{}")
            .create_async()
            .await;
        let _instance = mock_instance(&mut server, instance("rds.pg.c2.medium", json!(["80.158.1.1"]))).await;
        let _tags = mock_tags(&mut server, r#"{"tags": [{"key": "env", "value": "dev"}]}"#).await;

        let prior = state();
        let mut planned = prior.clone();
        planned["backup_strategy"] = json!([{"start_time": "02:00-03:00", "keep_days": 3}]);

        let resource = configured(&server).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&prior),
                    planned_state: DynamicValue::from_json(&planned),
                    config: DynamicValue::from_json(&planned),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        policy.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_rejects_two_public_ips() {
        let server = Server::new_async().await;
        let resource = configured(&server).await;

        let prior = state();
        let mut planned = prior.clone();
        planned["public_ips"] = json!(["80.158.1.1", "80.158.1.2"]);

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&prior),
                    planned_state: DynamicValue::from_json(&planned),
                    config: DynamicValue::from_json(&planned),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].detail,
            "RDS instance can't have more than one public IP"
        );
        assert_eq!(response.new_state, DynamicValue::from_json(&prior));
    }

    #[tokio::test]
    async fn test_delete_waits_until_instance_is_gone() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/instances/inst-1")
            .with_status(202)
            .with_body(r#"{"job_id": "job-2"}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/instances")
            .match_query(Matcher::Any)
            .with_body(r#"{"instances": []}"#)
            .create_async()
            .await;

        let resource = configured(&server).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_instance() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/instances/inst-1")
            .with_status(404)
            .with_body(r#"{"errCode": "DBS.200823", "externalMessage": "instance not found"}"#)
            .create_async()
            .await;

        let resource = configured(&server).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }
}
