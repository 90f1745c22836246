#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::provider_data::test_provider_data;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::any::Any;

    async fn configured(server: &Server) -> ComputeServerGroupV2Resource {
        let data = test_provider_data(&[("compute", server.url())]).await;
        let mut resource = ComputeServerGroupV2Resource::new();
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

    #[tokio::test]
    async fn test_resource_schema() {
        let resource = ComputeServerGroupV2Resource::new();
        let response = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await;

        let attrs = &response.schema.block.attributes;
        assert!(attrs.iter().any(|a| a.name == "name" && a.required));
        assert!(attrs.iter().any(|a| a.name == "members" && a.computed && !a.optional));
        assert!(attrs.iter().any(|a| a.name == "region" && a.optional && a.computed));
    }

    #[tokio::test]
    async fn test_create_reads_back_members() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/os-server-groups")
            .match_body(Matcher::Json(json!({
                "server_group": {"name": "sg", "policies": ["anti-affinity"], "foo": "bar"}
            })))
            .with_status(200)
            .with_body(r#"{"server_group": {"id": "sg-1", "name": "sg", "policies": ["anti-affinity"], "members": []}}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/os-server-groups/sg-1")
            .with_status(200)
            .with_body(r#"{"server_group": {"id": "sg-1", "name": "sg", "policies": ["anti-affinity"], "members": ["vm-1"]}}"#)
            .create_async()
            .await;

        let resource = configured(&server).await;
        let config = DynamicValue::from_json(&json!({
            "name": "sg",
            "policies": ["anti-affinity"],
            "value_specs": {"foo": "bar"},
            "region": null,
            "id": null,
            "members": null
        }));
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
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "sg-1");
        assert_eq!(state.get_string(&AttributePath::new("region")).unwrap(), "eu-de");
        assert_eq!(
            state.get_string_list(&AttributePath::new("members")).unwrap(),
            vec!["vm-1"]
        );
        create.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_missing_group_removes_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/os-server-groups/gone")
            .with_status(404)
            .with_body(r#"{"itemNotFound": {"code": 404, "message": "not found"}}"#)
            .create_async()
            .await;

        let resource = configured(&server).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: resource.type_name().to_string(),
                    current_state: DynamicValue::from_json(&json!({"id": "gone"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_group() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("DELETE", "/os-server-groups/sg-1")
            .with_status(404)
            .create_async()
            .await;

        let resource = configured(&server).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state: DynamicValue::from_json(&json!({"id": "sg-1"})),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_unconfigured_resource_reports_error() {
        let resource = ComputeServerGroupV2Resource::new();
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: resource.type_name().to_string(),
                    current_state: DynamicValue::from_json(&json!({"id": "sg-1"})),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn test_import_sets_id() {
        let resource = ComputeServerGroupV2Resource::new();
        let response = resource
            .importer()
            .unwrap()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: resource.type_name().to_string(),
                    id: "sg-1".to_string(),
                },
            )
            .await;
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "sg-1"
        );
    }
}
