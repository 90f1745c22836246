//! Compute v2.1 server groups

use crate::api::{client::Client, error::ApiError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServerGroupRequest {
    pub name: String,
    pub policies: Vec<String>,
    /// Free-form keys merged into the request body
    #[serde(flatten)]
    pub value_specs: HashMap<String, String>,
}

#[derive(Serialize)]
struct CreateEnvelope<'a> {
    server_group: &'a CreateServerGroupRequest,
}

#[derive(Deserialize)]
struct ServerGroupEnvelope {
    server_group: ServerGroup,
}

pub struct ServerGroupsApi<'a> {
    client: &'a Client,
}

impl<'a> ServerGroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateServerGroupRequest) -> Result<ServerGroup, ApiError> {
        let response: ServerGroupEnvelope = self
            .client
            .post("/os-server-groups", &CreateEnvelope { server_group: request })
            .await?;
        Ok(response.server_group)
    }

    pub async fn get(&self, id: &str) -> Result<ServerGroup, ApiError> {
        let response: ServerGroupEnvelope = self
            .client
            .get(&format!("/os-server-groups/{}", id))
            .await?;
        Ok(response.server_group)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("/os-server-groups/{}", id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn create_flattens_value_specs() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/os-server-groups")
            .match_body(Matcher::Json(serde_json::json!({
                "server_group": {
                    "name": "sg-1",
                    "policies": ["anti-affinity"],
                    "foo": "bar"
                }
            })))
            .with_status(200)
            .with_body(r#"{"server_group": {"id": "sg-id", "name": "sg-1", "policies": ["anti-affinity"], "members": []}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let request = CreateServerGroupRequest {
            name: "sg-1".to_string(),
            policies: vec!["anti-affinity".to_string()],
            value_specs: HashMap::from([("foo".to_string(), "bar".to_string())]),
        };
        let group = client.server_groups().create(&request).await.unwrap();

        assert_eq!(group.id, "sg-id");
        assert_eq!(group.policies, vec!["anti-affinity"]);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn get_reads_members() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/os-server-groups/sg-id")
            .with_body(r#"{"server_group": {"id": "sg-id", "name": "sg-1", "policies": ["affinity"], "members": ["vm-1", "vm-2"], "metadata": {}}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let group = client.server_groups().get("sg-id").await.unwrap();
        assert_eq!(group.members, vec!["vm-1", "vm-2"]);
    }

    #[tokio::test]
    async fn delete_missing_group_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/os-server-groups/gone")
            .with_status(404)
            .with_body(r#"{"itemNotFound": {"code": 404, "message": "Instance group gone could not be found."}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client.server_groups().delete("gone").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
