//! ECS v1 instance tags

use crate::api::{client::Client, error::ApiError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}

#[derive(Serialize)]
struct TagAction<'a> {
    action: &'a str,
    tags: &'a [ResourceTag],
}

pub struct TagsApi<'a> {
    client: &'a Client,
}

impl<'a> TagsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /cloudservers/{id}/tags/action with action `create`
    pub async fn create(&self, server_id: &str, tags: &[ResourceTag]) -> Result<(), ApiError> {
        self.batch_action(server_id, "create", tags).await
    }

    /// POST /cloudservers/{id}/tags/action with action `delete`
    pub async fn delete(&self, server_id: &str, tags: &[ResourceTag]) -> Result<(), ApiError> {
        self.batch_action(server_id, "delete", tags).await
    }

    async fn batch_action(
        &self,
        server_id: &str,
        action: &str,
        tags: &[ResourceTag],
    ) -> Result<(), ApiError> {
        self.client
            .post::<(), _>(
                &format!("/cloudservers/{}/tags/action", server_id),
                &TagAction { action, tags },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn create_posts_batch_action() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/cloudservers/vm-1/tags/action")
            .match_body(Matcher::Json(serde_json::json!({
                "action": "create",
                "tags": [{"key": "env", "value": "prod"}]
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let tags = vec![ResourceTag {
            key: "env".to_string(),
            value: "prod".to_string(),
        }];
        client.ecs_tags().create("vm-1", &tags).await.unwrap();
        m.assert_async().await;
    }
}
