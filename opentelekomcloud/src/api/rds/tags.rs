//! RDS v1 node tags

use crate::api::{client::Client, ecs::ResourceTag, error::ApiError};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<ResourceTag>,
}

#[derive(Serialize)]
struct TagBody<'a> {
    tag: &'a ResourceTag,
}

#[derive(Serialize)]
struct TagKey<'a> {
    key: &'a str,
}

pub struct RdsTagsApi<'a> {
    client: &'a Client,
}

impl<'a> RdsTagsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self, node_id: &str) -> Result<Vec<ResourceTag>, ApiError> {
        let response: TagList = self.client.get(&format!("/{}/tags", node_id)).await?;
        Ok(response.tags)
    }

    pub async fn create(&self, node_id: &str, tag: &ResourceTag) -> Result<(), ApiError> {
        self.client
            .post::<(), _>(&format!("/{}/tags", node_id), &TagBody { tag })
            .await
    }

    pub async fn delete(&self, node_id: &str, key: &str) -> Result<(), ApiError> {
        self.client
            .delete_with_body::<(), _>(&format!("/{}/tags", node_id), &TagKey { key })
            .await
    }
}
