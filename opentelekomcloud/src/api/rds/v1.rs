//! RDS v1: datastore versions, flavors and node resize actions

use crate::api::{client::Client, common::ApiQueryParams, error::ApiError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataStoreVersion {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
struct DataStoreVersionList {
    #[serde(rename = "dataStores", default)]
    data_stores: Vec<DataStoreVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Flavor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "specCode", default)]
    pub spec_code: String,
}

#[derive(Deserialize)]
struct FlavorList {
    #[serde(default)]
    flavors: Vec<Flavor>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlavorRef {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VolumeInfo {
    #[serde(default, rename = "type")]
    pub volume_type: String,
    #[serde(default)]
    pub size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flavor: FlavorRef,
    #[serde(default)]
    pub volume: VolumeInfo,
}

#[derive(Deserialize)]
struct InstanceEnvelope {
    instance: Instance,
}

#[derive(Serialize)]
struct ResizeAction {
    resize: Value,
}

pub struct RdsV1Api<'a> {
    client: &'a Client,
}

impl<'a> RdsV1Api<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /datastores/{name}/versions
    pub async fn list_datastore_versions(
        &self,
        datastore_name: &str,
    ) -> Result<Vec<DataStoreVersion>, ApiError> {
        let response: DataStoreVersionList = self
            .client
            .get(&format!("/datastores/{}/versions", datastore_name))
            .await?;
        Ok(response.data_stores)
    }

    /// GET /flavors?dbId={datastore_id}&region={region}
    pub async fn list_flavors(&self, datastore_id: &str, region: &str) -> Result<Vec<Flavor>, ApiError> {
        let params = ApiQueryParams::new()
            .add("dbId", datastore_id)
            .add("region", region);
        let response: FlavorList = self.client.get_with_params("/flavors", &params).await?;
        Ok(response.flavors)
    }

    pub async fn get_instance(&self, node_id: &str) -> Result<Instance, ApiError> {
        let response: InstanceEnvelope = self
            .client
            .get(&format!("/instances/{}", node_id))
            .await?;
        Ok(response.instance)
    }

    /// Resize the node to another flavor
    pub async fn resize_flavor(&self, node_id: &str, flavor_ref: &str) -> Result<(), ApiError> {
        self.resize(node_id, json!({ "flavorRef": flavor_ref })).await
    }

    /// Grow the node's data volume
    pub async fn resize_volume(&self, node_id: &str, size: i64) -> Result<(), ApiError> {
        self.resize(node_id, json!({ "volume": { "size": size } }))
            .await
    }

    async fn resize(&self, node_id: &str, resize: Value) -> Result<(), ApiError> {
        self.client
            .post::<Value, _>(
                &format!("/instances/{}/action", node_id),
                &ResizeAction { resize },
            )
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn list_flavors_by_datastore() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/flavors")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("dbId".into(), "ds-1".into()),
                Matcher::UrlEncoded("region".into(), "eu-de".into()),
            ]))
            .with_body(r#"{"flavors": [{"id": "f-1", "name": "small", "ram": 4096, "specCode": "rds.pg.c2.medium"}]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let flavors = client.rds_v1().list_flavors("ds-1", "eu-de").await.unwrap();

        assert_eq!(flavors[0].spec_code, "rds.pg.c2.medium");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn resize_volume_posts_action() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/instances/node-1/action")
            .match_body(Matcher::Json(serde_json::json!({"resize": {"volume": {"size": 200}}})))
            .with_status(202)
            .with_body(r#"{"jobId": "j"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.rds_v1().resize_volume("node-1", 200).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn get_instance_reads_flavor_and_volume() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/instances/node-1")
            .with_body(r#"{"instance": {"id": "node-1", "status": "ACTIVE", "flavor": {"id": "f-2"}, "volume": {"type": "COMMON", "size": 100}}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let instance = client.rds_v1().get_instance("node-1").await.unwrap();
        assert_eq!(instance.status, "ACTIVE");
        assert_eq!(instance.flavor.id, "f-2");
        assert_eq!(instance.volume.size, 100);
    }
}
