//! RDS v3: datastores, instances, jobs and backup policy
//!
//! Instance bodies are handled as raw JSON; the resource walks them with
//! `common::navigate_value`.

use crate::api::{client::Client, error::ApiError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataStore {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
struct DataStoreList {
    #[serde(rename = "dataStores", default)]
    data_stores: Vec<DataStore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupPolicy {
    pub keep_days: i64,
    pub start_time: String,
    pub period: String,
}

#[derive(Serialize)]
struct BackupPolicyBody<'a> {
    backup_policy: &'a BackupPolicy,
}

#[derive(Deserialize)]
struct InstanceList {
    #[serde(default)]
    instances: Vec<Value>,
}

pub struct RdsV3Api<'a> {
    client: &'a Client,
}

impl<'a> RdsV3Api<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /datastores/{database_name}
    pub async fn list_datastores(&self, database_name: &str) -> Result<Vec<DataStore>, ApiError> {
        let response: DataStoreList = self
            .client
            .get(&format!("/datastores/{}", database_name))
            .await?;
        Ok(response.data_stores)
    }

    /// POST /instances. The response carries `job_id`.
    pub async fn create_instance(&self, body: &Value) -> Result<Value, ApiError> {
        self.client.post("/instances", body).await
    }

    /// GET /jobs?id={job_id}
    pub async fn get_job(&self, job_id: &str) -> Result<Value, ApiError> {
        self.client
            .get(&format!("/jobs?id={}", urlencoding::encode(job_id)))
            .await
    }

    /// GET /instances?id={id}
    pub async fn list_instances_by_id(&self, id: &str) -> Result<Vec<Value>, ApiError> {
        let response: InstanceList = self
            .client
            .get(&format!("/instances?id={}", urlencoding::encode(id)))
            .await?;
        Ok(response.instances)
    }

    /// The instance with exactly this id, if the list API knows it
    pub async fn find_instance(&self, id: &str) -> Result<Option<Value>, ApiError> {
        Ok(self
            .list_instances_by_id(id)
            .await?
            .into_iter()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(id)))
    }

    pub async fn delete_instance(&self, id: &str) -> Result<Value, ApiError> {
        self.client.delete(&format!("/instances/{}", id)).await
    }

    /// PUT /instances/{id}/backups/policy
    pub async fn update_backup_policy(&self, id: &str, policy: &BackupPolicy) -> Result<(), ApiError> {
        self.client
            .put::<Value, _>(
                &format!("/instances/{}/backups/policy", id),
                &BackupPolicyBody {
                    backup_policy: policy,
                },
            )
            .await
            .map(|_| ())
    }
}
