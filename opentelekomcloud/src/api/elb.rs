//! LBaaS v2 pools and load balancers

use crate::api::{client::Client, error::ApiError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPersistence {
    #[serde(rename = "type")]
    pub persistence_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pool {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub lb_algorithm: String,
    #[serde(default)]
    pub session_persistence: Option<SessionPersistence>,
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
    #[serde(default)]
    pub loadbalancers: Vec<IdRef>,
    #[serde(default)]
    pub listeners: Vec<IdRef>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreatePoolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loadbalancer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener_id: Option<String>,
    pub lb_algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_persistence: Option<SessionPersistence>,
    pub admin_state_up: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePoolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lb_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_persistence: Option<SessionPersistence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
}

#[derive(Serialize)]
struct PoolBody<'a, T> {
    pool: &'a T,
}

#[derive(Deserialize)]
struct PoolEnvelope {
    pool: Pool,
}

pub struct PoolsApi<'a> {
    client: &'a Client,
}

impl<'a> PoolsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreatePoolRequest) -> Result<Pool, ApiError> {
        let response: PoolEnvelope = self.client.post("/pools", &PoolBody { pool: request }).await?;
        Ok(response.pool)
    }

    pub async fn get(&self, id: &str) -> Result<Pool, ApiError> {
        let response: PoolEnvelope = self.client.get(&format!("/pools/{}", id)).await?;
        Ok(response.pool)
    }

    pub async fn update(&self, id: &str, request: &UpdatePoolRequest) -> Result<Pool, ApiError> {
        let response: PoolEnvelope = self
            .client
            .put(&format!("/pools/{}", id), &PoolBody { pool: request })
            .await?;
        Ok(response.pool)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete::<()>(&format!("/pools/{}", id)).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provisioning_status: String,
    #[serde(default)]
    pub operating_status: String,
}

#[derive(Deserialize)]
struct LoadBalancerEnvelope {
    loadbalancer: LoadBalancer,
}

pub struct LoadBalancersApi<'a> {
    client: &'a Client,
}

impl<'a> LoadBalancersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> Result<LoadBalancer, ApiError> {
        let response: LoadBalancerEnvelope =
            self.client.get(&format!("/loadbalancers/{}", id)).await?;
        Ok(response.loadbalancer)
    }
}
