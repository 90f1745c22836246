//! WAF v1 policy rules: white/black IP lists and web tamper protection

use crate::api::{client::Client, error::ApiError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WhiteBlackIpRule {
    pub id: String,
    #[serde(default)]
    pub policy_id: String,
    #[serde(default)]
    pub addr: String,
    /// 0 blocks the address, 1 allows it
    #[serde(default)]
    pub white: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWhiteBlackIpRuleRequest {
    pub addr: String,
    pub white: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateWhiteBlackIpRuleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white: Option<i64>,
}

impl UpdateWhiteBlackIpRuleRequest {
    pub fn is_empty(&self) -> bool {
        self.addr.is_none() && self.white.is_none()
    }
}

pub struct WhiteBlackIpRulesApi<'a> {
    client: &'a Client,
}

impl<'a> WhiteBlackIpRulesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn collection(policy_id: &str) -> String {
        format!("/policy/{}/whiteblackip", policy_id)
    }

    pub async fn create(
        &self,
        policy_id: &str,
        request: &CreateWhiteBlackIpRuleRequest,
    ) -> Result<WhiteBlackIpRule, ApiError> {
        self.client.post(&Self::collection(policy_id), request).await
    }

    pub async fn get(&self, policy_id: &str, id: &str) -> Result<WhiteBlackIpRule, ApiError> {
        self.client
            .get(&format!("{}/{}", Self::collection(policy_id), id))
            .await
    }

    pub async fn update(
        &self,
        policy_id: &str,
        id: &str,
        request: &UpdateWhiteBlackIpRuleRequest,
    ) -> Result<WhiteBlackIpRule, ApiError> {
        self.client
            .put(&format!("{}/{}", Self::collection(policy_id), id), request)
            .await
    }

    pub async fn delete(&self, policy_id: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", Self::collection(policy_id), id))
            .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebTamperProtectionRule {
    pub id: String,
    #[serde(default)]
    pub policy_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateWebTamperProtectionRuleRequest {
    pub hostname: String,
    pub url: String,
}

pub struct WebTamperProtectionRulesApi<'a> {
    client: &'a Client,
}

impl<'a> WebTamperProtectionRulesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn collection(policy_id: &str) -> String {
        format!("/policy/{}/antitamper", policy_id)
    }

    pub async fn create(
        &self,
        policy_id: &str,
        request: &CreateWebTamperProtectionRuleRequest,
    ) -> Result<WebTamperProtectionRule, ApiError> {
        self.client.post(&Self::collection(policy_id), request).await
    }

    pub async fn get(&self, policy_id: &str, id: &str) -> Result<WebTamperProtectionRule, ApiError> {
        self.client
            .get(&format!("{}/{}", Self::collection(policy_id), id))
            .await
    }

    pub async fn delete(&self, policy_id: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<()>(&format!("{}/{}", Self::collection(policy_id), id))
            .await
    }
}
