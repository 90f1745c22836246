//! VPC v1 bandwidths and subnets

use crate::api::{client::Client, common::ApiQueryParams, error::ApiError};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Bandwidth {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub share_type: String,
    #[serde(default)]
    pub bandwidth_type: String,
    #[serde(default)]
    pub charge_mode: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub enterprise_project_id: Option<String>,
}

#[derive(Deserialize)]
struct BandwidthList {
    #[serde(default)]
    bandwidths: Vec<Bandwidth>,
}

/// Query for `GET /bandwidths`
#[derive(Debug, Clone, Default)]
pub struct ListBandwidthsOpts {
    pub share_type: Option<String>,
    pub enterprise_project_id: Option<String>,
}

pub struct BandwidthsApi<'a> {
    client: &'a Client,
}

impl<'a> BandwidthsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self, opts: &ListBandwidthsOpts) -> Result<Vec<Bandwidth>, ApiError> {
        let params = ApiQueryParams::new()
            .add_optional("share_type", opts.share_type.as_deref())
            .add_optional("enterprise_project_id", opts.enterprise_project_id.as_deref());
        let response: BandwidthList = self.client.get_with_params("/bandwidths", &params).await?;
        Ok(response.bandwidths)
    }
}

/// VPC v1 subnet. `subnet_id` is the id of the matching Neutron subnet.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub vpc_id: String,
}

#[derive(Deserialize)]
struct SubnetEnvelope {
    subnet: Subnet,
}

pub struct SubnetsApi<'a> {
    client: &'a Client,
}

impl<'a> SubnetsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> Result<Subnet, ApiError> {
        let response: SubnetEnvelope = self.client.get(&format!("/subnets/{}", id)).await?;
        Ok(response.subnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn list_bandwidths_filters_share_type() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/bandwidths")
            .match_query(Matcher::UrlEncoded("share_type".into(), "WHOLE".into()))
            .with_body(
                r#"{"bandwidths": [
                    {"id": "bw-1", "name": "shared", "size": 10, "share_type": "WHOLE", "bandwidth_type": "share", "charge_mode": "bandwidth", "status": "NORMAL", "publicip_info": []}
                ]}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let opts = ListBandwidthsOpts {
            share_type: Some("WHOLE".to_string()),
            ..Default::default()
        };
        let bandwidths = client.bandwidths().list(&opts).await.unwrap();

        assert_eq!(bandwidths.len(), 1);
        assert_eq!(bandwidths[0].size, 10);
        assert_eq!(bandwidths[0].bandwidth_type, "share");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn get_subnet_returns_neutron_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/subnets/vpc-subnet")
            .with_body(r#"{"subnet": {"id": "vpc-subnet", "name": "s1", "subnet_id": "neutron-subnet", "vpc_id": "vpc-1"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let subnet = client.vpc_subnets().get("vpc-subnet").await.unwrap();
        assert_eq!(subnet.subnet_id, "neutron-subnet");
    }
}
