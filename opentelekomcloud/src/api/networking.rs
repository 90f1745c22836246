//! Networking v2.0 ports and floating IPs

use crate::api::{client::Client, common::ApiQueryParams, error::ApiError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedIp {
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Debug, Clone, Default)]
pub struct ListPortsOpts {
    pub fixed_ip_address: Option<String>,
    pub fixed_ip_subnet_id: Option<String>,
    pub device_id: Option<String>,
}

impl ListPortsOpts {
    fn query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_optional(
                "fixed_ips",
                self.fixed_ip_address
                    .as_ref()
                    .map(|ip| format!("ip_address={}", ip)),
            )
            .add_optional(
                "fixed_ips",
                self.fixed_ip_subnet_id
                    .as_ref()
                    .map(|subnet| format!("subnet_id={}", subnet)),
            )
            .add_optional("device_id", self.device_id.as_deref())
    }
}

#[derive(Deserialize)]
struct PortList {
    #[serde(default)]
    ports: Vec<Port>,
}

pub struct PortsApi<'a> {
    client: &'a Client,
}

impl<'a> PortsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self, opts: &ListPortsOpts) -> Result<Vec<Port>, ApiError> {
        let response: PortList = self.client.get_with_params("/ports", &opts.query()).await?;
        Ok(response.ports)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FloatingIp {
    pub id: String,
    #[serde(default)]
    pub floating_ip_address: String,
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub fixed_ip_address: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tenant_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListFloatingIpsOpts {
    pub floating_ip_address: Option<String>,
    pub port_id: Option<String>,
}

#[derive(Deserialize)]
struct FloatingIpList {
    #[serde(default)]
    floatingips: Vec<FloatingIp>,
}

#[derive(Deserialize)]
struct FloatingIpEnvelope {
    floatingip: FloatingIp,
}

#[derive(Serialize)]
struct UpdateFloatingIp<'a> {
    floatingip: PortBinding<'a>,
}

/// `port_id: null` detaches the floating IP
#[derive(Serialize)]
struct PortBinding<'a> {
    port_id: Option<&'a str>,
}

pub struct FloatingIpsApi<'a> {
    client: &'a Client,
}

impl<'a> FloatingIpsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self, opts: &ListFloatingIpsOpts) -> Result<Vec<FloatingIp>, ApiError> {
        let params = ApiQueryParams::new()
            .add_optional("floating_ip_address", opts.floating_ip_address.as_deref())
            .add_optional("port_id", opts.port_id.as_deref());
        let response: FloatingIpList = self.client.get_with_params("/floatingips", &params).await?;
        Ok(response.floatingips)
    }

    pub async fn get(&self, id: &str) -> Result<FloatingIp, ApiError> {
        let response: FloatingIpEnvelope =
            self.client.get(&format!("/floatingips/{}", id)).await?;
        Ok(response.floatingip)
    }

    /// Bind the floating IP to `port_id`, or unbind it with `None`
    pub async fn set_port(&self, id: &str, port_id: Option<&str>) -> Result<FloatingIp, ApiError> {
        let body = UpdateFloatingIp {
            floatingip: PortBinding { port_id },
        };
        let response: FloatingIpEnvelope = self
            .client
            .put(&format!("/floatingips/{}", id), &body)
            .await?;
        Ok(response.floatingip)
    }
}
