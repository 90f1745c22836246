//! Binding floating IPs to the port that carries an instance's private IP

use thiserror::Error;

use crate::api::networking::{FloatingIp, ListFloatingIpsOpts, ListPortsOpts};
use crate::api::{ApiError, Client};

#[derive(Debug, Error)]
pub enum PublicIpError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("floating IP {0} not found")]
    FloatingIpNotFound(String),

    #[error("no port with IP {ip} on subnet {subnet_id}")]
    PortNotFound { ip: String, subnet_id: String },
}

/// Port whose first fixed IP is `private_ip` on the Neutron subnet
pub async fn find_port(
    network: &Client,
    private_ip: &str,
    subnet_id: &str,
) -> Result<Option<String>, ApiError> {
    let ports = network
        .ports()
        .list(&ListPortsOpts {
            fixed_ip_address: Some(private_ip.to_string()),
            fixed_ip_subnet_id: Some(subnet_id.to_string()),
            device_id: None,
        })
        .await?;
    Ok(ports
        .into_iter()
        .find(|port| {
            port.fixed_ips
                .first()
                .is_some_and(|ip| ip.ip_address == private_ip && ip.subnet_id == subnet_id)
        })
        .map(|port| port.id))
}

/// Floating IP by address, or else by the port it is bound to
pub async fn find_floating_ip(
    network: &Client,
    address: Option<&str>,
    port_id: Option<&str>,
) -> Result<Option<FloatingIp>, ApiError> {
    let opts = match address {
        Some(address) => ListFloatingIpsOpts {
            floating_ip_address: Some(address.to_string()),
            port_id: None,
        },
        None => ListFloatingIpsOpts {
            floating_ip_address: None,
            port_id: port_id.map(str::to_string),
        },
    };
    let ips = network.floating_ips().list(&opts).await?;
    Ok(ips.into_iter().find(|ip| {
        address.map_or(true, |a| a == ip.floating_ip_address)
            && port_id.map_or(true, |p| ip.port_id.as_deref() == Some(p))
    }))
}

pub async fn assign(
    network: &Client,
    public_ip: &str,
    private_ip: &str,
    subnet_id: &str,
) -> Result<(), PublicIpError> {
    let port_id = find_port(network, private_ip, subnet_id)
        .await?
        .ok_or_else(|| PublicIpError::PortNotFound {
            ip: private_ip.to_string(),
            subnet_id: subnet_id.to_string(),
        })?;
    let floating_ip = find_floating_ip(network, Some(public_ip), None)
        .await?
        .ok_or_else(|| PublicIpError::FloatingIpNotFound(public_ip.to_string()))?;

    tracing::debug!(public_ip, port_id = %port_id, "Binding floating IP");
    network
        .floating_ips()
        .set_port(&floating_ip.id, Some(&port_id))
        .await?;
    Ok(())
}

pub async fn unassign(network: &Client, public_ip: &str) -> Result<(), PublicIpError> {
    let floating_ip = find_floating_ip(network, Some(public_ip), None)
        .await?
        .ok_or_else(|| PublicIpError::FloatingIpNotFound(public_ip.to_string()))?;

    tracing::debug!(public_ip, "Unbinding floating IP");
    network.floating_ips().set_port(&floating_ip.id, None).await?;
    Ok(())
}

/// Address of the floating IP bound to the instance port, if any
pub async fn assigned_public_ip(
    network: &Client,
    private_ip: &str,
    subnet_id: &str,
) -> Result<Option<String>, ApiError> {
    let Some(port_id) = find_port(network, private_ip, subnet_id).await? else {
        return Ok(None);
    };
    Ok(find_floating_ip(network, None, Some(&port_id))
        .await?
        .map(|ip| ip.floating_ip_address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const PORTS: &str = r#"{"ports": [{"id": "port-1", "fixed_ips": [{"ip_address": "192.168.0.10", "subnet_id": "neutron-1"}]}]}"#;

    #[tokio::test]
    async fn assign_binds_floating_ip_to_instance_port() {
        let mut server = Server::new_async().await;
        let _ports = server
            .mock("GET", "/ports")
            .match_query(Matcher::Any)
            .with_body(PORTS)
            .create_async()
            .await;
        let _ips = server
            .mock("GET", "/floatingips")
            .match_query(Matcher::UrlEncoded(
                "floating_ip_address".into(),
                "80.158.1.1".into(),
            ))
            .with_body(r#"{"floatingips": [{"id": "fip-1", "floating_ip_address": "80.158.1.1", "port_id": null}]}"#)
            .create_async()
            .await;
        let bind = server
            .mock("PUT", "/floatingips/fip-1")
            .match_body(Matcher::Json(json!({"floatingip": {"port_id": "port-1"}})))
            .with_body(r#"{"floatingip": {"id": "fip-1", "floating_ip_address": "80.158.1.1", "port_id": "port-1"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        assign(&client, "80.158.1.1", "192.168.0.10", "neutron-1")
            .await
            .unwrap();
        bind.assert_async().await;
    }

    #[tokio::test]
    async fn assign_without_port_fails() {
        let mut server = Server::new_async().await;
        let _ports = server
            .mock("GET", "/ports")
            .match_query(Matcher::Any)
            .with_body(r#"{"ports": []}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = assign(&client, "80.158.1.1", "192.168.0.10", "neutron-1")
            .await
            .unwrap_err();
        assert!(matches!(err, PublicIpError::PortNotFound { .. }));
    }

    #[tokio::test]
    async fn assigned_ip_is_looked_up_by_port() {
        let mut server = Server::new_async().await;
        let _ports = server
            .mock("GET", "/ports")
            .match_query(Matcher::Any)
            .with_body(PORTS)
            .create_async()
            .await;
        let _ips = server
            .mock("GET", "/floatingips")
            .match_query(Matcher::UrlEncoded("port_id".into(), "port-1".into()))
            .with_body(r#"{"floatingips": [{"id": "fip-1", "floating_ip_address": "80.158.1.1", "port_id": "port-1"}]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ip = assigned_public_ip(&client, "192.168.0.10", "neutron-1")
            .await
            .unwrap();
        assert_eq!(ip.as_deref(), Some("80.158.1.1"));
    }
}
