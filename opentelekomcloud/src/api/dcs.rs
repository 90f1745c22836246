//! DCS v1.0 available zones

use crate::api::{client::Client, error::ApiError};
use serde::Deserialize;

use super::common::null_as_default;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AvailableZone {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// Sent by the API as a string
    #[serde(default, deserialize_with = "null_as_default")]
    pub port: String,
    #[serde(default)]
    pub resource_availability: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailableZones {
    #[serde(default)]
    pub region_id: String,
    #[serde(default)]
    pub available_zones: Vec<AvailableZone>,
}

pub struct AvailableZonesApi<'a> {
    client: &'a Client,
}

impl<'a> AvailableZonesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<AvailableZones, ApiError> {
        self.client.get("/availableZones").await
    }
}
