//! Terraform provider for OpenTelekomCloud built on `tfplug`

pub mod api;
pub mod common;
pub mod config;
pub mod data_sources;
pub mod logging;
pub mod provider;
pub mod provider_data;
pub mod resources;

pub use config::{Config, ProviderOptions};
pub use provider::OtcProvider;
pub use provider_data::{OtcProviderData, PollSettings};
