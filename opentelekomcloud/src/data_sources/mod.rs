//! Data source implementations

pub mod data_source_dcs_az_v1;
pub mod data_source_rds_versions_v3;
pub mod data_source_vpc_bandwidth;

pub use data_source_dcs_az_v1::DcsAzV1DataSource;
pub use data_source_rds_versions_v3::RdsVersionsV3DataSource;
pub use data_source_vpc_bandwidth::VpcBandwidthDataSource;
