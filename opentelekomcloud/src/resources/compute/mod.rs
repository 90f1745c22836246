pub mod resource_servergroup_v2;

pub use resource_servergroup_v2::ComputeServerGroupV2Resource;
