//! Relational database instances

mod expand;
mod flatten;
mod public_ip;
pub mod resource_instance_v3;

pub use resource_instance_v3::RdsInstanceV3Resource;
