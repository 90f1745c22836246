pub mod compute;
pub mod elb;
pub mod networking;
pub mod rds;
pub mod s3;
pub mod waf;

pub use compute::ComputeServerGroupV2Resource;
pub use elb::LbPoolV2Resource;
pub use networking::FloatingIpAssociateV2Resource;
pub use rds::RdsInstanceV3Resource;
pub use s3::S3BucketPolicyResource;
pub use waf::{WafWebTamperProtectionRuleV1Resource, WafWhiteBlackIpRuleV1Resource};
