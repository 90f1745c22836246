pub mod resource_bucket_policy;

pub use resource_bucket_policy::S3BucketPolicyResource;
