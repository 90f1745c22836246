pub mod auth;
pub mod client;
pub mod common;
pub mod compute;
pub mod dcs;
pub mod ecs;
pub mod elb;
pub mod error;
pub mod networking;
pub mod pool;
pub mod rds;
pub mod s3;
pub mod vpc;
pub mod waf;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, RetryConfig};
pub use common::ApiQueryParams;
pub use error::ApiError;
