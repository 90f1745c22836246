//! Relational Database Service APIs
//!
//! Instances are managed through v3. Flavor and volume resizes still go
//! through the v1 node actions, and tags through the v1 tag endpoint.

pub mod tags;
pub mod v1;
pub mod v3;

/// Header every RDS endpoint expects
pub const LANGUAGE_HEADER: (&str, &str) = ("X-Language", "en-us");
