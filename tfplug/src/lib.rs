//! tfplug - Terraform provider framework for Rust
//!
//! Providers, resources and data sources implement async traits over
//! dynamically typed values. [`host::ProviderHost`] drives them through the
//! Terraform lifecycle in process, and [`testing`] runs acceptance-style test
//! cases on top of it.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod retry;
pub mod validator;
pub mod wait;

// Lifecycle driver and test harness
pub mod host;
pub mod testing;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use host::{PlanAction, ProviderHost};
pub use import::{import_state_composite_id, import_state_passthrough_id};
pub use provider::{DataSourceFactory, Provider, ResourceFactory};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use retry::{retry, RetryError, RetryableError};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
pub use wait::{StateChangeConf, WaitError};
