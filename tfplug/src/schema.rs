//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider, resource and
//! data source schemas, including attribute types, nested blocks, validation,
//! plan modification, defaults and operation timeouts.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list_of(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn map_of(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    pub fn object(fields: &[(&str, AttributeType)]) -> Self {
        AttributeType::Object(
            fields
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
        )
    }

    /// Structural type check. Null and unknown conform to every type.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(inner), Dynamic::List(items))
            | (AttributeType::Set(inner), Dynamic::List(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (AttributeType::Map(inner), Dynamic::Map(entries)) => {
                entries.values().all(|item| inner.accepts(item))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => {
                entries.iter().all(|(key, item)| {
                    fields.get(key).is_some_and(|field| field.accepts(item))
                })
            }
            _ => false,
        }
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
    pub timeouts: Timeouts,
}

/// Per-operation deadlines. Unset operations use the host default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub create: Option<Duration>,
    pub read: Option<Duration>,
    pub update: Option<Duration>,
    pub delete: Option<Duration>,
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub deprecated: bool,
}

impl Block {
    pub fn empty() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            block_types: Vec::new(),
            description: String::new(),
            deprecated: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.attribute(name).is_some() || self.nested_block(name).is_some()
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
    pub deprecated: bool,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
    /// Computed blocks may be omitted from configuration and filled by the provider
    pub computed: bool,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

impl std::fmt::Debug for NestedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedBlock")
            .field("type_name", &self.type_name)
            .field("block", &self.block)
            .field("nesting", &self.nesting)
            .field("min_items", &self.min_items)
            .field("max_items", &self.max_items)
            .field("computed", &self.computed)
            .finish()
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Single,
    List,
    Set,
}

/// Validator performs validation on attribute values during validation
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from validators
#[derive(Default)]
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides default values for optional attributes
/// Called when attribute is not set in configuration
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Changing this attribute destroys and recreates the resource
    pub fn force_new(self) -> Self {
        self.plan_modifier(Arc::new(crate::plan_modifier::RequiresReplaceIfChanged))
    }

    /// Add validator
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    /// Add plan modifier
    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    /// Set default
    pub fn default(mut self, default: Arc<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder builds `block { ... }` style configuration
pub struct NestedBlockBuilder {
    block: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            block: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::empty(),
                nesting,
                min_items: 0,
                max_items: 0,
                computed: false,
                plan_modifiers: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.block.description = desc.to_string();
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.block.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.block.max_items = max;
        self
    }

    pub fn computed(mut self) -> Self {
        self.block.computed = true;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, nested: NestedBlock) -> Self {
        self.block.block.block_types.push(nested);
        self
    }

    pub fn force_new(self) -> Self {
        self.plan_modifier(Arc::new(crate::plan_modifier::RequiresReplaceIfChanged))
    }

    pub fn plan_modifier(mut self, modifier: Arc<dyn PlanModifier>) -> Self {
        self.block.plan_modifiers.push(modifier);
        self
    }

    pub fn build(self) -> NestedBlock {
        self.block
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::empty(),
                timeouts: Timeouts {
                    create: None,
                    read: None,
                    update: None,
                    delete: None,
                },
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.schema.timeouts.create = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.schema.timeouts.read = Some(timeout);
        self
    }

    pub fn update_timeout(mut self, timeout: Duration) -> Self {
        self.schema.timeouts.update = Some(timeout);
        self
    }

    pub fn delete_timeout(mut self, timeout: Duration) -> Self {
        self.schema.timeouts.delete = Some(timeout);
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn force_new_survives_clone() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .required()
            .force_new()
            .build();

        let cloned = attr.clone();
        assert_eq!(cloned.plan_modifiers.len(), 1);
    }

    #[test]
    fn schema_builder_collects_blocks_and_timeouts() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("volume", NestingMode::List)
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("size", AttributeType::Number)
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .create_timeout(Duration::from_secs(1800))
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 1);
        assert!(schema.block.nested_block("volume").is_some());
        assert!(schema.block.has_field("id"));
        assert_eq!(schema.timeouts.create, Some(Duration::from_secs(1800)));
        assert_eq!(schema.timeouts.delete, None);
    }

    #[test]
    fn attribute_type_accepts_matching_values() {
        let object_type = AttributeType::object(&[
            ("host", AttributeType::String),
            ("port", AttributeType::Number),
        ]);

        let value = Dynamic::Map(HashMap::from([
            ("host".to_string(), Dynamic::string("db")),
            ("port".to_string(), Dynamic::Number(3306.0)),
        ]));
        assert!(object_type.accepts(&value));

        let bad = Dynamic::Map(HashMap::from([(
            "port".to_string(),
            Dynamic::string("3306"),
        )]));
        assert!(!object_type.accepts(&bad));

        let tags = AttributeType::map_of(AttributeType::String);
        assert!(tags.accepts(&Dynamic::Null));
        assert!(!tags.accepts(&Dynamic::List(vec![])));
    }
}
