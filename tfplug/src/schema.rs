//! Schema types and builders for tfplug
//!
//! Schemas describe the attributes and nested blocks of providers, resources
//! and data sources, together with the validators, plan modifiers and
//! defaults attached to them.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

static NULL: Dynamic = Dynamic::Null;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list_of_strings() -> Self {
        AttributeType::List(Box::new(AttributeType::String))
    }

    pub fn set_of_strings() -> Self {
        AttributeType::Set(Box::new(AttributeType::String))
    }

    pub fn map_of_strings() -> Self {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

#[derive(Debug)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
    pub config_validators: Vec<Box<dyn ConfigValidator>>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block.block_types.iter().find(|b| b.type_name == name)
    }

    /// Runs required-attribute checks, attribute validators, block count
    /// limits and config-level validators against `config`.
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.block
            .validate_at(&config.value, &AttributePath::root(), &mut diagnostics);
        for validator in &self.config_validators {
            diagnostics.extend(validator.validate(config));
        }
        diagnostics
    }
}

#[derive(Debug)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    fn empty() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            block_types: Vec::new(),
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        }
    }

    fn validate_at(
        &self,
        value: &Dynamic,
        path: &AttributePath,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let entries = match value {
            Dynamic::Map(entries) => Some(entries),
            _ => None,
        };
        let lookup = |name: &str| entries.and_then(|m| m.get(name)).unwrap_or(&NULL);

        for attr in &self.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let attr_value = lookup(&attr.name);
            if attr_value.is_unknown() {
                continue;
            }
            if attr_value.is_null() {
                if attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required", attr_path),
                        )
                        .with_attribute(attr_path),
                    );
                }
                continue;
            }
            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(attr_value.clone()),
                    path: attr_path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        for nested in &self.block_types {
            let block_path = path.clone().attribute(&nested.type_name);
            let items = match lookup(&nested.type_name) {
                Dynamic::Unknown => continue,
                Dynamic::List(items) => items.as_slice(),
                _ => &[],
            };

            if nested.min_items > 0 && (items.len() as i64) < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(
                        "Insufficient blocks",
                        format!(
                            "At least {} \"{}\" block(s) are required",
                            nested.min_items, nested.type_name
                        ),
                    )
                    .with_attribute(block_path.clone()),
                );
            }
            if nested.max_items > 0 && (items.len() as i64) > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(
                        "Too many blocks",
                        format!(
                            "No more than {} \"{}\" block(s) are allowed",
                            nested.max_items, nested.type_name
                        ),
                    )
                    .with_attribute(block_path.clone()),
                );
            }

            for (idx, item) in items.iter().enumerate() {
                nested
                    .block
                    .validate_at(item, &block_path.clone().index(idx as i64), diagnostics);
            }
        }
    }
}

pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
    pub deprecated: bool,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator checks a single configured attribute value
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// ConfigValidator checks relationships across the whole configuration,
/// e.g. that exactly one of several blocks is present
pub trait ConfigValidator: Send + Sync + std::fmt::Debug {
    fn description(&self) -> String;
    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic>;
}

/// PlanModifier adjusts the planned value of one attribute
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default supplies a value for an optional+computed attribute left unset
pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: DynamicValue,
}

pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
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

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn validators(mut self, validators: Vec<Box<dyn Validator>>) -> Self {
        self.attribute.validators.extend(validators);
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// Builds a nested block. Blocks default to list nesting with no item limits.
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::empty(),
                nesting: NestingMode::List,
                min_items: 0,
                max_items: 0,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn nesting(mut self, nesting: NestingMode) -> Self {
        self.nested.nesting = nesting;
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    /// Shorthand for a list block holding at most one element
    pub fn single(self) -> Self {
        self.nesting(NestingMode::List).max_items(1)
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::empty(),
                config_validators: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn config_validator(mut self, validator: Box<dyn ConfigValidator>) -> Self {
        self.schema.config_validators.push(validator);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
