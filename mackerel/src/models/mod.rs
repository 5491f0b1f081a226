//! Entity models
//!
//! Each model mirrors one resource's Terraform attributes. Scalars are
//! `Option`s (null or a value, unknown reads as null), collections are
//! `Option<Vec<_>>` so that null and empty stay distinct, and optional
//! blocks are `Option<Block>`. Required values are only enforced when a
//! model is turned into an API payload, which lets an imported state
//! holding nothing but an ID be read back.

pub mod alert_group_setting;
pub mod aws_integration;
pub mod channel;
pub mod dashboard;
pub mod downtime;
pub mod metadata;
pub mod monitor;
pub mod notification_group;
pub mod role;
pub mod service;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Block, Schema};
use tfplug::validator::OneOfValidator;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::TfplugError;

use crate::api::{ApiError, Client};
use crate::ids::IdError;
use crate::reconcile::Reconcile;
use crate::typeutil::{FloatString, FloatStringError};
use crate::validators::Validators;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Value(#[from] TfplugError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("{path}: {source}")]
    Threshold {
        path: AttributePath,
        source: FloatStringError,
    },

    #[error("{path}: expected one of {expected:?}, got {actual:?}")]
    InvalidEnum {
        path: AttributePath,
        expected: &'static [&'static str],
        actual: String,
    },

    #[error("exactly one of {expected:?} must be configured, got {count}")]
    VariantCount {
        expected: &'static [&'static str],
        count: usize,
    },

    #[error("{0} is required")]
    Missing(AttributePath),

    #[error("{path}: invalid JSON: {message}")]
    InvalidJson { path: AttributePath, message: String },

    #[error("{kind} type {type_name:?} is not managed by this provider")]
    Unsupported {
        kind: &'static str,
        type_name: String,
    },
}

impl ModelError {
    /// The remote object is gone, either by HTTP 404 or a failed lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::Api(e) if e.is_not_found())
    }

    pub fn attribute(&self) -> Option<AttributePath> {
        match self {
            ModelError::Threshold { path, .. }
            | ModelError::InvalidEnum { path, .. }
            | ModelError::InvalidJson { path, .. }
            | ModelError::Missing(path) => Some(path.clone()),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self, summary: impl Into<String>) -> Diagnostic {
        let diagnostic = Diagnostic::error(summary, self.to_string());
        match self.attribute() {
            Some(path) => diagnostic.with_attribute(path),
            None => diagnostic,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// A managed entity: conversion to and from Terraform values plus the
/// API calls behind each lifecycle step
#[async_trait]
pub trait Model: Reconcile + Clone + std::fmt::Debug + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn resource_schema(validators: &Validators) -> Schema;

    fn from_value(value: &DynamicValue) -> Result<Self>;

    fn to_value(&self) -> Result<DynamicValue>;

    /// Nested blocks whose change forces replacement
    fn replace_blocks() -> &'static [&'static str] {
        &[]
    }

    /// Mutually exclusive blocks; moving from one to another forces
    /// replacement while edits inside the chosen block do not
    fn variant_blocks() -> &'static [&'static str] {
        &[]
    }

    /// State seeded from a `terraform import` ID
    fn import_state(id: &str) -> Result<DynamicValue> {
        let mut state = DynamicValue::object();
        state.set_string(&attr("id"), id.to_string())?;
        Ok(state)
    }

    /// Creates the remote object and records server-assigned fields
    async fn create(&mut self, client: &Client) -> Result<()>;

    /// Fetches the remote object as a fresh model
    async fn read(&self, client: &Client) -> Result<Self>;

    async fn update(&mut self, client: &Client) -> Result<()>;

    async fn delete(&self, client: &Client) -> Result<()>;
}

/// A model that can also be looked up by a data source
#[async_trait]
pub trait DataSourceModel: Model {
    fn data_source_schema(validators: &Validators) -> Schema;

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self>;
}

pub(crate) fn attr(name: &str) -> AttributePath {
    AttributePath::new(name)
}

/// Server-assigned `id`, stable across updates
pub(crate) fn id_attribute(description: &str) -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description(description)
        .computed()
        .plan_modifier(UseStateForUnknown::create())
        .build()
}

/// Optional `memo` that reads back as "" when unset
pub(crate) fn memo_attribute() -> Attribute {
    AttributeBuilder::new("memo", AttributeType::String)
        .description("Free-form notes")
        .optional()
        .computed()
        .default(StaticDefault::string(""))
        .build()
}

/// `memo` for entities the API cannot update in place
pub(crate) fn replaceable_memo() -> Attribute {
    let mut memo = memo_attribute();
    memo.plan_modifiers.push(RequiresReplace::create());
    memo
}

pub(crate) fn required_attr(name: &str, r#type: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, r#type)
        .description(description)
        .required()
        .build()
}

pub(crate) fn optional_attr(name: &str, r#type: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, r#type)
        .description(description)
        .optional()
        .build()
}

/// Optional enumerated string
pub(crate) fn choice_attr(name: &str, allowed: &[&str], description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .validator(OneOfValidator::create(allowed.iter().copied()))
        .build()
}

/// Turns a resource schema into a data source schema: `keys` become the
/// required lookup arguments and everything else is computed.
pub(crate) fn into_lookup_schema(mut schema: Schema, keys: &[&str], description: &str) -> Schema {
    fn computed_block(block: &mut Block) {
        for attr in &mut block.attributes {
            attr.required = false;
            attr.optional = false;
            attr.computed = true;
            attr.validators.clear();
            attr.plan_modifiers.clear();
            attr.default = None;
        }
        for nested in &mut block.block_types {
            nested.min_items = 0;
            nested.max_items = 0;
            computed_block(&mut nested.block);
        }
    }

    computed_block(&mut schema.block);
    for attr in &mut schema.block.attributes {
        if keys.contains(&attr.name.as_str()) {
            attr.required = true;
            attr.computed = false;
        }
    }
    schema.block.description = description.to_string();
    schema.config_validators.clear();
    schema
}

/// Typed reads relative to one object, reporting errors at full paths
pub(crate) struct Fields<'a> {
    value: &'a DynamicValue,
    base: AttributePath,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a DynamicValue) -> Self {
        Self {
            value,
            base: AttributePath::root(),
        }
    }

    pub fn path(&self, name: &str) -> AttributePath {
        self.base.clone().attribute(name)
    }

    pub fn string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.value.get_string_opt(&attr(name))?)
    }

    pub fn i64(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.value.get_i64_opt(&attr(name))?)
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>> {
        Ok(self.value.get_bool_opt(&attr(name))?)
    }

    pub fn strings(&self, name: &str) -> Result<Option<Vec<String>>> {
        Ok(self.value.get_string_list_opt(&attr(name))?)
    }

    pub fn string_map(&self, name: &str) -> Result<Option<BTreeMap<String, String>>> {
        Ok(self.value.get_string_map_opt(&attr(name))?)
    }

    pub fn threshold(&self, name: &str) -> Result<Option<FloatString>> {
        self.string(name)?
            .map(|text| {
                FloatString::new(text).map_err(|source| ModelError::Threshold {
                    path: self.path(name),
                    source,
                })
            })
            .transpose()
    }

    /// A string restricted to `allowed`
    pub fn choice(&self, name: &str, allowed: &'static [&'static str]) -> Result<Option<String>> {
        match self.string(name)? {
            Some(value) if !allowed.contains(&value.as_str()) => Err(ModelError::InvalidEnum {
                path: self.path(name),
                expected: allowed,
                actual: value,
            }),
            other => Ok(other),
        }
    }

    /// Reads the single element of a `max_items = 1` block
    pub fn block<T>(
        &self,
        name: &str,
        read: impl FnOnce(Fields<'_>) -> Result<T>,
    ) -> Result<Option<T>> {
        let base = self.path(name).index(0);
        match self.value.get_block(&attr(name))? {
            Some(element) => read(Fields {
                value: &element,
                base,
            })
            .map(Some),
            None => Ok(None),
        }
    }

    pub fn blocks<T>(
        &self,
        name: &str,
        mut read: impl FnMut(Fields<'_>) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.value
            .get_blocks(&attr(name))?
            .iter()
            .enumerate()
            .map(|(idx, element)| {
                read(Fields {
                    value: element,
                    base: self.path(name).index(idx as i64),
                })
            })
            .collect()
    }
}

pub(crate) fn required<T: Clone>(value: &Option<T>, name: &str) -> Result<T> {
    value.clone().ok_or_else(|| ModelError::Missing(attr(name)))
}

/// `value` nested in the single block `block`
pub(crate) fn required_in<T: Clone>(value: &Option<T>, block: &str, name: &str) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| ModelError::Missing(attr(block).index(0).attribute(name)))
}

pub(crate) fn threshold_from_api(value: Option<f64>) -> Option<FloatString> {
    value.map(|v| FloatString::from_f64(Some(v)))
}

/// Converts a threshold for the API; empty and null both mean "none"
pub(crate) fn threshold_to_api(
    value: &Option<FloatString>,
    path: AttributePath,
) -> Result<Option<f64>> {
    match value {
        Some(text) => text
            .to_numeric()
            .map_err(|source| ModelError::Threshold { path, source }),
        None => Ok(None),
    }
}

/// Builds an object with `fill` and stores it as a single block
pub(crate) fn set_block<T>(
    target: &mut DynamicValue,
    name: &str,
    block: &Option<T>,
    fill: impl FnOnce(&T, &mut DynamicValue) -> Result<()>,
) -> Result<()> {
    let element = match block {
        Some(block) => {
            let mut element = DynamicValue::object();
            fill(block, &mut element)?;
            Some(element)
        }
        None => None,
    };
    target.set_block(&attr(name), element)?;
    Ok(())
}

pub(crate) fn set_blocks<T>(
    target: &mut DynamicValue,
    name: &str,
    blocks: &[T],
    mut fill: impl FnMut(&T, &mut DynamicValue) -> Result<()>,
) -> Result<()> {
    let elements = blocks
        .iter()
        .map(|block| {
            let mut element = DynamicValue::object();
            fill(block, &mut element)?;
            Ok(element)
        })
        .collect::<Result<Vec<_>>>()?;
    target.set_blocks(&attr(name), elements)?;
    Ok(())
}

pub(crate) fn set_threshold(
    target: &mut DynamicValue,
    name: &str,
    value: &Option<FloatString>,
) -> Result<()> {
    target.set_string_opt(&attr(name), value.as_ref().map(|v| v.as_str().to_string()))?;
    Ok(())
}

/// API strings where "" means unset
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Exactly one of the variants must be present
pub(crate) fn check_variants(expected: &'static [&'static str], present: &[bool]) -> Result<()> {
    let count = present.iter().filter(|p| **p).count();
    if count == 1 {
        Ok(())
    } else {
        Err(ModelError::VariantCount { expected, count })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn value(json: &str) -> DynamicValue {
        DynamicValue::decode_json(json.as_bytes()).unwrap()
    }

    #[test]
    fn fields_report_nested_paths() {
        let v = value(r#"{"host_metric": [{"warning": "lots"}]}"#);
        let err = Fields::new(&v)
            .block("host_metric", |f| f.threshold("warning"))
            .unwrap_err();

        assert_eq!(
            err.attribute().map(|p| p.to_string()),
            Some("host_metric[0].warning".to_string())
        );
    }

    #[test]
    fn unknown_reads_as_null() {
        let v = value(r#"{"id": "__unknown__", "name": "svc"}"#);
        let fields = Fields::new(&v);
        assert_eq!(fields.string("id").unwrap(), None);
        assert_eq!(fields.string("name").unwrap(), Some("svc".to_string()));
    }

    #[test]
    fn choice_rejects_unlisted_values() {
        let v = value(r#"{"level": "some"}"#);
        let err = Fields::new(&v).choice("level", &["all", "critical"]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidEnum { .. }));
    }

    #[test]
    fn not_found_classification() {
        assert!(ModelError::from(ApiError::not_found("channel", "x")).is_not_found());
        assert!(!ModelError::Missing(attr("name")).is_not_found());
    }

    #[test]
    fn variant_count() {
        assert!(check_variants(&["a", "b"], &[false, true]).is_ok());
        assert!(matches!(
            check_variants(&["a", "b"], &[true, true]),
            Err(ModelError::VariantCount { count: 2, .. })
        ));
    }
}
