//! Value model shared by providers, resources and data sources
//!
//! Terraform values are tri-state: null, unknown (only while planning) or a
//! concrete value. `Dynamic` carries all three, and the typed accessors on
//! `DynamicValue` keep them apart. The `*_opt` getters collapse null,
//! unknown and absent attributes into `None` while still rejecting values of
//! the wrong type.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const UNKNOWN_SENTINEL: &str = "__unknown__";

/// Any Terraform value. Objects and maps are both represented as `Map`,
/// lists and sets both as `List`.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    Map(HashMap<String, Dynamic>),
    /// Value not known until apply
    Unknown,
}

impl Dynamic {
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Builds a list of strings, preserving order
    pub fn string_list<I, S>(values: I) -> Dynamic
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dynamic::List(
            values
                .into_iter()
                .map(|s| Dynamic::String(s.into()))
                .collect(),
        )
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(items) => items.serialize(serializer),
            Dynamic::Map(entries) => entries.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, SeqAccess, Visitor};

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a terraform value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                if value == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_seq<V: SeqAccess<'de>>(
                self,
                mut seq: V,
            ) -> std::result::Result<Dynamic, V::Error> {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Dynamic::List(items))
            }

            fn visit_map<V: MapAccess<'de>>(
                self,
                mut map: V,
            ) -> std::result::Result<Dynamic, V::Error> {
                let mut entries = HashMap::new();
                while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
                    entries.insert(key, value);
                }
                Ok(Dynamic::Map(entries))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// A configuration, plan or state object as handed to resources
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self::new(Dynamic::Null)
    }

    pub fn unknown() -> Self {
        Self::new(Dynamic::Unknown)
    }

    /// An empty object, the usual starting point when building state
    pub fn object() -> Self {
        Self::new(Dynamic::Map(HashMap::new()))
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    /// Raw access to the value at `path`
    pub fn get(&self, path: &AttributePath) -> Result<&Dynamic> {
        self.navigate_path(path)
    }

    /// Like `get`, but absent, null and unknown values all yield `None`
    pub fn get_opt(&self, path: &AttributePath) -> Option<&Dynamic> {
        match self.navigate_path(path) {
            Ok(Dynamic::Null) | Ok(Dynamic::Unknown) | Err(_) => None,
            Ok(value) => Some(value),
        }
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.navigate_path(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(mismatch(path, "string", other)),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        match self.navigate_path(path)? {
            Dynamic::Number(n) => Ok(*n),
            other => Err(mismatch(path, "number", other)),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.navigate_path(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(mismatch(path, "bool", other)),
        }
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        match self.navigate_path(path)? {
            Dynamic::List(l) => Ok(l.clone()),
            other => Err(mismatch(path, "list", other)),
        }
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        match self.navigate_path(path)? {
            Dynamic::Map(m) => Ok(m.clone()),
            other => Err(mismatch(path, "map", other)),
        }
    }

    pub fn get_string_opt(&self, path: &AttributePath) -> Result<Option<String>> {
        match self.get_opt(path) {
            None => Ok(None),
            Some(Dynamic::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(mismatch(path, "string", other)),
        }
    }

    pub fn get_number_opt(&self, path: &AttributePath) -> Result<Option<f64>> {
        match self.get_opt(path) {
            None => Ok(None),
            Some(Dynamic::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(mismatch(path, "number", other)),
        }
    }

    /// Like `get_number_opt`, but only whole numbers within `i64` range
    pub fn get_i64_opt(&self, path: &AttributePath) -> Result<Option<i64>> {
        // 2^63; i64::MAX itself is not representable as f64
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        match self.get_number_opt(path)? {
            None => Ok(None),
            Some(n) if n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n) => Ok(Some(n as i64)),
            Some(n) => Err(TfplugError::TypeMismatch {
                path: path.to_string(),
                expected: "integer".to_string(),
                actual: format!("number {}", n),
            }),
        }
    }

    pub fn get_bool_opt(&self, path: &AttributePath) -> Result<Option<bool>> {
        match self.get_opt(path) {
            None => Ok(None),
            Some(Dynamic::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(path, "bool", other)),
        }
    }

    /// Reads a list or set of strings. `None` means null, `Some(vec![])` an
    /// explicitly empty collection.
    pub fn get_string_list_opt(&self, path: &AttributePath) -> Result<Option<Vec<String>>> {
        match self.get_opt(path) {
            None => Ok(None),
            Some(Dynamic::List(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null() && !item.is_unknown())
                .map(|(idx, item)| match item {
                    Dynamic::String(s) => Ok(s.clone()),
                    other => Err(mismatch(&path.clone().index(idx as i64), "string", other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(mismatch(path, "list", other)),
        }
    }

    /// Reads a map of strings, keeping null distinct from empty
    pub fn get_string_map_opt(
        &self,
        path: &AttributePath,
    ) -> Result<Option<std::collections::BTreeMap<String, String>>> {
        match self.get_opt(path) {
            None => Ok(None),
            Some(Dynamic::Map(entries)) => entries
                .iter()
                .map(|(key, value)| match value {
                    Dynamic::String(s) => Ok((key.clone(), s.clone())),
                    other => Err(mismatch(&path.clone().key(key), "string", other)),
                })
                .collect::<Result<_>>()
                .map(Some),
            Some(other) => Err(mismatch(path, "map", other)),
        }
    }

    /// Elements of a nested block collection, each wrapped as its own
    /// object. Null and unknown collections yield no elements.
    pub fn get_blocks(&self, path: &AttributePath) -> Result<Vec<DynamicValue>> {
        match self.get_opt(path) {
            None => Ok(Vec::new()),
            Some(Dynamic::List(items)) => Ok(items
                .iter()
                .filter(|item| !item.is_null())
                .cloned()
                .map(DynamicValue::new)
                .collect()),
            Some(other) => Err(mismatch(path, "list", other)),
        }
    }

    /// The single element of a block declared with `max_items = 1`
    pub fn get_block(&self, path: &AttributePath) -> Result<Option<DynamicValue>> {
        let mut blocks = self.get_blocks(path)?;
        match blocks.len() {
            0 => Ok(None),
            1 => Ok(blocks.pop()),
            n => Err(TfplugError::InvalidConfiguration(format!(
                "{} accepts at most one block, got {}",
                path, n
            ))),
        }
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::List(value))
    }

    pub fn set_map(&mut self, path: &AttributePath, value: HashMap<String, Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::Map(value))
    }

    /// Writes any value at `path`, creating intermediate objects
    pub fn set(&mut self, path: &AttributePath, value: Dynamic) -> Result<()> {
        self.set_value(path, value)
    }

    pub fn set_null(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Null)
    }

    pub fn set_string_opt(&mut self, path: &AttributePath, value: Option<String>) -> Result<()> {
        self.set_value(path, value.map(Dynamic::String).unwrap_or(Dynamic::Null))
    }

    pub fn set_number_opt(&mut self, path: &AttributePath, value: Option<f64>) -> Result<()> {
        self.set_value(path, value.map(Dynamic::Number).unwrap_or(Dynamic::Null))
    }

    pub fn set_i64_opt(&mut self, path: &AttributePath, value: Option<i64>) -> Result<()> {
        self.set_number_opt(path, value.map(|n| n as f64))
    }

    pub fn set_bool_opt(&mut self, path: &AttributePath, value: Option<bool>) -> Result<()> {
        self.set_value(path, value.map(Dynamic::Bool).unwrap_or(Dynamic::Null))
    }

    pub fn set_string_list_opt(
        &mut self,
        path: &AttributePath,
        value: Option<Vec<String>>,
    ) -> Result<()> {
        self.set_value(path, value.map(Dynamic::string_list).unwrap_or(Dynamic::Null))
    }

    pub fn set_string_map_opt(
        &mut self,
        path: &AttributePath,
        value: Option<std::collections::BTreeMap<String, String>>,
    ) -> Result<()> {
        let value = value
            .map(|entries| {
                Dynamic::Map(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k, Dynamic::String(v)))
                        .collect(),
                )
            })
            .unwrap_or(Dynamic::Null);
        self.set_value(path, value)
    }

    /// Writes a nested block collection
    pub fn set_blocks(&mut self, path: &AttributePath, blocks: Vec<DynamicValue>) -> Result<()> {
        self.set_value(
            path,
            Dynamic::List(blocks.into_iter().map(|b| b.value).collect()),
        )
    }

    /// Writes a `max_items = 1` block; `None` becomes an empty block list
    pub fn set_block(&mut self, path: &AttributePath, block: Option<DynamicValue>) -> Result<()> {
        self.set_blocks(path, block.into_iter().collect())
    }

    /// Mark computed values as unknown during planning
    pub fn mark_unknown(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Unknown)
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(path.to_string()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => usize::try_from(*idx)
                    .ok()
                    .and_then(|idx| l.get(idx))
                    .ok_or_else(|| {
                        TfplugError::InvalidPath(format!("index {} out of bounds in {}", idx, path))
                    })?,
                (Dynamic::Null, _) => {
                    return Err(TfplugError::AttributeNotFound(path.to_string()));
                }
                (other, _) => {
                    return Err(TfplugError::InvalidPath(format!(
                        "cannot step into {} at {}",
                        other.type_name(),
                        path
                    )));
                }
            };
        }

        Ok(current)
    }

    fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for (idx, step) in parents.iter().enumerate() {
            let next_is_index = matches!(
                path.steps.get(idx + 1),
                Some(AttributePathStep::ElementKeyInt(_))
            );
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    let slot = m.entry(name.clone()).or_insert(Dynamic::Null);
                    if slot.is_null() || slot.is_unknown() {
                        *slot = if next_is_index {
                            Dynamic::List(Vec::new())
                        } else {
                            Dynamic::Map(HashMap::new())
                        };
                    }
                    slot
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                    let len = l.len();
                    usize::try_from(*i)
                        .ok()
                        .and_then(|i| l.get_mut(i))
                        .ok_or_else(|| {
                            TfplugError::InvalidPath(format!(
                                "index {} out of bounds (len {}) in {}",
                                i, len, path
                            ))
                        })?
                }
                (other, _) => {
                    return Err(TfplugError::InvalidPath(format!(
                        "cannot step into {} at {}",
                        other.type_name(),
                        path
                    )));
                }
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(i)) => {
                let len = l.len();
                match usize::try_from(*i).ok().and_then(|i| l.get_mut(i)) {
                    Some(slot) => {
                        *slot = new_value;
                        Ok(())
                    }
                    None => Err(TfplugError::InvalidPath(format!(
                        "index {} out of bounds (len {}) in {}",
                        i, len, path
                    ))),
                }
            }
            (other, _) => Err(TfplugError::InvalidPath(format!(
                "cannot set inside {} at {}",
                other.type_name(),
                path
            ))),
        }
    }
}

fn mismatch(path: &AttributePath, expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyString(String),
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// True when any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Invalid,
    Error,
    Warning,
}

#[derive(Debug, Clone, Default)]
pub struct ServerCapabilities {
    pub plan_destroy: bool,
    pub get_provider_schema_optional: bool,
    pub move_resource_state: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClientCapabilities {
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}

#[derive(Debug, Clone)]
pub struct Deferred {
    pub reason: DeferredReason,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredReason {
    Unknown,
    ResourceConfigUnknown,
    ProviderConfigUnknown,
    AbsentPrereq,
}

#[derive(Debug, Clone)]
pub struct ResourceIdentityData {
    pub identity_data: DynamicValue,
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;
