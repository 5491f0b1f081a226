//! Reusable attribute and configuration validators
//!
//! Pattern validators take an already compiled `Regex` so that callers can
//! build each expression once and share it between schemas.

use crate::schema::{ConfigValidator, Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use regex::Regex;

fn respond(diagnostics: Vec<Diagnostic>) -> ValidatorResponse {
    ValidatorResponse { diagnostics }
}

/// Checks the character length of a string
pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn at_least(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = request.config_value.value.as_str() {
            let len = s.chars().count();
            if self.min.is_some_and(|min| len < min) || self.max.is_some_and(|max| len > max) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid length for {}", request.path),
                        format!("expected {}, got length {}", self.description(), len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Requires a string to match a regular expression
pub struct StringPatternValidator {
    pattern: Regex,
    message: String,
}

impl StringPatternValidator {
    pub fn create(pattern: Regex, message: impl Into<String>) -> Box<dyn Validator> {
        Box::new(Self {
            pattern,
            message: message.into(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.message.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = request.config_value.value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("{:?} {}", s, self.message),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Restricts a string (or every string in a list) to a fixed set
pub struct OneOfValidator {
    allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn create<I, S>(allowed: I) -> Box<dyn Validator>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Box::new(Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        })
    }

    fn check(&self, value: &Dynamic, path: AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        match value {
            Dynamic::String(s) if !self.allowed.iter().any(|a| a == s) => diagnostics.push(
                Diagnostic::error(
                    format!("Invalid value for {}", path),
                    format!("expected one of {:?}, got {:?}", self.allowed, s),
                )
                .with_attribute(path),
            ),
            Dynamic::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.check(item, path.clone().index(idx as i64), diagnostics);
                }
            }
            _ => {}
        }
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("one of {:?}", self.allowed)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        self.check(&request.config_value.value, request.path, &mut diagnostics);
        respond(diagnostics)
    }
}

/// Bounds a number
pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn at_least(min: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn between(min: f64, max: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(n) = request.config_value.value.as_number() {
            if self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Value out of range for {}", request.path),
                        format!("expected {}, got {}", self.description(), n),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Bounds the number of elements in a list or set
pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn at_least(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("between {:?} and {:?} elements", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::List(items) = &request.config_value.value {
            let len = items.len();
            if self.min.is_some_and(|min| len < min) || self.max.is_some_and(|max| len > max) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid number of elements for {}", request.path),
                        format!("expected {}, got {}", self.description(), len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        respond(diagnostics)
    }
}

/// Requires exactly one of the named top-level attributes or blocks to be
/// configured. Empty block lists count as absent.
#[derive(Debug)]
pub struct ExactlyOneOf {
    names: Vec<String>,
}

impl ExactlyOneOf {
    pub fn create(names: &[&str]) -> Box<dyn ConfigValidator> {
        Box::new(Self {
            names: names.iter().map(|n| n.to_string()).collect(),
        })
    }

    fn is_set(config: &DynamicValue, name: &str) -> Option<bool> {
        match config.get_opt(&AttributePath::new(name)) {
            None => match config.get(&AttributePath::new(name)) {
                Ok(Dynamic::Unknown) => None,
                _ => Some(false),
            },
            Some(Dynamic::List(items)) => Some(!items.is_empty()),
            Some(_) => Some(true),
        }
    }
}

impl ConfigValidator for ExactlyOneOf {
    fn description(&self) -> String {
        format!("exactly one of {:?} must be configured", self.names)
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut present = Vec::new();
        for name in &self.names {
            match Self::is_set(config, name) {
                // unknown values are checked again at apply time
                None => return Vec::new(),
                Some(true) => present.push(name.as_str()),
                Some(false) => {}
            }
        }

        if present.len() == 1 {
            return Vec::new();
        }
        let detail = if present.is_empty() {
            format!("One of {:?} must be configured", self.names)
        } else {
            format!("Only one of {:?} may be configured, got {:?}", self.names, present)
        };
        vec![Diagnostic::error("Invalid attribute combination", detail)]
    }
}
