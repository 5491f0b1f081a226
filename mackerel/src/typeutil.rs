//! `FloatString`: monitor thresholds kept as the text the user wrote but
//! compared by numeric value.
//!
//! The empty string means "no threshold configured".

use thiserror::Error;
use tfplug::schema::{Validator, ValidatorRequest, ValidatorResponse};
use tfplug::types::{Diagnostic, Dynamic};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FloatStringError {
    #[error("{0:?} is not a valid float value")]
    InvalidFormat(String),

    #[error("failed to convert {0:?} to a float value")]
    Conversion(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloatString(String);

impl FloatString {
    /// Validates `text` before wrapping it
    pub fn new(text: impl Into<String>) -> Result<Self, FloatStringError> {
        let text = text.into();
        validate(&text)?;
        Ok(Self(text))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Renders an API threshold. `None` becomes the empty sentinel.
    pub fn from_f64(value: Option<f64>) -> Self {
        match value {
            Some(v) => Self(v.to_string()),
            None => Self::empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(None)` for the empty sentinel
    pub fn to_numeric(&self) -> Result<Option<f64>, FloatStringError> {
        if self.0.is_empty() {
            return Ok(None);
        }
        parse(&self.0)
            .map(Some)
            .ok_or_else(|| FloatStringError::Conversion(self.0.clone()))
    }

    /// Both sides must parse. Equal when both are empty or both hold the
    /// same number, whatever the spelling.
    pub fn semantic_equals(&self, other: &FloatString) -> Result<bool, FloatStringError> {
        Ok(self.to_numeric()? == other.to_numeric()?)
    }

    /// Keeps the stored spelling when the fresh value means the same number
    pub fn reconcile(self, fresh: FloatString) -> FloatString {
        match self.semantic_equals(&fresh) {
            Ok(true) => self,
            _ => fresh,
        }
    }
}

impl std::fmt::Display for FloatString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate(text: &str) -> Result<(), FloatStringError> {
    if text.is_empty() || parse(text).is_some() {
        Ok(())
    } else {
        Err(FloatStringError::InvalidFormat(text.to_string()))
    }
}

/// Base-10 floats only: decimal, leading or trailing dot, exponent.
/// `inf` and `NaN` spellings are rejected.
fn parse(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Schema validator for string attributes holding a `FloatString`
#[derive(Debug)]
pub struct FloatStringValidator;

impl FloatStringValidator {
    pub fn create() -> Box<dyn Validator> {
        Box::new(Self)
    }
}

impl Validator for FloatStringValidator {
    fn description(&self) -> String {
        "value must be empty or a base-10 float".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(text) = &request.config_value.value {
            if let Err(e) = validate(text) {
                diagnostics.push(
                    Diagnostic::error("Invalid float string", e.to_string())
                        .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tfplug::types::{AttributePath, DynamicValue};

    fn fs(text: &str) -> FloatString {
        FloatString::new(text).unwrap()
    }

    #[test]
    fn semantic_equality_is_numeric() {
        assert!(fs("0.1").semantic_equals(&fs("1e-1")).unwrap());
        assert!(fs("0.10").semantic_equals(&fs("0.1")).unwrap());
        assert!(fs(".1").semantic_equals(&fs("0.1")).unwrap());
        assert!(fs("").semantic_equals(&fs("")).unwrap());
        assert!(!fs("").semantic_equals(&fs("0")).unwrap());
        assert!(!fs("0.1").semantic_equals(&fs("0.2")).unwrap());
    }

    #[test]
    fn validation_accepts_empty_and_rejects_garbage() {
        assert!(validate("").is_ok());
        assert!(validate(".5").is_ok());
        assert!(validate("5.").is_ok());
        assert!(validate("-1.2e3").is_ok());
        assert_eq!(
            validate("abc"),
            Err(FloatStringError::InvalidFormat("abc".to_string()))
        );
        assert!(validate("1.2.3").is_err());
        assert!(validate("inf").is_err());
        assert!(validate("NaN").is_err());
        assert!(FloatString::new(" 1").is_err());
    }

    #[test]
    fn to_numeric_treats_empty_as_absent() {
        assert_eq!(FloatString::empty().to_numeric().unwrap(), None);
        assert_eq!(fs("-1.2e3").to_numeric().unwrap(), Some(-1200.0));
    }

    #[test]
    fn from_api_values() {
        assert_eq!(FloatString::from_f64(Some(20000.0)).as_str(), "20000");
        assert_eq!(FloatString::from_f64(Some(0.7)).as_str(), "0.7");
        assert!(FloatString::from_f64(None).is_empty());
    }

    #[test]
    fn reconcile_keeps_user_spelling() {
        assert_eq!(fs("1e-1").reconcile(fs("0.1")).as_str(), "1e-1");
        assert_eq!(fs("1e-1").reconcile(fs("0.2")).as_str(), "0.2");
        assert_eq!(fs("").reconcile(fs("0")).as_str(), "0");
    }

    #[test]
    fn validator_reports_attribute_path() {
        let path = AttributePath::new("host_metric").index(0).attribute("warning");
        let response = FloatStringValidator.validate(ValidatorRequest {
            config_value: DynamicValue::new(Dynamic::String("ten".to_string())),
            path: path.clone(),
        });
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].attribute, Some(path));

        let ok = FloatStringValidator.validate(ValidatorRequest {
            config_value: DynamicValue::new(Dynamic::String("10".to_string())),
            path: AttributePath::new("warning"),
        });
        assert!(ok.diagnostics.is_empty());
    }
}
