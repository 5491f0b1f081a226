//! Compiled patterns shared by the resource schemas
//!
//! Built once when the provider is created and handed to every schema
//! builder that needs them.

use regex::Regex;
use tfplug::schema::Validator;
use tfplug::validator::{StringLengthValidator, StringPatternValidator};

#[derive(Debug, Clone)]
pub struct Validators {
    name: Regex,
    namespace: Regex,
    role_arn: Regex,
    http_url: Regex,
}

impl Validators {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            name: Regex::new(r"^[a-zA-Z0-9_-]+$")?,
            namespace: Regex::new(r"^[a-zA-Z0-9_-]+$")?,
            role_arn: Regex::new(r"^arn:aws:iam::\d{12}:role/.+$")?,
            http_url: Regex::new(r"^https?://\S+$")?,
        })
    }

    /// Service and role names: 2 to 63 letters, digits, `-` or `_`
    pub fn name(&self) -> Vec<Box<dyn Validator>> {
        vec![
            StringLengthValidator::between(2, 63),
            StringPatternValidator::create(
                self.name.clone(),
                "must include only alphabets, numbers, hyphen and underscore",
            ),
        ]
    }

    pub fn namespace(&self) -> Vec<Box<dyn Validator>> {
        vec![
            StringLengthValidator::between(2, 128),
            StringPatternValidator::create(
                self.namespace.clone(),
                "must include only alphabets, numbers, hyphen and underscore",
            ),
        ]
    }

    pub fn role_arn(&self) -> Box<dyn Validator> {
        StringPatternValidator::create(self.role_arn.clone(), "must be an IAM role ARN")
    }

    pub fn http_url(&self) -> Box<dyn Validator> {
        StringPatternValidator::create(self.http_url.clone(), "must be an http or https URL")
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tfplug::schema::ValidatorRequest;
    use tfplug::types::{AttributePath, Dynamic, DynamicValue};

    fn errors(validators: &[Box<dyn Validator>], value: &str) -> usize {
        validators
            .iter()
            .map(|v| {
                v.validate(ValidatorRequest {
                    config_value: DynamicValue::new(Dynamic::String(value.to_string())),
                    path: AttributePath::new("name"),
                })
                .diagnostics
                .len()
            })
            .sum()
    }

    #[test]
    fn service_names() {
        let v = Validators::new().unwrap();
        assert_eq!(errors(&v.name(), "my-service_01"), 0);
        assert_eq!(errors(&v.name(), "x"), 1);
        assert_eq!(errors(&v.name(), "with space"), 1);
    }

    #[test]
    fn role_arns() {
        let v = Validators::new().unwrap();
        let arn = [v.role_arn()];
        assert_eq!(errors(&arn, "arn:aws:iam::123456789012:role/mackerel"), 0);
        assert_eq!(errors(&arn, "arn:aws:iam::123:role/x"), 1);
    }
}
