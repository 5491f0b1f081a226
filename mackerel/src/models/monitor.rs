//! Monitor model
//!
//! A monitor has a common header and exactly one type block. Thresholds
//! are `FloatString`s so that `"0.1"` and `"1e-1"` do not show a diff.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tfplug::defaults::StaticDefault;
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, Schema,
    SchemaBuilder,
};
use tfplug::types::DynamicValue;
use tfplug::validator::{ExactlyOneOf, NumberRangeValidator, OneOfValidator};

use super::{
    attr, check_variants, choice_attr, id_attribute, into_lookup_schema, memo_attribute,
    non_empty, optional_attr, required, required_attr, required_in, set_block, set_threshold,
    threshold_from_api, threshold_to_api, DataSourceModel, Fields, Model, ModelError, Result,
};
use crate::api::monitors::{
    AnomalyDetectionMonitor, ConnectivityMonitor, ExpressionMonitor, ExternalMonitor,
    HeaderField, HostMetricMonitor, Monitor, MonitorKind, QueryMonitor, ServiceMetricMonitor,
};
use crate::api::Client;
use crate::reconcile::{merge_block, merge_collection, merge_threshold, Reconcile};
use crate::scope::normalize_scopes;
use crate::typeutil::{FloatString, FloatStringValidator};
use crate::validators::Validators;

const VARIANTS: &[&str] = &[
    "host_metric",
    "connectivity",
    "service_metric",
    "external",
    "expression",
    "anomaly_detection",
    "query",
];

const OPERATORS: &[&str] = &[">", "<"];
const SENSITIVITIES: &[&str] = &["insensitive", "normal", "sensitive"];
const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];
const ALERT_STATUSES: &[&str] = &["CRITICAL", "WARNING"];

fn threshold_attr(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .validator(FloatStringValidator::create())
        .build()
}

fn operator_attr() -> Attribute {
    AttributeBuilder::new("operator", AttributeType::String)
        .description("Alert when the value is greater (>) or less (<) than the thresholds")
        .required()
        .validator(OneOfValidator::create(OPERATORS.iter().copied()))
        .build()
}

fn scopes_attr(name: &str, description: &str) -> Attribute {
    optional_attr(name, AttributeType::set_of_strings(), description)
}

fn positive_number(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Number)
        .description(description)
        .optional()
        .validator(NumberRangeValidator::at_least(1.0))
        .build()
}

fn scopes_from_api(scopes: &[String]) -> Option<Vec<String>> {
    Some(normalize_scopes(scopes))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostMetric {
    pub metric: Option<String>,
    pub operator: Option<String>,
    pub warning: Option<FloatString>,
    pub critical: Option<FloatString>,
    pub duration: Option<i64>,
    pub max_check_attempts: Option<i64>,
    pub scopes: Option<Vec<String>>,
    pub exclude_scopes: Option<Vec<String>>,
}

impl HostMetric {
    const BLOCK: &'static str = "host_metric";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Host metric monitoring")
            .single()
            .attribute(required_attr("metric", AttributeType::String, "The metric name"))
            .attribute(operator_attr())
            .attribute(threshold_attr("warning", "Warning threshold"))
            .attribute(threshold_attr("critical", "Critical threshold"))
            .attribute(
                AttributeBuilder::new("duration", AttributeType::Number)
                    .description("Number of minutes the average is taken over")
                    .required()
                    .validator(NumberRangeValidator::between(1.0, 10.0))
                    .build(),
            )
            .attribute(positive_number(
                "max_check_attempts",
                "Number of consecutive violations before alerting",
            ))
            .attribute(scopes_attr("scopes", "Services and roles to monitor"))
            .attribute(scopes_attr("exclude_scopes", "Services and roles to exclude"))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            metric: f.string("metric")?,
            operator: f.choice("operator", OPERATORS)?,
            warning: f.threshold("warning")?,
            critical: f.threshold("critical")?,
            duration: f.i64("duration")?,
            max_check_attempts: f.i64("max_check_attempts")?,
            scopes: f.strings("scopes")?,
            exclude_scopes: f.strings("exclude_scopes")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("metric"), self.metric.clone())?;
        v.set_string_opt(&attr("operator"), self.operator.clone())?;
        set_threshold(v, "warning", &self.warning)?;
        set_threshold(v, "critical", &self.critical)?;
        v.set_i64_opt(&attr("duration"), self.duration)?;
        v.set_i64_opt(&attr("max_check_attempts"), self.max_check_attempts)?;
        v.set_string_list_opt(&attr("scopes"), self.scopes.clone())?;
        v.set_string_list_opt(&attr("exclude_scopes"), self.exclude_scopes.clone())?;
        Ok(())
    }

    fn from_api(m: HostMetricMonitor) -> Self {
        Self {
            metric: Some(m.metric),
            operator: Some(m.operator),
            warning: threshold_from_api(m.warning),
            critical: threshold_from_api(m.critical),
            duration: Some(m.duration),
            max_check_attempts: m.max_check_attempts,
            scopes: scopes_from_api(&m.scopes),
            exclude_scopes: scopes_from_api(&m.exclude_scopes),
        }
    }

    fn to_api(&self) -> Result<HostMetricMonitor> {
        let at = |name: &str| attr(Self::BLOCK).index(0).attribute(name);
        Ok(HostMetricMonitor {
            metric: required_in(&self.metric, Self::BLOCK, "metric")?,
            operator: required_in(&self.operator, Self::BLOCK, "operator")?,
            warning: threshold_to_api(&self.warning, at("warning"))?,
            critical: threshold_to_api(&self.critical, at("critical"))?,
            duration: required_in(&self.duration, Self::BLOCK, "duration")?,
            max_check_attempts: self.max_check_attempts,
            scopes: self.scopes.clone().unwrap_or_default(),
            exclude_scopes: self.exclude_scopes.clone().unwrap_or_default(),
        })
    }
}

impl Reconcile for HostMetric {
    fn merge(self, fresh: Self) -> Self {
        Self {
            warning: merge_threshold(self.warning, fresh.warning),
            critical: merge_threshold(self.critical, fresh.critical),
            scopes: merge_collection(self.scopes, fresh.scopes),
            exclude_scopes: merge_collection(self.exclude_scopes, fresh.exclude_scopes),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connectivity {
    pub scopes: Option<Vec<String>>,
    pub exclude_scopes: Option<Vec<String>>,
    pub alert_status_on_gone: Option<String>,
}

impl Connectivity {
    const BLOCK: &'static str = "connectivity";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Host connectivity monitoring")
            .single()
            .attribute(scopes_attr("scopes", "Services and roles to monitor"))
            .attribute(scopes_attr("exclude_scopes", "Services and roles to exclude"))
            .attribute(choice_attr(
                "alert_status_on_gone",
                ALERT_STATUSES,
                "Alert status raised when a host stops reporting",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            scopes: f.strings("scopes")?,
            exclude_scopes: f.strings("exclude_scopes")?,
            alert_status_on_gone: f.choice("alert_status_on_gone", ALERT_STATUSES)?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_list_opt(&attr("scopes"), self.scopes.clone())?;
        v.set_string_list_opt(&attr("exclude_scopes"), self.exclude_scopes.clone())?;
        v.set_string_opt(&attr("alert_status_on_gone"), self.alert_status_on_gone.clone())?;
        Ok(())
    }

    fn from_api(m: ConnectivityMonitor) -> Self {
        Self {
            scopes: scopes_from_api(&m.scopes),
            exclude_scopes: scopes_from_api(&m.exclude_scopes),
            alert_status_on_gone: m.alert_status_on_gone,
        }
    }

    fn to_api(&self) -> ConnectivityMonitor {
        ConnectivityMonitor {
            scopes: self.scopes.clone().unwrap_or_default(),
            exclude_scopes: self.exclude_scopes.clone().unwrap_or_default(),
            alert_status_on_gone: self.alert_status_on_gone.clone(),
        }
    }
}

impl Reconcile for Connectivity {
    fn merge(self, fresh: Self) -> Self {
        Self {
            scopes: merge_collection(self.scopes, fresh.scopes),
            exclude_scopes: merge_collection(self.exclude_scopes, fresh.exclude_scopes),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceMetric {
    pub service: Option<String>,
    pub metric: Option<String>,
    pub operator: Option<String>,
    pub warning: Option<FloatString>,
    pub critical: Option<FloatString>,
    pub duration: Option<i64>,
    pub max_check_attempts: Option<i64>,
    pub missing_duration_warning: Option<i64>,
    pub missing_duration_critical: Option<i64>,
}

impl ServiceMetric {
    const BLOCK: &'static str = "service_metric";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Service metric monitoring")
            .single()
            .attribute(required_attr("service", AttributeType::String, "The service name"))
            .attribute(required_attr("metric", AttributeType::String, "The metric name"))
            .attribute(operator_attr())
            .attribute(threshold_attr("warning", "Warning threshold"))
            .attribute(threshold_attr("critical", "Critical threshold"))
            .attribute(
                AttributeBuilder::new("duration", AttributeType::Number)
                    .description("Number of data points the average is taken over")
                    .required()
                    .validator(NumberRangeValidator::between(1.0, 10.0))
                    .build(),
            )
            .attribute(positive_number(
                "max_check_attempts",
                "Number of consecutive violations before alerting",
            ))
            .attribute(optional_attr(
                "missing_duration_warning",
                AttributeType::Number,
                "Minutes without data before a warning",
            ))
            .attribute(optional_attr(
                "missing_duration_critical",
                AttributeType::Number,
                "Minutes without data before a critical alert",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            service: f.string("service")?,
            metric: f.string("metric")?,
            operator: f.choice("operator", OPERATORS)?,
            warning: f.threshold("warning")?,
            critical: f.threshold("critical")?,
            duration: f.i64("duration")?,
            max_check_attempts: f.i64("max_check_attempts")?,
            missing_duration_warning: f.i64("missing_duration_warning")?,
            missing_duration_critical: f.i64("missing_duration_critical")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("service"), self.service.clone())?;
        v.set_string_opt(&attr("metric"), self.metric.clone())?;
        v.set_string_opt(&attr("operator"), self.operator.clone())?;
        set_threshold(v, "warning", &self.warning)?;
        set_threshold(v, "critical", &self.critical)?;
        v.set_i64_opt(&attr("duration"), self.duration)?;
        v.set_i64_opt(&attr("max_check_attempts"), self.max_check_attempts)?;
        v.set_i64_opt(&attr("missing_duration_warning"), self.missing_duration_warning)?;
        v.set_i64_opt(&attr("missing_duration_critical"), self.missing_duration_critical)?;
        Ok(())
    }

    fn from_api(m: ServiceMetricMonitor) -> Self {
        Self {
            service: Some(m.service),
            metric: Some(m.metric),
            operator: Some(m.operator),
            warning: threshold_from_api(m.warning),
            critical: threshold_from_api(m.critical),
            duration: Some(m.duration),
            max_check_attempts: m.max_check_attempts,
            missing_duration_warning: m.missing_duration_warning,
            missing_duration_critical: m.missing_duration_critical,
        }
    }

    fn to_api(&self) -> Result<ServiceMetricMonitor> {
        let at = |name: &str| attr(Self::BLOCK).index(0).attribute(name);
        Ok(ServiceMetricMonitor {
            service: required_in(&self.service, Self::BLOCK, "service")?,
            metric: required_in(&self.metric, Self::BLOCK, "metric")?,
            operator: required_in(&self.operator, Self::BLOCK, "operator")?,
            warning: threshold_to_api(&self.warning, at("warning"))?,
            critical: threshold_to_api(&self.critical, at("critical"))?,
            duration: required_in(&self.duration, Self::BLOCK, "duration")?,
            max_check_attempts: self.max_check_attempts,
            missing_duration_warning: self.missing_duration_warning,
            missing_duration_critical: self.missing_duration_critical,
        })
    }
}

impl Reconcile for ServiceMetric {
    fn merge(self, fresh: Self) -> Self {
        Self {
            warning: merge_threshold(self.warning, fresh.warning),
            critical: merge_threshold(self.critical, fresh.critical),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct External {
    pub method: Option<String>,
    pub url: Option<String>,
    pub request_body: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub service: Option<String>,
    pub response_time_warning: Option<FloatString>,
    pub response_time_critical: Option<FloatString>,
    pub response_time_duration: Option<i64>,
    pub contains_string: Option<String>,
    pub max_check_attempts: Option<i64>,
    pub certification_expiration_warning: Option<i64>,
    pub certification_expiration_critical: Option<i64>,
    pub skip_certificate_verification: Option<bool>,
    pub follow_redirect: Option<bool>,
    pub expected_status_code: Option<i64>,
}

impl External {
    const BLOCK: &'static str = "external";

    fn schema(validators: &Validators) -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("External HTTP monitoring")
            .single()
            .attribute(choice_attr("method", HTTP_METHODS, "HTTP request method"))
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("The URL to monitor")
                    .required()
                    .validator(validators.http_url())
                    .build(),
            )
            .attribute(optional_attr("request_body", AttributeType::String, "HTTP request body"))
            .attribute(optional_attr(
                "headers",
                AttributeType::map_of_strings(),
                "HTTP request headers",
            ))
            .attribute(optional_attr(
                "service",
                AttributeType::String,
                "Service the response time metric is posted to",
            ))
            .attribute(threshold_attr(
                "response_time_warning",
                "Response time warning threshold in milliseconds",
            ))
            .attribute(threshold_attr(
                "response_time_critical",
                "Response time critical threshold in milliseconds",
            ))
            .attribute(optional_attr(
                "response_time_duration",
                AttributeType::Number,
                "Minutes the response time average is taken over",
            ))
            .attribute(optional_attr(
                "contains_string",
                AttributeType::String,
                "String the response body must contain",
            ))
            .attribute(positive_number(
                "max_check_attempts",
                "Number of consecutive violations before alerting",
            ))
            .attribute(optional_attr(
                "certification_expiration_warning",
                AttributeType::Number,
                "Days before certificate expiry to warn",
            ))
            .attribute(optional_attr(
                "certification_expiration_critical",
                AttributeType::Number,
                "Days before certificate expiry to alert",
            ))
            .attribute(optional_attr(
                "skip_certificate_verification",
                AttributeType::Bool,
                "Skip TLS certificate verification",
            ))
            .attribute(optional_attr(
                "follow_redirect",
                AttributeType::Bool,
                "Follow HTTP redirects",
            ))
            .attribute(optional_attr(
                "expected_status_code",
                AttributeType::Number,
                "Expected HTTP status code",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            method: f.choice("method", HTTP_METHODS)?,
            url: f.string("url")?,
            request_body: f.string("request_body")?,
            headers: f.string_map("headers")?,
            service: f.string("service")?,
            response_time_warning: f.threshold("response_time_warning")?,
            response_time_critical: f.threshold("response_time_critical")?,
            response_time_duration: f.i64("response_time_duration")?,
            contains_string: f.string("contains_string")?,
            max_check_attempts: f.i64("max_check_attempts")?,
            certification_expiration_warning: f.i64("certification_expiration_warning")?,
            certification_expiration_critical: f.i64("certification_expiration_critical")?,
            skip_certificate_verification: f.bool("skip_certificate_verification")?,
            follow_redirect: f.bool("follow_redirect")?,
            expected_status_code: f.i64("expected_status_code")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("method"), self.method.clone())?;
        v.set_string_opt(&attr("url"), self.url.clone())?;
        v.set_string_opt(&attr("request_body"), self.request_body.clone())?;
        v.set_string_map_opt(&attr("headers"), self.headers.clone())?;
        v.set_string_opt(&attr("service"), self.service.clone())?;
        set_threshold(v, "response_time_warning", &self.response_time_warning)?;
        set_threshold(v, "response_time_critical", &self.response_time_critical)?;
        v.set_i64_opt(&attr("response_time_duration"), self.response_time_duration)?;
        v.set_string_opt(&attr("contains_string"), self.contains_string.clone())?;
        v.set_i64_opt(&attr("max_check_attempts"), self.max_check_attempts)?;
        v.set_i64_opt(
            &attr("certification_expiration_warning"),
            self.certification_expiration_warning,
        )?;
        v.set_i64_opt(
            &attr("certification_expiration_critical"),
            self.certification_expiration_critical,
        )?;
        v.set_bool_opt(
            &attr("skip_certificate_verification"),
            self.skip_certificate_verification,
        )?;
        v.set_bool_opt(&attr("follow_redirect"), self.follow_redirect)?;
        v.set_i64_opt(&attr("expected_status_code"), self.expected_status_code)?;
        Ok(())
    }

    fn from_api(m: ExternalMonitor) -> Self {
        let headers = m
            .headers
            .into_iter()
            .map(|h| (h.name, h.value))
            .collect::<BTreeMap<_, _>>();
        Self {
            method: Some(m.method),
            url: Some(m.url),
            request_body: non_empty(m.request_body),
            headers: Some(headers),
            service: non_empty(m.service),
            response_time_warning: threshold_from_api(m.response_time_warning),
            response_time_critical: threshold_from_api(m.response_time_critical),
            response_time_duration: m.response_time_duration,
            contains_string: non_empty(m.contains_string),
            max_check_attempts: m.max_check_attempts,
            certification_expiration_warning: m.certification_expiration_warning,
            certification_expiration_critical: m.certification_expiration_critical,
            skip_certificate_verification: Some(m.skip_certificate_verification),
            follow_redirect: Some(m.follow_redirect),
            expected_status_code: m.expected_status_code,
        }
    }

    fn to_api(&self) -> Result<ExternalMonitor> {
        let at = |name: &str| attr(Self::BLOCK).index(0).attribute(name);
        Ok(ExternalMonitor {
            method: self.method.clone().unwrap_or_else(|| "GET".to_string()),
            url: required_in(&self.url, Self::BLOCK, "url")?,
            request_body: self.request_body.clone().unwrap_or_default(),
            headers: self
                .headers
                .iter()
                .flatten()
                .map(|(name, value)| HeaderField {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect(),
            service: self.service.clone().unwrap_or_default(),
            response_time_warning: threshold_to_api(
                &self.response_time_warning,
                at("response_time_warning"),
            )?,
            response_time_critical: threshold_to_api(
                &self.response_time_critical,
                at("response_time_critical"),
            )?,
            response_time_duration: self.response_time_duration,
            contains_string: self.contains_string.clone().unwrap_or_default(),
            max_check_attempts: self.max_check_attempts,
            certification_expiration_warning: self.certification_expiration_warning,
            certification_expiration_critical: self.certification_expiration_critical,
            skip_certificate_verification: self.skip_certificate_verification.unwrap_or(false),
            follow_redirect: self.follow_redirect.unwrap_or(false),
            expected_status_code: self.expected_status_code,
        })
    }
}

impl Reconcile for External {
    fn merge(self, fresh: Self) -> Self {
        Self {
            headers: merge_collection(self.headers, fresh.headers),
            response_time_warning: merge_threshold(
                self.response_time_warning,
                fresh.response_time_warning,
            ),
            response_time_critical: merge_threshold(
                self.response_time_critical,
                fresh.response_time_critical,
            ),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub expression: Option<String>,
    pub operator: Option<String>,
    pub warning: Option<FloatString>,
    pub critical: Option<FloatString>,
    pub evaluate_backward_minutes: Option<i64>,
}

impl Expression {
    const BLOCK: &'static str = "expression";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Expression monitoring")
            .single()
            .attribute(required_attr(
                "expression",
                AttributeType::String,
                "The graph expression to evaluate",
            ))
            .attribute(operator_attr())
            .attribute(threshold_attr("warning", "Warning threshold"))
            .attribute(threshold_attr("critical", "Critical threshold"))
            .attribute(optional_attr(
                "evaluate_backward_minutes",
                AttributeType::Number,
                "Minutes of data evaluated each time",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            expression: f.string("expression")?,
            operator: f.choice("operator", OPERATORS)?,
            warning: f.threshold("warning")?,
            critical: f.threshold("critical")?,
            evaluate_backward_minutes: f.i64("evaluate_backward_minutes")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("expression"), self.expression.clone())?;
        v.set_string_opt(&attr("operator"), self.operator.clone())?;
        set_threshold(v, "warning", &self.warning)?;
        set_threshold(v, "critical", &self.critical)?;
        v.set_i64_opt(&attr("evaluate_backward_minutes"), self.evaluate_backward_minutes)?;
        Ok(())
    }

    fn from_api(m: ExpressionMonitor) -> Self {
        Self {
            expression: Some(m.expression),
            operator: Some(m.operator),
            warning: threshold_from_api(m.warning),
            critical: threshold_from_api(m.critical),
            evaluate_backward_minutes: m.evaluate_backward_minutes,
        }
    }

    fn to_api(&self) -> Result<ExpressionMonitor> {
        let at = |name: &str| attr(Self::BLOCK).index(0).attribute(name);
        Ok(ExpressionMonitor {
            expression: required_in(&self.expression, Self::BLOCK, "expression")?,
            operator: required_in(&self.operator, Self::BLOCK, "operator")?,
            warning: threshold_to_api(&self.warning, at("warning"))?,
            critical: threshold_to_api(&self.critical, at("critical"))?,
            evaluate_backward_minutes: self.evaluate_backward_minutes,
        })
    }
}

impl Reconcile for Expression {
    fn merge(self, fresh: Self) -> Self {
        Self {
            warning: merge_threshold(self.warning, fresh.warning),
            critical: merge_threshold(self.critical, fresh.critical),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnomalyDetection {
    pub scopes: Option<Vec<String>>,
    pub warning_sensitivity: Option<String>,
    pub critical_sensitivity: Option<String>,
    pub max_check_attempts: Option<i64>,
    pub training_period_from: Option<i64>,
}

impl AnomalyDetection {
    const BLOCK: &'static str = "anomaly_detection";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Anomaly detection for roles")
            .single()
            .attribute(required_attr(
                "scopes",
                AttributeType::set_of_strings(),
                "Roles to monitor",
            ))
            .attribute(choice_attr(
                "warning_sensitivity",
                SENSITIVITIES,
                "Sensitivity for warnings",
            ))
            .attribute(choice_attr(
                "critical_sensitivity",
                SENSITIVITIES,
                "Sensitivity for critical alerts",
            ))
            .attribute(positive_number(
                "max_check_attempts",
                "Number of consecutive violations before alerting",
            ))
            .attribute(optional_attr(
                "training_period_from",
                AttributeType::Number,
                "Epoch seconds the training period starts at",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            scopes: f.strings("scopes")?,
            warning_sensitivity: f.choice("warning_sensitivity", SENSITIVITIES)?,
            critical_sensitivity: f.choice("critical_sensitivity", SENSITIVITIES)?,
            max_check_attempts: f.i64("max_check_attempts")?,
            training_period_from: f.i64("training_period_from")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_list_opt(&attr("scopes"), self.scopes.clone())?;
        v.set_string_opt(&attr("warning_sensitivity"), self.warning_sensitivity.clone())?;
        v.set_string_opt(&attr("critical_sensitivity"), self.critical_sensitivity.clone())?;
        v.set_i64_opt(&attr("max_check_attempts"), self.max_check_attempts)?;
        v.set_i64_opt(&attr("training_period_from"), self.training_period_from)?;
        Ok(())
    }

    fn from_api(m: AnomalyDetectionMonitor) -> Self {
        Self {
            scopes: scopes_from_api(&m.scopes),
            warning_sensitivity: non_empty(m.warning_sensitivity),
            critical_sensitivity: non_empty(m.critical_sensitivity),
            max_check_attempts: m.max_check_attempts,
            training_period_from: m.training_period_from,
        }
    }

    fn to_api(&self) -> AnomalyDetectionMonitor {
        AnomalyDetectionMonitor {
            scopes: self.scopes.clone().unwrap_or_default(),
            warning_sensitivity: self.warning_sensitivity.clone().unwrap_or_default(),
            critical_sensitivity: self.critical_sensitivity.clone().unwrap_or_default(),
            max_check_attempts: self.max_check_attempts,
            training_period_from: self.training_period_from,
        }
    }
}

impl Reconcile for AnomalyDetection {
    fn merge(self, fresh: Self) -> Self {
        Self {
            scopes: merge_collection(self.scopes, fresh.scopes),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub query: Option<String>,
    pub legend: Option<String>,
    pub operator: Option<String>,
    pub warning: Option<FloatString>,
    pub critical: Option<FloatString>,
    pub evaluate_backward_minutes: Option<i64>,
}

impl Query {
    const BLOCK: &'static str = "query";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("PromQL-style query monitoring")
            .single()
            .attribute(required_attr("query", AttributeType::String, "The query to evaluate"))
            .attribute(optional_attr("legend", AttributeType::String, "Legend of the query"))
            .attribute(operator_attr())
            .attribute(threshold_attr("warning", "Warning threshold"))
            .attribute(threshold_attr("critical", "Critical threshold"))
            .attribute(optional_attr(
                "evaluate_backward_minutes",
                AttributeType::Number,
                "Minutes of data evaluated each time",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            query: f.string("query")?,
            legend: f.string("legend")?,
            operator: f.choice("operator", OPERATORS)?,
            warning: f.threshold("warning")?,
            critical: f.threshold("critical")?,
            evaluate_backward_minutes: f.i64("evaluate_backward_minutes")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("query"), self.query.clone())?;
        v.set_string_opt(&attr("legend"), self.legend.clone())?;
        v.set_string_opt(&attr("operator"), self.operator.clone())?;
        set_threshold(v, "warning", &self.warning)?;
        set_threshold(v, "critical", &self.critical)?;
        v.set_i64_opt(&attr("evaluate_backward_minutes"), self.evaluate_backward_minutes)?;
        Ok(())
    }

    fn from_api(m: QueryMonitor) -> Self {
        Self {
            query: Some(m.query),
            legend: non_empty(m.legend),
            operator: Some(m.operator),
            warning: threshold_from_api(m.warning),
            critical: threshold_from_api(m.critical),
            evaluate_backward_minutes: m.evaluate_backward_minutes,
        }
    }

    fn to_api(&self) -> Result<QueryMonitor> {
        let at = |name: &str| attr(Self::BLOCK).index(0).attribute(name);
        Ok(QueryMonitor {
            query: required_in(&self.query, Self::BLOCK, "query")?,
            legend: self.legend.clone().unwrap_or_default(),
            operator: required_in(&self.operator, Self::BLOCK, "operator")?,
            warning: threshold_to_api(&self.warning, at("warning"))?,
            critical: threshold_to_api(&self.critical, at("critical"))?,
            evaluate_backward_minutes: self.evaluate_backward_minutes,
        })
    }
}

impl Reconcile for Query {
    fn merge(self, fresh: Self) -> Self {
        Self {
            warning: merge_threshold(self.warning, fresh.warning),
            critical: merge_threshold(self.critical, fresh.critical),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub is_mute: Option<bool>,
    pub notification_interval: Option<i64>,
    pub host_metric: Option<HostMetric>,
    pub connectivity: Option<Connectivity>,
    pub service_metric: Option<ServiceMetric>,
    pub external: Option<External>,
    pub expression: Option<Expression>,
    pub anomaly_detection: Option<AnomalyDetection>,
    pub query: Option<Query>,
}

impl MonitorModel {
    pub fn from_api(monitor: Monitor) -> Result<Self> {
        let mut model = Self {
            id: Some(monitor.id),
            name: Some(monitor.name),
            memo: Some(monitor.memo),
            is_mute: Some(monitor.is_mute),
            notification_interval: monitor.notification_interval,
            ..Self::default()
        };
        match monitor.kind {
            MonitorKind::HostMetric(m) => model.host_metric = Some(HostMetric::from_api(m)),
            MonitorKind::Connectivity(m) => model.connectivity = Some(Connectivity::from_api(m)),
            MonitorKind::ServiceMetric(m) => {
                model.service_metric = Some(ServiceMetric::from_api(m))
            }
            MonitorKind::External(m) => model.external = Some(External::from_api(m)),
            MonitorKind::Expression(m) => model.expression = Some(Expression::from_api(m)),
            MonitorKind::AnomalyDetection(m) => {
                model.anomaly_detection = Some(AnomalyDetection::from_api(m))
            }
            MonitorKind::Query(m) => model.query = Some(Query::from_api(m)),
            other => {
                return Err(ModelError::Unsupported {
                    kind: "monitor",
                    type_name: other.type_name().to_string(),
                })
            }
        }
        Ok(model)
    }

    pub fn to_api(&self) -> Result<Monitor> {
        check_variants(
            VARIANTS,
            &[
                self.host_metric.is_some(),
                self.connectivity.is_some(),
                self.service_metric.is_some(),
                self.external.is_some(),
                self.expression.is_some(),
                self.anomaly_detection.is_some(),
                self.query.is_some(),
            ],
        )?;

        let kind = if let Some(m) = &self.host_metric {
            MonitorKind::HostMetric(m.to_api()?)
        } else if let Some(m) = &self.connectivity {
            MonitorKind::Connectivity(m.to_api())
        } else if let Some(m) = &self.service_metric {
            MonitorKind::ServiceMetric(m.to_api()?)
        } else if let Some(m) = &self.external {
            MonitorKind::External(m.to_api()?)
        } else if let Some(m) = &self.expression {
            MonitorKind::Expression(m.to_api()?)
        } else if let Some(m) = &self.anomaly_detection {
            MonitorKind::AnomalyDetection(m.to_api())
        } else if let Some(m) = &self.query {
            MonitorKind::Query(m.to_api()?)
        } else {
            return Err(ModelError::VariantCount {
                expected: VARIANTS,
                count: 0,
            });
        };

        Ok(Monitor {
            id: self.id.clone().unwrap_or_default(),
            name: required(&self.name, "name")?,
            memo: self.memo.clone().unwrap_or_default(),
            is_mute: self.is_mute.unwrap_or(false),
            notification_interval: self.notification_interval,
            kind,
        })
    }
}

impl Reconcile for MonitorModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            host_metric: merge_block(self.host_metric, fresh.host_metric),
            connectivity: merge_block(self.connectivity, fresh.connectivity),
            service_metric: merge_block(self.service_metric, fresh.service_metric),
            external: merge_block(self.external, fresh.external),
            expression: merge_block(self.expression, fresh.expression),
            anomaly_detection: merge_block(self.anomaly_detection, fresh.anomaly_detection),
            query: merge_block(self.query, fresh.query),
            ..fresh
        }
    }
}

#[async_trait]
impl Model for MonitorModel {
    const TYPE_NAME: &'static str = "mackerel_monitor";

    fn resource_schema(validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel monitor")
            .attribute(id_attribute("The monitor ID"))
            .attribute(required_attr("name", AttributeType::String, "The monitor name"))
            .attribute(memo_attribute())
            .attribute(
                AttributeBuilder::new("is_mute", AttributeType::Bool)
                    .description("Whether notifications are muted")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("notification_interval", AttributeType::Number)
                    .description("Minutes between repeated notifications; unset disables them")
                    .optional()
                    .validator(NumberRangeValidator::at_least(10.0))
                    .build(),
            )
            .block(HostMetric::schema())
            .block(Connectivity::schema())
            .block(ServiceMetric::schema())
            .block(External::schema(validators))
            .block(Expression::schema())
            .block(AnomalyDetection::schema())
            .block(Query::schema())
            .config_validator(ExactlyOneOf::create(VARIANTS))
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        Ok(Self {
            id: f.string("id")?,
            name: f.string("name")?,
            memo: f.string("memo")?,
            is_mute: f.bool("is_mute")?,
            notification_interval: f.i64("notification_interval")?,
            host_metric: f.block(HostMetric::BLOCK, HostMetric::read)?,
            connectivity: f.block(Connectivity::BLOCK, Connectivity::read)?,
            service_metric: f.block(ServiceMetric::BLOCK, ServiceMetric::read)?,
            external: f.block(External::BLOCK, External::read)?,
            expression: f.block(Expression::BLOCK, Expression::read)?,
            anomaly_detection: f.block(AnomalyDetection::BLOCK, AnomalyDetection::read)?,
            query: f.block(Query::BLOCK, Query::read)?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("name"), self.name.clone())?;
        v.set_string_opt(&attr("memo"), self.memo.clone())?;
        v.set_bool_opt(&attr("is_mute"), self.is_mute)?;
        v.set_i64_opt(&attr("notification_interval"), self.notification_interval)?;
        set_block(&mut v, HostMetric::BLOCK, &self.host_metric, HostMetric::write)?;
        set_block(&mut v, Connectivity::BLOCK, &self.connectivity, Connectivity::write)?;
        set_block(&mut v, ServiceMetric::BLOCK, &self.service_metric, ServiceMetric::write)?;
        set_block(&mut v, External::BLOCK, &self.external, External::write)?;
        set_block(&mut v, Expression::BLOCK, &self.expression, Expression::write)?;
        set_block(
            &mut v,
            AnomalyDetection::BLOCK,
            &self.anomaly_detection,
            AnomalyDetection::write,
        )?;
        set_block(&mut v, Query::BLOCK, &self.query, Query::write)?;
        Ok(v)
    }

    /// Switching the monitor type cannot be done in place
    fn variant_blocks() -> &'static [&'static str] {
        VARIANTS
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.monitors().create(&self.to_api()?).await?;
        tracing::info!("Created monitor {} ({})", created.name, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let monitor = client.monitors().get(&required(&self.id, "id")?).await?;
        Self::from_api(monitor)
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.monitors().update(&id, &self.to_api()?).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        client.monitors().delete(&required(&self.id, "id")?).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for MonitorModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a Mackerel monitor by ID",
        )
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Self::from_api(client.monitors().get(&id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn value(json: &str) -> DynamicValue {
        DynamicValue::decode_json(json.as_bytes()).unwrap()
    }

    fn host_metric_config() -> DynamicValue {
        value(
            r#"{
                "id": "__unknown__",
                "name": "cpu",
                "memo": "",
                "is_mute": false,
                "notification_interval": null,
                "host_metric": [{
                    "metric": "cpu%",
                    "operator": ">",
                    "warning": "1e1",
                    "critical": null,
                    "duration": 3,
                    "max_check_attempts": null,
                    "scopes": ["web: app"],
                    "exclude_scopes": null
                }],
                "connectivity": [],
                "service_metric": [],
                "external": [],
                "expression": [],
                "anomaly_detection": [],
                "query": []
            }"#,
        )
    }

    #[test]
    fn config_to_api_payload() {
        let model = MonitorModel::from_value(&host_metric_config()).unwrap();
        let monitor = model.to_api().unwrap();

        assert_eq!(monitor.id, "");
        match monitor.kind {
            MonitorKind::HostMetric(m) => {
                assert_eq!(m.warning, Some(10.0));
                assert_eq!(m.critical, None);
                assert!(m.exclude_scopes.is_empty());
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn refresh_keeps_threshold_spelling_and_normalizes_scopes() {
        let stored = MonitorModel {
            id: Some("abc".to_string()),
            ..MonitorModel::from_value(&host_metric_config()).unwrap()
        };
        let fresh = MonitorModel::from_api(Monitor {
            id: "abc".to_string(),
            ..stored.to_api().unwrap()
        })
        .unwrap();

        let merged = stored.merge(fresh);
        let host = merged.host_metric.unwrap();
        assert_eq!(host.warning.unwrap().as_str(), "1e1");
        assert_eq!(host.critical, None);
        assert_eq!(host.scopes, Some(vec!["web:app".to_string()]));
        assert_eq!(host.exclude_scopes, None);
    }

    #[test]
    fn invalid_threshold_points_at_attribute() {
        let mut config = host_metric_config();
        config
            .set_string(
                &attr("host_metric").index(0).attribute("warning"),
                "high".to_string(),
            )
            .unwrap();

        let err = MonitorModel::from_value(&config).unwrap_err();
        assert_eq!(
            err.attribute().map(|p| p.to_string()),
            Some("host_metric[0].warning".to_string())
        );
    }

    #[test]
    fn two_variants_are_rejected() {
        let model = MonitorModel {
            name: Some("m".to_string()),
            connectivity: Some(Connectivity::default()),
            anomaly_detection: Some(AnomalyDetection::default()),
            ..MonitorModel::default()
        };
        assert!(matches!(
            model.to_api(),
            Err(ModelError::VariantCount { count: 2, .. })
        ));
    }

    #[test]
    fn missing_nested_required_value() {
        let model = MonitorModel {
            name: Some("m".to_string()),
            expression: Some(Expression {
                operator: Some(">".to_string()),
                ..Expression::default()
            }),
            ..MonitorModel::default()
        };
        let err = model.to_api().unwrap_err();
        assert_eq!(err.to_string(), "expression[0].expression is required");
    }

    #[test]
    fn schema_round_trips_through_state() {
        let model = MonitorModel::from_value(&host_metric_config()).unwrap();
        let again = MonitorModel::from_value(&model.to_value().unwrap()).unwrap();
        assert_eq!(model, again);

        let schema = MonitorModel::resource_schema(&Validators::new().unwrap());
        assert!(schema.validate(&host_metric_config()).is_empty());
    }

    #[test]
    fn data_source_schema_is_computed() {
        let schema = MonitorModel::data_source_schema(&Validators::new().unwrap());
        assert!(schema.attribute("id").unwrap().required);
        assert!(schema.attribute("name").unwrap().computed);
        let host = schema.nested_block("host_metric").unwrap();
        assert!(host.block.attributes.iter().all(|a| a.computed));
    }
}
