//! Monitor API

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Serialize};

/// Shared monitor header with the type-specific payload flattened in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_interval: Option<i64>,
    #[serde(flatten)]
    pub kind: MonitorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MonitorKind {
    #[serde(rename = "host")]
    HostMetric(HostMetricMonitor),
    #[serde(rename = "connectivity")]
    Connectivity(ConnectivityMonitor),
    #[serde(rename = "service")]
    ServiceMetric(ServiceMetricMonitor),
    #[serde(rename = "external")]
    External(ExternalMonitor),
    #[serde(rename = "expression")]
    Expression(ExpressionMonitor),
    #[serde(rename = "anomalyDetection")]
    AnomalyDetection(AnomalyDetectionMonitor),
    #[serde(rename = "query")]
    Query(QueryMonitor),
    /// Check monitoring and other kinds this provider does not manage
    #[serde(other)]
    Unsupported,
}

impl MonitorKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            MonitorKind::HostMetric(_) => "host",
            MonitorKind::Connectivity(_) => "connectivity",
            MonitorKind::ServiceMetric(_) => "service",
            MonitorKind::External(_) => "external",
            MonitorKind::Expression(_) => "expression",
            MonitorKind::AnomalyDetection(_) => "anomalyDetection",
            MonitorKind::Query(_) => "query",
            MonitorKind::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMetricMonitor {
    pub metric: String,
    pub operator: String,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_check_attempts: Option<i64>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub exclude_scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityMonitor {
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub exclude_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_status_on_gone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetricMonitor {
    pub service: String,
    pub metric: String,
    pub operator: String,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_check_attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_duration_warning: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_duration_critical: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMonitor {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub request_body: String,
    #[serde(default)]
    pub headers: Vec<HeaderField>,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_warning: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_critical: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub contains_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_check_attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_expiration_warning: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_expiration_critical: Option<i64>,
    #[serde(default)]
    pub skip_certificate_verification: bool,
    #[serde(default)]
    pub follow_redirect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMonitor {
    pub expression: String,
    pub operator: String,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluate_backward_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyDetectionMonitor {
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub warning_sensitivity: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub critical_sensitivity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_check_attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_period_from: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMonitor {
    pub query: String,
    pub operator: String,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub legend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluate_backward_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListMonitorsResponse {
    monitors: Vec<Monitor>,
}

#[derive(Debug, Deserialize)]
struct GetMonitorResponse {
    monitor: Monitor,
}

pub struct MonitorsApi<'a> {
    client: &'a Client,
}

impl<'a> MonitorsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/monitors
    pub async fn list(&self) -> Result<Vec<Monitor>, ApiError> {
        let response: ListMonitorsResponse = self.client.get("/api/v0/monitors").await?;
        Ok(response.monitors)
    }

    /// GET /api/v0/monitors/{id}
    pub async fn get(&self, id: &str) -> Result<Monitor, ApiError> {
        let response: GetMonitorResponse = self
            .client
            .get(&format!("/api/v0/monitors/{}", id))
            .await?;
        Ok(response.monitor)
    }

    /// POST /api/v0/monitors
    pub async fn create(&self, monitor: &Monitor) -> Result<Monitor, ApiError> {
        self.client.post("/api/v0/monitors", monitor).await
    }

    /// PUT /api/v0/monitors/{id}
    pub async fn update(&self, id: &str, monitor: &Monitor) -> Result<Monitor, ApiError> {
        self.client
            .put(&format!("/api/v0/monitors/{}", id), monitor)
            .await
    }

    /// DELETE /api/v0/monitors/{id}
    pub async fn delete(&self, id: &str) -> Result<Monitor, ApiError> {
        self.client
            .delete(&format!("/api/v0/monitors/{}", id))
            .await
    }
}
