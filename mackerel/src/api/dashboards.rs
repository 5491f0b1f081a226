//! Custom dashboard API
//!
//! Widgets share a header (`title`, `layout`) and carry a payload selected
//! by the `type` discriminant.

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub memo: String,
    pub url_path: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub title: String,
    pub layout: Layout,
    #[serde(flatten)]
    pub body: WidgetBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WidgetBody {
    #[serde(rename = "graph")]
    Graph {
        graph: GraphSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<GraphRange>,
    },
    #[serde(rename = "value", rename_all = "camelCase")]
    Value {
        metric: MetricSource,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fraction_size: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<String>,
    },
    #[serde(rename = "markdown")]
    Markdown { markdown: String },
    #[serde(rename = "alertStatus", rename_all = "camelCase")]
    AlertStatus {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role_fullname: Option<String>,
    },
}

impl WidgetBody {
    pub fn type_name(&self) -> &'static str {
        match self {
            WidgetBody::Graph { .. } => "graph",
            WidgetBody::Value { .. } => "value",
            WidgetBody::Markdown { .. } => "markdown",
            WidgetBody::AlertStatus { .. } => "alertStatus",
        }
    }
}

/// What a graph widget plots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GraphSource {
    #[serde(rename = "host", rename_all = "camelCase")]
    Host { host_id: String, name: String },
    #[serde(rename = "role", rename_all = "camelCase")]
    Role {
        role_fullname: String,
        name: String,
        #[serde(default)]
        is_stacked: bool,
    },
    #[serde(rename = "service", rename_all = "camelCase")]
    Service { service_name: String, name: String },
    #[serde(rename = "expression")]
    Expression { expression: String },
    #[serde(rename = "query")]
    Query {
        query: String,
        #[serde(default)]
        legend: String,
    },
    #[serde(rename = "unknown")]
    Unknown,
}

/// What a value widget displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetricSource {
    #[serde(rename = "host", rename_all = "camelCase")]
    Host { host_id: String, name: String },
    #[serde(rename = "service", rename_all = "camelCase")]
    Service { service_name: String, name: String },
    #[serde(rename = "expression")]
    Expression { expression: String },
    #[serde(rename = "query")]
    Query {
        query: String,
        #[serde(default)]
        legend: String,
    },
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GraphRange {
    #[serde(rename = "relative")]
    Relative { period: i64, offset: i64 },
    #[serde(rename = "absolute")]
    Absolute { start: i64, end: i64 },
}

#[derive(Debug, Deserialize)]
struct ListDashboardsResponse {
    dashboards: Vec<Dashboard>,
}

pub struct DashboardsApi<'a> {
    client: &'a Client,
}

impl<'a> DashboardsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/dashboards
    pub async fn list(&self) -> Result<Vec<Dashboard>, ApiError> {
        let response: ListDashboardsResponse = self.client.get("/api/v0/dashboards").await?;
        Ok(response.dashboards)
    }

    /// GET /api/v0/dashboards/{id}
    pub async fn get(&self, id: &str) -> Result<Dashboard, ApiError> {
        self.client
            .get(&format!("/api/v0/dashboards/{}", id))
            .await
    }

    /// POST /api/v0/dashboards
    pub async fn create(&self, dashboard: &Dashboard) -> Result<Dashboard, ApiError> {
        self.client.post("/api/v0/dashboards", dashboard).await
    }

    /// PUT /api/v0/dashboards/{id}
    pub async fn update(&self, id: &str, dashboard: &Dashboard) -> Result<Dashboard, ApiError> {
        self.client
            .put(&format!("/api/v0/dashboards/{}", id), dashboard)
            .await
    }

    /// DELETE /api/v0/dashboards/{id}
    pub async fn delete(&self, id: &str) -> Result<Dashboard, ApiError> {
        self.client
            .delete(&format!("/api/v0/dashboards/{}", id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn decodes_widget_variants() {
        let dashboard: Dashboard = serde_json::from_str(
            r##"{
                "id": "3Ja3HG3bTwq",
                "title": "My Dashboard",
                "memo": "",
                "urlPath": "2u4PP3TJqbu",
                "createdAt": 1552909732,
                "updatedAt": 1552992837,
                "widgets": [
                    {"type": "graph", "title": "cpu",
                     "graph": {"type": "role", "roleFullname": "web:app", "name": "cpu.{user,iowait,system}", "isStacked": true},
                     "range": {"type": "relative", "period": 86400, "offset": -86400},
                     "layout": {"x": 0, "y": 0, "width": 8, "height": 6}},
                    {"type": "value", "title": "load",
                     "metric": {"type": "expression", "expression": "avg(roleSlots(web:app, loadavg5))"},
                     "fractionSize": 2, "suffix": "",
                     "layout": {"x": 8, "y": 0, "width": 4, "height": 3}},
                    {"type": "markdown", "title": "note", "markdown": "# hello",
                     "layout": {"x": 0, "y": 6, "width": 24, "height": 2}},
                    {"type": "alertStatus", "title": "alerts", "roleFullname": "web:app",
                     "layout": {"x": 12, "y": 0, "width": 4, "height": 4}}
                ]
            }"##,
        )
        .unwrap();

        assert_eq!(dashboard.widgets.len(), 4);
        match &dashboard.widgets[0].body {
            WidgetBody::Graph {
                graph: GraphSource::Role { is_stacked, .. },
                range: Some(GraphRange::Relative { period, .. }),
            } => {
                assert!(is_stacked);
                assert_eq!(*period, 86400);
            }
            other => panic!("unexpected widget {:?}", other),
        }
        assert_eq!(dashboard.widgets[1].body.type_name(), "value");
        assert_eq!(dashboard.widgets[3].layout.width, 4);
    }

    #[test]
    fn server_timestamps_are_not_sent() {
        let dashboard = Dashboard {
            id: String::new(),
            title: "t".to_string(),
            memo: String::new(),
            url_path: "p".to_string(),
            widgets: vec![],
            created_at: Some(1),
            updated_at: Some(2),
        };
        let json = serde_json::to_value(&dashboard).unwrap();
        assert!(json.get("createdAt").is_none());
        assert_eq!(json["urlPath"], "p");
    }
}
