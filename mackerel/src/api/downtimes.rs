//! Scheduled downtime API

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Downtime {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub memo: String,
    pub start: i64,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<DowntimeRecurrence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_exclude_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_exclude_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitor_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitor_exclude_scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeRecurrence {
    #[serde(rename = "type")]
    pub recurrence_type: String,
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListDowntimesResponse {
    downtimes: Vec<Downtime>,
}

pub struct DowntimesApi<'a> {
    client: &'a Client,
}

impl<'a> DowntimesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/downtimes
    pub async fn list(&self) -> Result<Vec<Downtime>, ApiError> {
        let response: ListDowntimesResponse = self.client.get("/api/v0/downtimes").await?;
        Ok(response.downtimes)
    }

    /// Linear scan over the downtime list
    pub async fn find(&self, id: &str) -> Result<Downtime, ApiError> {
        self.list()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::not_found("downtime", id))
    }

    /// POST /api/v0/downtimes
    pub async fn create(&self, downtime: &Downtime) -> Result<Downtime, ApiError> {
        self.client.post("/api/v0/downtimes", downtime).await
    }

    /// PUT /api/v0/downtimes/{id}
    pub async fn update(&self, id: &str, downtime: &Downtime) -> Result<Downtime, ApiError> {
        self.client
            .put(&format!("/api/v0/downtimes/{}", id), downtime)
            .await
    }

    /// DELETE /api/v0/downtimes/{id}
    pub async fn delete(&self, id: &str) -> Result<Downtime, ApiError> {
        self.client
            .delete(&format!("/api/v0/downtimes/{}", id))
            .await
    }
}
