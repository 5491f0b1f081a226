//! Alert group setting API

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertGroupSetting {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub service_scopes: Vec<String>,
    #[serde(default)]
    pub role_scopes: Vec<String>,
    #[serde(default)]
    pub monitor_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_interval: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAlertGroupSettingsResponse {
    alert_group_settings: Vec<AlertGroupSetting>,
}

pub struct AlertGroupSettingsApi<'a> {
    client: &'a Client,
}

impl<'a> AlertGroupSettingsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/alert-group-settings
    pub async fn list(&self) -> Result<Vec<AlertGroupSetting>, ApiError> {
        let response: ListAlertGroupSettingsResponse =
            self.client.get("/api/v0/alert-group-settings").await?;
        Ok(response.alert_group_settings)
    }

    /// GET /api/v0/alert-group-settings/{id}
    pub async fn get(&self, id: &str) -> Result<AlertGroupSetting, ApiError> {
        self.client
            .get(&format!("/api/v0/alert-group-settings/{}", id))
            .await
    }

    /// POST /api/v0/alert-group-settings
    pub async fn create(&self, setting: &AlertGroupSetting) -> Result<AlertGroupSetting, ApiError> {
        self.client.post("/api/v0/alert-group-settings", setting).await
    }

    /// PUT /api/v0/alert-group-settings/{id}
    pub async fn update(
        &self,
        id: &str,
        setting: &AlertGroupSetting,
    ) -> Result<AlertGroupSetting, ApiError> {
        self.client
            .put(&format!("/api/v0/alert-group-settings/{}", id), setting)
            .await
    }

    /// DELETE /api/v0/alert-group-settings/{id}
    pub async fn delete(&self, id: &str) -> Result<AlertGroupSetting, ApiError> {
        self.client
            .delete(&format!("/api/v0/alert-group-settings/{}", id))
            .await
    }
}
