//! Notification group API

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroup {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub name: String,
    pub notification_level: String,
    #[serde(default)]
    pub child_notification_group_ids: Vec<String>,
    #[serde(default)]
    pub child_channel_ids: Vec<String>,
    #[serde(default)]
    pub monitors: Vec<NotificationGroupMonitor>,
    #[serde(default)]
    pub services: Vec<NotificationGroupService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroupMonitor {
    pub id: String,
    #[serde(default)]
    pub skip_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationGroupService {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListNotificationGroupsResponse {
    notification_groups: Vec<NotificationGroup>,
}

pub struct NotificationGroupsApi<'a> {
    client: &'a Client,
}

impl<'a> NotificationGroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/notification-groups
    pub async fn list(&self) -> Result<Vec<NotificationGroup>, ApiError> {
        let response: ListNotificationGroupsResponse =
            self.client.get("/api/v0/notification-groups").await?;
        Ok(response.notification_groups)
    }

    /// Linear scan, the API has no single-group endpoint
    pub async fn find(&self, id: &str) -> Result<NotificationGroup, ApiError> {
        self.list()
            .await?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| ApiError::not_found("notification group", id))
    }

    /// POST /api/v0/notification-groups
    pub async fn create(&self, group: &NotificationGroup) -> Result<NotificationGroup, ApiError> {
        self.client.post("/api/v0/notification-groups", group).await
    }

    /// PUT /api/v0/notification-groups/{id}
    pub async fn update(
        &self,
        id: &str,
        group: &NotificationGroup,
    ) -> Result<NotificationGroup, ApiError> {
        self.client
            .put(&format!("/api/v0/notification-groups/{}", id), group)
            .await
    }

    /// DELETE /api/v0/notification-groups/{id}
    pub async fn delete(&self, id: &str) -> Result<NotificationGroup, ApiError> {
        self.client
            .delete(&format!("/api/v0/notification-groups/{}", id))
            .await
    }
}
