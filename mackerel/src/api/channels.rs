//! Notification channel API

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const MANAGED_TYPES: &[&str] = &["email", "slack", "webhook"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelKind {
    #[serde(rename = "email")]
    Email(EmailChannel),
    #[serde(rename = "slack")]
    Slack(SlackChannel),
    #[serde(rename = "webhook")]
    Webhook(WebhookChannel),
    /// line, chatwork, typetalk and friends, keeping the API's type
    #[serde(skip)]
    Unsupported(String),
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            id: String,
            name: String,
            #[serde(flatten)]
            kind: Value,
        }

        let wire = Wire::deserialize(deserializer)?;
        let type_name = wire
            .kind
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| serde::de::Error::missing_field("type"))?
            .to_string();

        let kind = if MANAGED_TYPES.contains(&type_name.as_str()) {
            serde_json::from_value(wire.kind).map_err(serde::de::Error::custom)?
        } else {
            ChannelKind::Unsupported(type_name)
        };

        Ok(Channel {
            id: wire.id,
            name: wire.name,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailChannel {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackMentions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackChannel {
    pub url: String,
    #[serde(default)]
    pub mentions: SlackMentions,
    #[serde(default)]
    pub enabled_graph_image: bool,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookChannel {
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListChannelsResponse {
    channels: Vec<Channel>,
}

pub struct ChannelsApi<'a> {
    client: &'a Client,
}

impl<'a> ChannelsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/channels
    pub async fn list(&self) -> Result<Vec<Channel>, ApiError> {
        let response: ListChannelsResponse = self.client.get("/api/v0/channels").await?;
        Ok(response.channels)
    }

    /// There is no single-channel endpoint, so this scans the list
    pub async fn find(&self, id: &str) -> Result<Channel, ApiError> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::not_found("channel", id))
    }

    /// POST /api/v0/channels
    pub async fn create(&self, channel: &Channel) -> Result<Channel, ApiError> {
        self.client.post("/api/v0/channels", channel).await
    }

    /// DELETE /api/v0/channels/{id}
    pub async fn delete(&self, id: &str) -> Result<Channel, ApiError> {
        self.client
            .delete(&format!("/api/v0/channels/{}", id))
            .await
    }
}
