//! AWS integration API

use super::{is_empty, ApiError, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsIntegration {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Write-only, the API never echoes it back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub region: String,
    #[serde(default)]
    pub included_tags: String,
    #[serde(default)]
    pub excluded_tags: String,
    /// Keyed by the API service name, e.g. `EC2` or `Route 53`
    #[serde(default)]
    pub services: BTreeMap<String, AwsIntegrationService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsIntegrationService {
    pub enable: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub excluded_metrics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retire_automatically: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ListAwsIntegrationsResponse {
    aws_integrations: Vec<AwsIntegration>,
}

pub struct AwsIntegrationsApi<'a> {
    client: &'a Client,
}

impl<'a> AwsIntegrationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/aws-integrations
    pub async fn list(&self) -> Result<Vec<AwsIntegration>, ApiError> {
        let response: ListAwsIntegrationsResponse =
            self.client.get("/api/v0/aws-integrations").await?;
        Ok(response.aws_integrations)
    }

    /// GET /api/v0/aws-integrations/{id}
    pub async fn get(&self, id: &str) -> Result<AwsIntegration, ApiError> {
        self.client
            .get(&format!("/api/v0/aws-integrations/{}", id))
            .await
    }

    /// POST /api/v0/aws-integrations
    pub async fn create(&self, integration: &AwsIntegration) -> Result<AwsIntegration, ApiError> {
        self.client.post("/api/v0/aws-integrations", integration).await
    }

    /// PUT /api/v0/aws-integrations/{id}
    pub async fn update(
        &self,
        id: &str,
        integration: &AwsIntegration,
    ) -> Result<AwsIntegration, ApiError> {
        self.client
            .put(&format!("/api/v0/aws-integrations/{}", id), integration)
            .await
    }

    /// DELETE /api/v0/aws-integrations/{id}
    pub async fn delete(&self, id: &str) -> Result<AwsIntegration, ApiError> {
        self.client
            .delete(&format!("/api/v0/aws-integrations/{}", id))
            .await
    }
}
