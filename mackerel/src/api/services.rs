//! Services, roles and their metadata

use super::client::segment;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServiceParam {
    pub name: String,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoleParam {
    pub name: String,
    pub memo: String,
}

#[derive(Debug, Deserialize)]
struct ListServicesResponse {
    services: Vec<Service>,
}

#[derive(Debug, Deserialize)]
struct ListRolesResponse {
    roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
struct ListNamespacesResponse {
    metadata: Vec<Namespace>,
}

#[derive(Debug, Deserialize)]
struct Namespace {
    namespace: String,
}

pub struct ServicesApi<'a> {
    client: &'a Client,
}

impl<'a> ServicesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/services
    pub async fn list(&self) -> Result<Vec<Service>, ApiError> {
        let response: ListServicesResponse = self.client.get("/api/v0/services").await?;
        Ok(response.services)
    }

    /// Linear scan over the service list
    pub async fn find(&self, name: &str) -> Result<Service, ApiError> {
        self.list()
            .await?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ApiError::not_found("service", name))
    }

    /// POST /api/v0/services
    pub async fn create(&self, param: &CreateServiceParam) -> Result<Service, ApiError> {
        self.client.post("/api/v0/services", param).await
    }

    /// DELETE /api/v0/services/{name}
    pub async fn delete(&self, name: &str) -> Result<Service, ApiError> {
        self.client
            .delete(&format!("/api/v0/services/{}", segment(name)))
            .await
    }
}

pub struct RolesApi<'a> {
    client: &'a Client,
}

impl<'a> RolesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v0/services/{service}/roles
    pub async fn list(&self, service: &str) -> Result<Vec<Role>, ApiError> {
        let response: ListRolesResponse = self
            .client
            .get(&format!("/api/v0/services/{}/roles", segment(service)))
            .await?;
        Ok(response.roles)
    }

    /// Linear scan over the roles of `service`
    pub async fn find(&self, service: &str, name: &str) -> Result<Role, ApiError> {
        self.list(service)
            .await?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| ApiError::not_found("role", format!("{}:{}", service, name)))
    }

    /// POST /api/v0/services/{service}/roles
    pub async fn create(&self, service: &str, param: &CreateRoleParam) -> Result<Role, ApiError> {
        self.client
            .post(&format!("/api/v0/services/{}/roles", segment(service)), param)
            .await
    }

    /// DELETE /api/v0/services/{service}/roles/{role}
    pub async fn delete(&self, service: &str, name: &str) -> Result<Role, ApiError> {
        self.client
            .delete(&format!(
                "/api/v0/services/{}/roles/{}",
                segment(service),
                segment(name)
            ))
            .await
    }
}

/// Where a metadata document is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataTarget {
    Service { service: String },
    Role { service: String, role: String },
}

impl MetadataTarget {
    fn base_path(&self) -> String {
        match self {
            MetadataTarget::Service { service } => {
                format!("/api/v0/services/{}/metadata", segment(service))
            }
            MetadataTarget::Role { service, role } => format!(
                "/api/v0/services/{}/roles/{}/metadata",
                segment(service),
                segment(role)
            ),
        }
    }
}

pub struct MetadataApi<'a> {
    client: &'a Client,
}

impl<'a> MetadataApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET {target}/metadata
    pub async fn namespaces(&self, target: &MetadataTarget) -> Result<Vec<String>, ApiError> {
        let response: ListNamespacesResponse = self.client.get(&target.base_path()).await?;
        Ok(response.metadata.into_iter().map(|m| m.namespace).collect())
    }

    /// GET {target}/metadata/{namespace}
    pub async fn get(
        &self,
        target: &MetadataTarget,
        namespace: &str,
    ) -> Result<serde_json::Value, ApiError> {
        self.client
            .get(&format!("{}/{}", target.base_path(), segment(namespace)))
            .await
    }

    /// PUT {target}/metadata/{namespace}
    pub async fn put(
        &self,
        target: &MetadataTarget,
        namespace: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .client
            .put(
                &format!("{}/{}", target.base_path(), segment(namespace)),
                metadata,
            )
            .await?;
        Ok(())
    }

    /// DELETE {target}/metadata/{namespace}
    pub async fn delete(&self, target: &MetadataTarget, namespace: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("{}/{}", target.base_path(), segment(namespace)))
            .await?;
        Ok(())
    }
}
