//! Service and role metadata
//!
//! A metadata document is arbitrary JSON stored under a namespace. State
//! keeps the JSON text; two texts describing the same document are equal.

use async_trait::async_trait;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;

use super::{
    attr, id_attribute, required, DataSourceModel, Fields, Model, ModelError, Result,
};
use crate::api::services::MetadataTarget;
use crate::api::Client;
use crate::ids::{join_id, split_id};
use crate::reconcile::Reconcile;
use crate::validators::Validators;

const SERVICE_ID_FORMAT: &str = "<service_name>:<namespace>";
const ROLE_ID_FORMAT: &str = "<service_name>:<role_name>:<namespace>";

fn parse_document(text: &Option<String>) -> Result<serde_json::Value> {
    let text = required(text, "metadata_json")?;
    serde_json::from_str(&text).map_err(|e| ModelError::InvalidJson {
        path: attr("metadata_json"),
        message: e.to_string(),
    })
}

fn render_document(document: &serde_json::Value) -> Result<String> {
    serde_json::to_string(document).map_err(|e| ModelError::InvalidJson {
        path: attr("metadata_json"),
        message: e.to_string(),
    })
}

/// Keeps the stored text while it still describes the fetched document
fn merge_document(old: Option<String>, fresh: Option<String>) -> Option<String> {
    let parse = |text: &Option<String>| {
        text.as_deref()
            .and_then(|t| serde_json::from_str::<serde_json::Value>(t).ok())
    };
    match (parse(&old), parse(&fresh)) {
        (Some(a), Some(b)) if a == b => old,
        _ => fresh,
    }
}

fn metadata_json_attribute() -> Attribute {
    AttributeBuilder::new("metadata_json", AttributeType::String)
        .description("The metadata document as JSON")
        .required()
        .build()
}

fn key_attribute(name: &str, description: &str, validators: &Validators) -> Attribute {
    let validators = if name == "namespace" {
        validators.namespace()
    } else {
        validators.name()
    };
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .required()
        .validators(validators)
        .plan_modifier(RequiresReplace::create())
        .build()
}

fn computed_string(name: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .computed()
        .build()
}

fn required_string(name: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .required()
        .build()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceMetadataModel {
    pub id: Option<String>,
    pub service: Option<String>,
    pub namespace: Option<String>,
    pub metadata_json: Option<String>,
}

impl ServiceMetadataModel {
    fn key(&self) -> Result<(String, String)> {
        if let (Some(service), Some(namespace)) = (&self.service, &self.namespace) {
            return Ok((service.clone(), namespace.clone()));
        }
        let [service, namespace] =
            split_id::<2>(&required(&self.id, "id")?, SERVICE_ID_FORMAT)?;
        Ok((service, namespace))
    }

    fn from_document(
        service: String,
        namespace: String,
        document: &serde_json::Value,
    ) -> Result<Self> {
        Ok(Self {
            id: Some(join_id(&[&service, &namespace])),
            service: Some(service),
            namespace: Some(namespace),
            metadata_json: Some(render_document(document)?),
        })
    }
}

impl Reconcile for ServiceMetadataModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            metadata_json: merge_document(self.metadata_json, fresh.metadata_json),
            ..fresh
        }
    }
}

#[async_trait]
impl Model for ServiceMetadataModel {
    const TYPE_NAME: &'static str = "mackerel_service_metadata";

    fn resource_schema(validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a metadata document attached to a service")
            .attribute(id_attribute(SERVICE_ID_FORMAT))
            .attribute(key_attribute("service", "The service name", validators))
            .attribute(key_attribute("namespace", "The metadata namespace", validators))
            .attribute(metadata_json_attribute())
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let fields = Fields::new(value);
        Ok(Self {
            id: fields.string("id")?,
            service: fields.string("service")?,
            namespace: fields.string("namespace")?,
            metadata_json: fields.string("metadata_json")?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut value = DynamicValue::object();
        value.set_string_opt(&attr("id"), self.id.clone())?;
        value.set_string_opt(&attr("service"), self.service.clone())?;
        value.set_string_opt(&attr("namespace"), self.namespace.clone())?;
        value.set_string_opt(&attr("metadata_json"), self.metadata_json.clone())?;
        Ok(value)
    }

    fn import_state(id: &str) -> Result<DynamicValue> {
        let [service, namespace] = split_id::<2>(id, SERVICE_ID_FORMAT)?;
        Self {
            id: Some(id.to_string()),
            service: Some(service),
            namespace: Some(namespace),
            metadata_json: None,
        }
        .to_value()
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        self.update(client).await
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let (service, namespace) = self.key()?;
        let target = MetadataTarget::Service {
            service: service.clone(),
        };
        let document = client.metadata().get(&target, &namespace).await?;
        Self::from_document(service, namespace, &document)
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let (service, namespace) = self.key()?;
        let document = parse_document(&self.metadata_json)?;
        let target = MetadataTarget::Service {
            service: service.clone(),
        };
        client.metadata().put(&target, &namespace, &document).await?;
        self.id = Some(join_id(&[&service, &namespace]));
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        let (service, namespace) = self.key()?;
        client
            .metadata()
            .delete(&MetadataTarget::Service { service }, &namespace)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for ServiceMetadataModel {
    fn data_source_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Reads a metadata document attached to a service")
            .attribute(computed_string("id"))
            .attribute(required_string("service"))
            .attribute(required_string("namespace"))
            .attribute(computed_string("metadata_json"))
            .build()
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let model = Self::from_value(config)?;
        model.read(client).await
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleMetadataModel {
    pub id: Option<String>,
    pub service: Option<String>,
    pub role: Option<String>,
    pub namespace: Option<String>,
    pub metadata_json: Option<String>,
}

impl RoleMetadataModel {
    fn key(&self) -> Result<(String, String, String)> {
        if let (Some(service), Some(role), Some(namespace)) =
            (&self.service, &self.role, &self.namespace)
        {
            return Ok((service.clone(), role.clone(), namespace.clone()));
        }
        let [service, role, namespace] =
            split_id::<3>(&required(&self.id, "id")?, ROLE_ID_FORMAT)?;
        Ok((service, role, namespace))
    }

    fn target(service: &str, role: &str) -> MetadataTarget {
        MetadataTarget::Role {
            service: service.to_string(),
            role: role.to_string(),
        }
    }
}

impl Reconcile for RoleMetadataModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            metadata_json: merge_document(self.metadata_json, fresh.metadata_json),
            ..fresh
        }
    }
}

#[async_trait]
impl Model for RoleMetadataModel {
    const TYPE_NAME: &'static str = "mackerel_role_metadata";

    fn resource_schema(validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a metadata document attached to a role")
            .attribute(id_attribute(ROLE_ID_FORMAT))
            .attribute(key_attribute("service", "The service name", validators))
            .attribute(key_attribute("role", "The role name", validators))
            .attribute(key_attribute("namespace", "The metadata namespace", validators))
            .attribute(metadata_json_attribute())
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let fields = Fields::new(value);
        Ok(Self {
            id: fields.string("id")?,
            service: fields.string("service")?,
            role: fields.string("role")?,
            namespace: fields.string("namespace")?,
            metadata_json: fields.string("metadata_json")?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut value = DynamicValue::object();
        value.set_string_opt(&attr("id"), self.id.clone())?;
        value.set_string_opt(&attr("service"), self.service.clone())?;
        value.set_string_opt(&attr("role"), self.role.clone())?;
        value.set_string_opt(&attr("namespace"), self.namespace.clone())?;
        value.set_string_opt(&attr("metadata_json"), self.metadata_json.clone())?;
        Ok(value)
    }

    fn import_state(id: &str) -> Result<DynamicValue> {
        let [service, role, namespace] = split_id::<3>(id, ROLE_ID_FORMAT)?;
        Self {
            id: Some(id.to_string()),
            service: Some(service),
            role: Some(role),
            namespace: Some(namespace),
            metadata_json: None,
        }
        .to_value()
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        self.update(client).await
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let (service, role, namespace) = self.key()?;
        let document = client
            .metadata()
            .get(&Self::target(&service, &role), &namespace)
            .await?;
        Ok(Self {
            id: Some(join_id(&[&service, &role, &namespace])),
            metadata_json: Some(render_document(&document)?),
            service: Some(service),
            role: Some(role),
            namespace: Some(namespace),
        })
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let (service, role, namespace) = self.key()?;
        let document = parse_document(&self.metadata_json)?;
        client
            .metadata()
            .put(&Self::target(&service, &role), &namespace, &document)
            .await?;
        self.id = Some(join_id(&[&service, &role, &namespace]));
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        let (service, role, namespace) = self.key()?;
        client
            .metadata()
            .delete(&Self::target(&service, &role), &namespace)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for RoleMetadataModel {
    fn data_source_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Reads a metadata document attached to a role")
            .attribute(computed_string("id"))
            .attribute(required_string("service"))
            .attribute(required_string("role"))
            .attribute(required_string("namespace"))
            .attribute(computed_string("metadata_json"))
            .build()
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let model = Self::from_value(config)?;
        model.read(client).await
    }
}
