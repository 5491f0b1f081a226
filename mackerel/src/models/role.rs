//! Role model. Roles are addressed as `service:role`.

use async_trait::async_trait;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;

use super::{
    attr, id_attribute, replaceable_memo, required, DataSourceModel, Fields, Model, Result,
};
use crate::api::services::{CreateRoleParam, Role};
use crate::api::Client;
use crate::ids::{join_id, split_id};
use crate::reconcile::Reconcile;
use crate::validators::Validators;

const ID_FORMAT: &str = "<service_name>:<role_name>";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleModel {
    pub id: Option<String>,
    pub service: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
}

impl RoleModel {
    pub fn from_api(service: &str, role: Role) -> Self {
        Self {
            id: Some(join_id(&[service, &role.name])),
            service: Some(service.to_string()),
            name: Some(role.name),
            memo: Some(role.memo),
        }
    }

    pub fn to_api(&self) -> Result<CreateRoleParam> {
        Ok(CreateRoleParam {
            name: required(&self.name, "name")?,
            memo: self.memo.clone().unwrap_or_default(),
        })
    }

    /// Service and role names, from the attributes or the ID
    fn key(&self) -> Result<(String, String)> {
        if let (Some(service), Some(name)) = (&self.service, &self.name) {
            return Ok((service.clone(), name.clone()));
        }
        let [service, name] = split_id::<2>(&required(&self.id, "id")?, ID_FORMAT)?;
        Ok((service, name))
    }
}

impl Reconcile for RoleModel {
    fn merge(self, fresh: Self) -> Self {
        fresh
    }
}

#[async_trait]
impl Model for RoleModel {
    const TYPE_NAME: &'static str = "mackerel_role";

    fn resource_schema(validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a role within a Mackerel service")
            .attribute(id_attribute("<service_name>:<role_name>"))
            .attribute(
                AttributeBuilder::new("service", AttributeType::String)
                    .description("The service the role belongs to")
                    .required()
                    .validators(validators.name())
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the role")
                    .required()
                    .validators(validators.name())
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(replaceable_memo())
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let fields = Fields::new(value);
        Ok(Self {
            id: fields.string("id")?,
            service: fields.string("service")?,
            name: fields.string("name")?,
            memo: fields.string("memo")?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut value = DynamicValue::object();
        value.set_string_opt(&attr("id"), self.id.clone())?;
        value.set_string_opt(&attr("service"), self.service.clone())?;
        value.set_string_opt(&attr("name"), self.name.clone())?;
        value.set_string_opt(&attr("memo"), self.memo.clone())?;
        Ok(value)
    }

    fn import_state(id: &str) -> Result<DynamicValue> {
        let [service, name] = split_id::<2>(id, ID_FORMAT)?;
        Self {
            id: Some(id.to_string()),
            service: Some(service),
            name: Some(name),
            memo: None,
        }
        .to_value()
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let service = required(&self.service, "service")?;
        let created = client.roles().create(&service, &self.to_api()?).await?;
        *self = Self::from_api(&service, created);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let (service, name) = self.key()?;
        let role = client.roles().find(&service, &name).await?;
        Ok(Self::from_api(&service, role))
    }

    /// The API has no role update and every attribute forces replacement
    async fn update(&mut self, _client: &Client) -> Result<()> {
        let (service, name) = self.key()?;
        self.id = Some(join_id(&[&service, &name]));
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        let (service, name) = self.key()?;
        client.roles().delete(&service, &name).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for RoleModel {
    fn data_source_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Looks up a role of a Mackerel service")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("service", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("memo", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let fields = Fields::new(config);
        let service = required(&fields.string("service")?, "service")?;
        let name = required(&fields.string("name")?, "name")?;
        let role = client.roles().find(&service, &name).await?;
        Ok(Self::from_api(&service, role))
    }
}
