//! Service model

use async_trait::async_trait;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;

use super::{
    attr, id_attribute, replaceable_memo, required, DataSourceModel, Fields, Model, Result,
};
use crate::api::services::{CreateServiceParam, Service};
use crate::api::Client;
use crate::reconcile::{merge_collection, Reconcile};
use crate::validators::Validators;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
    /// Only looked up by the data source
    pub roles: Option<Vec<String>>,
}

impl ServiceModel {
    pub fn from_api(service: Service) -> Self {
        Self {
            id: Some(service.name.clone()),
            name: Some(service.name),
            memo: Some(service.memo),
            roles: None,
        }
    }

    pub fn to_api(&self) -> Result<CreateServiceParam> {
        Ok(CreateServiceParam {
            name: required(&self.name, "name")?,
            memo: self.memo.clone().unwrap_or_default(),
        })
    }

    fn key(&self) -> Result<String> {
        required(&self.id.clone().or_else(|| self.name.clone()), "id")
    }
}

impl Reconcile for ServiceModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            id: fresh.id,
            name: fresh.name,
            memo: fresh.memo,
            roles: merge_collection(self.roles, fresh.roles),
        }
    }
}

#[async_trait]
impl Model for ServiceModel {
    const TYPE_NAME: &'static str = "mackerel_service";

    fn resource_schema(validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel service")
            .attribute(id_attribute("The service name"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the service")
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
            name: fields.string("name")?,
            memo: fields.string("memo")?,
            roles: fields.strings("roles")?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut value = DynamicValue::object();
        value.set_string_opt(&attr("id"), self.id.clone())?;
        value.set_string_opt(&attr("name"), self.name.clone())?;
        value.set_string_opt(&attr("memo"), self.memo.clone())?;
        if self.roles.is_some() {
            value.set_string_list_opt(&attr("roles"), self.roles.clone())?;
        }
        Ok(value)
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.services().create(&self.to_api()?).await?;
        tracing::info!("Created service {}", created.name);
        *self = Self::from_api(created);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let service = client.services().find(&self.key()?).await?;
        Ok(Self::from_api(service))
    }

    /// The API has no service update and every attribute forces replacement
    async fn update(&mut self, _client: &Client) -> Result<()> {
        self.id = Some(self.key()?);
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        client.services().delete(&self.key()?).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for ServiceModel {
    fn data_source_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Looks up a Mackerel service by name")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the service")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("memo", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("roles", AttributeType::set_of_strings())
                    .description("Names of the roles in the service")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let name = required(&Fields::new(config).string("name")?, "name")?;
        let service = client.services().find(&name).await?;
        let roles = service.roles.clone();
        Ok(Self {
            roles: Some(roles),
            ..Self::from_api(service)
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn resource_state_has_no_roles() {
        let model = ServiceModel::from_api(Service {
            name: "web".to_string(),
            memo: "frontend".to_string(),
            roles: vec!["app".to_string()],
        });
        let value = model.to_value().unwrap();

        assert_eq!(value.get_string(&attr("id")).unwrap(), "web");
        assert!(value.get(&attr("roles")).is_err());
    }

    #[test]
    fn create_requires_name() {
        let err = ServiceModel::default().to_api().unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }
}
