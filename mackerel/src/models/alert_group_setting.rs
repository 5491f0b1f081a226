//! Alert group setting model

use async_trait::async_trait;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::NumberRangeValidator;

use super::{
    attr, id_attribute, into_lookup_schema, memo_attribute, optional_attr, required,
    required_attr, DataSourceModel, Fields, Model, Result,
};
use crate::api::alert_group_settings::AlertGroupSetting;
use crate::api::Client;
use crate::reconcile::{merge_collection, Reconcile};
use crate::scope::normalize_scopes;
use crate::validators::Validators;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertGroupSettingModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub service_scopes: Option<Vec<String>>,
    pub role_scopes: Option<Vec<String>>,
    pub monitor_scopes: Option<Vec<String>>,
    pub notification_interval: Option<i64>,
}

impl AlertGroupSettingModel {
    pub fn from_api(setting: AlertGroupSetting) -> Self {
        Self {
            id: Some(setting.id),
            name: Some(setting.name),
            memo: Some(setting.memo),
            service_scopes: Some(setting.service_scopes),
            role_scopes: Some(normalize_scopes(&setting.role_scopes)),
            monitor_scopes: Some(setting.monitor_scopes),
            notification_interval: setting.notification_interval,
        }
    }

    pub fn to_api(&self) -> Result<AlertGroupSetting> {
        Ok(AlertGroupSetting {
            id: self.id.clone().unwrap_or_default(),
            name: required(&self.name, "name")?,
            memo: self.memo.clone().unwrap_or_default(),
            service_scopes: self.service_scopes.clone().unwrap_or_default(),
            role_scopes: self.role_scopes.clone().unwrap_or_default(),
            monitor_scopes: self.monitor_scopes.clone().unwrap_or_default(),
            notification_interval: self.notification_interval,
        })
    }
}

impl Reconcile for AlertGroupSettingModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            service_scopes: merge_collection(self.service_scopes, fresh.service_scopes),
            role_scopes: merge_collection(self.role_scopes, fresh.role_scopes),
            monitor_scopes: merge_collection(self.monitor_scopes, fresh.monitor_scopes),
            ..fresh
        }
    }
}

#[async_trait]
impl Model for AlertGroupSettingModel {
    const TYPE_NAME: &'static str = "mackerel_alert_group_setting";

    fn resource_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel alert group setting")
            .attribute(id_attribute("The alert group setting ID"))
            .attribute(required_attr("name", AttributeType::String, "The setting name"))
            .attribute(memo_attribute())
            .attribute(optional_attr(
                "service_scopes",
                AttributeType::set_of_strings(),
                "Services whose alerts are grouped",
            ))
            .attribute(optional_attr(
                "role_scopes",
                AttributeType::set_of_strings(),
                "Roles (<service>:<role>) whose alerts are grouped",
            ))
            .attribute(optional_attr(
                "monitor_scopes",
                AttributeType::set_of_strings(),
                "Monitor IDs whose alerts are grouped",
            ))
            .attribute(
                AttributeBuilder::new("notification_interval", AttributeType::Number)
                    .description("Minutes between repeated notifications")
                    .optional()
                    .validator(NumberRangeValidator::at_least(0.0))
                    .build(),
            )
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        Ok(Self {
            id: f.string("id")?,
            name: f.string("name")?,
            memo: f.string("memo")?,
            service_scopes: f.strings("service_scopes")?,
            role_scopes: f.strings("role_scopes")?,
            monitor_scopes: f.strings("monitor_scopes")?,
            notification_interval: f.i64("notification_interval")?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("name"), self.name.clone())?;
        v.set_string_opt(&attr("memo"), self.memo.clone())?;
        v.set_string_list_opt(&attr("service_scopes"), self.service_scopes.clone())?;
        v.set_string_list_opt(&attr("role_scopes"), self.role_scopes.clone())?;
        v.set_string_list_opt(&attr("monitor_scopes"), self.monitor_scopes.clone())?;
        v.set_i64_opt(&attr("notification_interval"), self.notification_interval)?;
        Ok(v)
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.alert_group_settings().create(&self.to_api()?).await?;
        tracing::info!("Created alert group setting {} ({})", created.name, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let id = required(&self.id, "id")?;
        Ok(Self::from_api(client.alert_group_settings().get(&id).await?))
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.alert_group_settings().update(&id, &self.to_api()?).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.alert_group_settings().delete(&id).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for AlertGroupSettingModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a Mackerel alert group setting by ID",
        )
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Ok(Self::from_api(client.alert_group_settings().get(&id).await?))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn setting(role_scopes: Vec<&str>) -> AlertGroupSetting {
        AlertGroupSetting {
            id: "ags".to_string(),
            name: "web".to_string(),
            memo: String::new(),
            service_scopes: vec![],
            role_scopes: role_scopes.into_iter().map(String::from).collect(),
            monitor_scopes: vec![],
            notification_interval: None,
        }
    }

    #[test]
    fn refresh_normalizes_and_keeps_null_sets() {
        let stored = AlertGroupSettingModel {
            service_scopes: None,
            monitor_scopes: Some(vec![]),
            ..AlertGroupSettingModel::from_api(setting(vec!["web:app"]))
        };
        let fresh = AlertGroupSettingModel::from_api(setting(vec!["web: app"]));

        let merged = stored.clone().merge(fresh);
        assert_eq!(merged, stored);
    }

    #[test]
    fn null_sets_are_sent_empty() {
        let model = AlertGroupSettingModel {
            name: Some("x".to_string()),
            ..AlertGroupSettingModel::default()
        };
        let api = model.to_api().unwrap();
        assert!(api.role_scopes.is_empty());
        assert_eq!(api.memo, "");
    }
}
