//! Notification group model

use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::DynamicValue;
use tfplug::validator::OneOfValidator;

use super::{
    attr, id_attribute, into_lookup_schema, optional_attr, required, required_attr, set_blocks,
    DataSourceModel, Fields, Model, ModelError, Result,
};
use crate::api::notification_groups::{
    NotificationGroup, NotificationGroupMonitor, NotificationGroupService,
};
use crate::api::Client;
use crate::reconcile::{merge_collection, Reconcile};
use crate::validators::Validators;

const LEVELS: &[&str] = &["all", "critical"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupMonitor {
    pub id: Option<String>,
    pub skip_default: Option<bool>,
}

impl GroupMonitor {
    const BLOCK: &'static str = "monitor";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Monitor whose alerts are routed to this group")
            .nesting(NestingMode::Set)
            .attribute(required_attr("id", AttributeType::String, "The monitor ID"))
            .attribute(
                AttributeBuilder::new("skip_default", AttributeType::Bool)
                    .description("Skip the default notification channels")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            id: f.string("id")?,
            skip_default: f.bool("skip_default")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_bool_opt(&attr("skip_default"), self.skip_default)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupService {
    pub name: Option<String>,
}

impl GroupService {
    const BLOCK: &'static str = "service";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Service whose alerts are routed to this group")
            .nesting(NestingMode::Set)
            .attribute(required_attr("name", AttributeType::String, "The service name"))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            name: f.string("name")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("name"), self.name.clone())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationGroupModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub notification_level: Option<String>,
    pub child_notification_group_ids: Option<Vec<String>>,
    pub child_channel_ids: Option<Vec<String>>,
    pub monitors: Vec<GroupMonitor>,
    pub services: Vec<GroupService>,
}

impl NotificationGroupModel {
    pub fn from_api(group: NotificationGroup) -> Self {
        Self {
            id: Some(group.id),
            name: Some(group.name),
            notification_level: Some(group.notification_level),
            child_notification_group_ids: Some(group.child_notification_group_ids),
            child_channel_ids: Some(group.child_channel_ids),
            monitors: group
                .monitors
                .into_iter()
                .map(|m| GroupMonitor {
                    id: Some(m.id),
                    skip_default: Some(m.skip_default),
                })
                .collect(),
            services: group
                .services
                .into_iter()
                .map(|s| GroupService { name: Some(s.name) })
                .collect(),
        }
    }

    pub fn to_api(&self) -> Result<NotificationGroup> {
        let monitors = self
            .monitors
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let id = m.id.clone().ok_or_else(|| {
                    ModelError::Missing(attr(GroupMonitor::BLOCK).index(idx as i64).attribute("id"))
                })?;
                Ok(NotificationGroupMonitor {
                    id,
                    skip_default: m.skip_default.unwrap_or(false),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let services = self
            .services
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                let name = s.name.clone().ok_or_else(|| {
                    let path = attr(GroupService::BLOCK).index(idx as i64);
                    ModelError::Missing(path.attribute("name"))
                })?;
                Ok(NotificationGroupService { name })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(NotificationGroup {
            id: self.id.clone().unwrap_or_default(),
            name: required(&self.name, "name")?,
            notification_level: self
                .notification_level
                .clone()
                .unwrap_or_else(|| "all".to_string()),
            child_notification_group_ids: self
                .child_notification_group_ids
                .clone()
                .unwrap_or_default(),
            child_channel_ids: self.child_channel_ids.clone().unwrap_or_default(),
            monitors,
            services,
        })
    }
}

impl Reconcile for NotificationGroupModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            child_notification_group_ids: merge_collection(
                self.child_notification_group_ids,
                fresh.child_notification_group_ids,
            ),
            child_channel_ids: merge_collection(self.child_channel_ids, fresh.child_channel_ids),
            ..fresh
        }
    }
}

#[async_trait]
impl Model for NotificationGroupModel {
    const TYPE_NAME: &'static str = "mackerel_notification_group";

    fn resource_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel notification group")
            .attribute(id_attribute("The notification group ID"))
            .attribute(required_attr("name", AttributeType::String, "The group name"))
            .attribute(
                AttributeBuilder::new("notification_level", AttributeType::String)
                    .description("Alert level that is notified: all or critical")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("all"))
                    .validator(OneOfValidator::create(LEVELS.iter().copied()))
                    .build(),
            )
            .attribute(optional_attr(
                "child_notification_group_ids",
                AttributeType::set_of_strings(),
                "Notification groups notified together with this one",
            ))
            .attribute(optional_attr(
                "child_channel_ids",
                AttributeType::set_of_strings(),
                "Channels notified by this group",
            ))
            .block(GroupMonitor::schema())
            .block(GroupService::schema())
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        Ok(Self {
            id: f.string("id")?,
            name: f.string("name")?,
            notification_level: f.choice("notification_level", LEVELS)?,
            child_notification_group_ids: f.strings("child_notification_group_ids")?,
            child_channel_ids: f.strings("child_channel_ids")?,
            monitors: f.blocks(GroupMonitor::BLOCK, GroupMonitor::read)?,
            services: f.blocks(GroupService::BLOCK, GroupService::read)?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("name"), self.name.clone())?;
        v.set_string_opt(&attr("notification_level"), self.notification_level.clone())?;
        v.set_string_list_opt(
            &attr("child_notification_group_ids"),
            self.child_notification_group_ids.clone(),
        )?;
        v.set_string_list_opt(&attr("child_channel_ids"), self.child_channel_ids.clone())?;
        set_blocks(&mut v, GroupMonitor::BLOCK, &self.monitors, GroupMonitor::write)?;
        set_blocks(&mut v, GroupService::BLOCK, &self.services, GroupService::write)?;
        Ok(v)
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.notification_groups().create(&self.to_api()?).await?;
        tracing::info!("Created notification group {} ({})", created.name, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let id = required(&self.id, "id")?;
        Ok(Self::from_api(client.notification_groups().find(&id).await?))
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.notification_groups().update(&id, &self.to_api()?).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.notification_groups().delete(&id).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for NotificationGroupModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a Mackerel notification group by ID",
        )
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Ok(Self::from_api(client.notification_groups().find(&id).await?))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn level_defaults_to_all() {
        let model = NotificationGroupModel {
            name: Some("ops".to_string()),
            monitors: vec![GroupMonitor {
                id: Some("mon1".to_string()),
                skip_default: None,
            }],
            ..NotificationGroupModel::default()
        };
        let api = model.to_api().unwrap();
        assert_eq!(api.notification_level, "all");
        assert!(!api.monitors[0].skip_default);
        assert!(api.child_channel_ids.is_empty());
    }

    #[test]
    fn monitor_without_id_points_at_element() {
        let model = NotificationGroupModel {
            name: Some("ops".to_string()),
            monitors: vec![
                GroupMonitor {
                    id: Some("a".to_string()),
                    skip_default: None,
                },
                GroupMonitor::default(),
            ],
            ..NotificationGroupModel::default()
        };
        assert_eq!(
            model.to_api().unwrap_err().to_string(),
            "monitor[1].id is required"
        );
    }

    #[test]
    fn null_id_sets_survive_refresh() {
        let stored = NotificationGroupModel {
            id: Some("g".to_string()),
            name: Some("ops".to_string()),
            notification_level: Some("critical".to_string()),
            ..NotificationGroupModel::default()
        };
        let fresh = NotificationGroupModel::from_api(stored.to_api().unwrap());
        let merged = stored.clone().merge(fresh);
        assert_eq!(merged, stored);
    }
}
