//! Notification channel model
//!
//! The API cannot update channels, so every attribute and block forces
//! replacement. Only email, slack and webhook channels are managed.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tfplug::plan_modifier::RequiresReplace;
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, Schema,
    SchemaBuilder,
};
use tfplug::types::DynamicValue;
use tfplug::validator::{ExactlyOneOf, OneOfValidator};

use super::{
    attr, check_variants, id_attribute, into_lookup_schema, required, required_in, set_block,
    DataSourceModel, Fields, Model, ModelError, Result,
};
use crate::api::channels::{
    Channel, ChannelKind, EmailChannel, SlackChannel, SlackMentions, WebhookChannel,
};
use crate::api::Client;
use crate::reconcile::{merge_block, merge_collection, Reconcile};
use crate::validators::Validators;

const VARIANTS: &[&str] = &["email", "slack", "webhook"];

pub const EVENTS: &[&str] = &[
    "alert",
    "alertGroup",
    "hostStatus",
    "hostRegister",
    "hostRetire",
    "monitor",
];

const MENTION_KEYS: &[&str] = &["ok", "warning", "critical"];

fn replaced(builder: AttributeBuilder) -> Attribute {
    builder.plan_modifier(RequiresReplace::create()).build()
}

fn events_attr() -> Attribute {
    replaced(
        AttributeBuilder::new("events", AttributeType::set_of_strings())
            .description("Events that trigger a notification")
            .optional()
            .validator(OneOfValidator::create(EVENTS.iter().copied())),
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Email {
    pub emails: Option<Vec<String>>,
    pub user_ids: Option<Vec<String>>,
    pub events: Option<Vec<String>>,
}

impl Email {
    const BLOCK: &'static str = "email";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Email notification")
            .single()
            .attribute(replaced(
                AttributeBuilder::new("emails", AttributeType::set_of_strings())
                    .description("Addresses to notify")
                    .optional(),
            ))
            .attribute(replaced(
                AttributeBuilder::new("user_ids", AttributeType::set_of_strings())
                    .description("Organization users to notify")
                    .optional(),
            ))
            .attribute(events_attr())
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            emails: f.strings("emails")?,
            user_ids: f.strings("user_ids")?,
            events: f.strings("events")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_list_opt(&attr("emails"), self.emails.clone())?;
        v.set_string_list_opt(&attr("user_ids"), self.user_ids.clone())?;
        v.set_string_list_opt(&attr("events"), self.events.clone())?;
        Ok(())
    }

    fn from_api(c: EmailChannel) -> Self {
        Self {
            emails: Some(c.emails),
            user_ids: Some(c.user_ids),
            events: Some(c.events),
        }
    }

    fn to_api(&self) -> EmailChannel {
        EmailChannel {
            emails: self.emails.clone().unwrap_or_default(),
            user_ids: self.user_ids.clone().unwrap_or_default(),
            events: self.events.clone().unwrap_or_default(),
        }
    }
}

impl Reconcile for Email {
    fn merge(self, fresh: Self) -> Self {
        Self {
            emails: merge_collection(self.emails, fresh.emails),
            user_ids: merge_collection(self.user_ids, fresh.user_ids),
            events: merge_collection(self.events, fresh.events),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slack {
    pub url: Option<String>,
    pub mentions: Option<BTreeMap<String, String>>,
    pub enabled_graph_image: Option<bool>,
    pub events: Option<Vec<String>>,
}

impl Slack {
    const BLOCK: &'static str = "slack";

    fn schema() -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("Slack incoming webhook notification")
            .single()
            .attribute(replaced(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("Incoming webhook URL")
                    .required()
                    .sensitive(),
            ))
            .attribute(replaced(
                AttributeBuilder::new("mentions", AttributeType::map_of_strings())
                    .description("Mention text per alert status (ok, warning, critical)")
                    .optional(),
            ))
            .attribute(replaced(
                AttributeBuilder::new("enabled_graph_image", AttributeType::Bool)
                    .description("Attach a graph image to the notification")
                    .optional(),
            ))
            .attribute(events_attr())
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        let mentions = f.string_map("mentions")?;
        if let Some(unknown) = mentions
            .iter()
            .flat_map(|m| m.keys())
            .find(|key| !MENTION_KEYS.contains(&key.as_str()))
        {
            return Err(ModelError::InvalidEnum {
                path: f.path("mentions").key(unknown),
                expected: MENTION_KEYS,
                actual: unknown.clone(),
            });
        }

        Ok(Self {
            url: f.string("url")?,
            mentions,
            enabled_graph_image: f.bool("enabled_graph_image")?,
            events: f.strings("events")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("url"), self.url.clone())?;
        v.set_string_map_opt(&attr("mentions"), self.mentions.clone())?;
        v.set_bool_opt(&attr("enabled_graph_image"), self.enabled_graph_image)?;
        v.set_string_list_opt(&attr("events"), self.events.clone())?;
        Ok(())
    }

    fn from_api(c: SlackChannel) -> Self {
        let SlackMentions {
            ok,
            warning,
            critical,
        } = c.mentions;
        let mentions = [("ok", ok), ("warning", warning), ("critical", critical)]
            .into_iter()
            .filter_map(|(key, text)| text.map(|text| (key.to_string(), text)))
            .collect();

        Self {
            url: Some(c.url),
            mentions: Some(mentions),
            enabled_graph_image: Some(c.enabled_graph_image),
            events: Some(c.events),
        }
    }

    fn to_api(&self) -> Result<SlackChannel> {
        let mention = |key: &str| {
            self.mentions
                .as_ref()
                .and_then(|m| m.get(key))
                .cloned()
        };
        Ok(SlackChannel {
            url: required_in(&self.url, Self::BLOCK, "url")?,
            mentions: SlackMentions {
                ok: mention("ok"),
                warning: mention("warning"),
                critical: mention("critical"),
            },
            enabled_graph_image: self.enabled_graph_image.unwrap_or(false),
            events: self.events.clone().unwrap_or_default(),
        })
    }
}

impl Reconcile for Slack {
    fn merge(self, fresh: Self) -> Self {
        Self {
            mentions: merge_collection(self.mentions, fresh.mentions),
            events: merge_collection(self.events, fresh.events),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Webhook {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
}

impl Webhook {
    const BLOCK: &'static str = "webhook";

    fn schema(validators: &Validators) -> NestedBlock {
        NestedBlockBuilder::new(Self::BLOCK)
            .description("HTTP webhook notification")
            .single()
            .attribute(replaced(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("URL the notification is POSTed to")
                    .required()
                    .validator(validators.http_url()),
            ))
            .attribute(events_attr())
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            url: f.string("url")?,
            events: f.strings("events")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("url"), self.url.clone())?;
        v.set_string_list_opt(&attr("events"), self.events.clone())?;
        Ok(())
    }

    fn from_api(c: WebhookChannel) -> Self {
        Self {
            url: Some(c.url),
            events: Some(c.events),
        }
    }

    fn to_api(&self) -> Result<WebhookChannel> {
        Ok(WebhookChannel {
            url: required_in(&self.url, Self::BLOCK, "url")?,
            events: self.events.clone().unwrap_or_default(),
        })
    }
}

impl Reconcile for Webhook {
    fn merge(self, fresh: Self) -> Self {
        Self {
            events: merge_collection(self.events, fresh.events),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<Email>,
    pub slack: Option<Slack>,
    pub webhook: Option<Webhook>,
}

impl ChannelModel {
    pub fn from_api(channel: Channel) -> Result<Self> {
        let mut model = Self {
            id: Some(channel.id),
            name: Some(channel.name),
            ..Self::default()
        };
        match channel.kind {
            ChannelKind::Email(c) => model.email = Some(Email::from_api(c)),
            ChannelKind::Slack(c) => model.slack = Some(Slack::from_api(c)),
            ChannelKind::Webhook(c) => model.webhook = Some(Webhook::from_api(c)),
            ChannelKind::Unsupported(type_name) => {
                return Err(ModelError::Unsupported {
                    kind: "channel",
                    type_name,
                })
            }
        }
        Ok(model)
    }

    pub fn to_api(&self) -> Result<Channel> {
        check_variants(
            VARIANTS,
            &[
                self.email.is_some(),
                self.slack.is_some(),
                self.webhook.is_some(),
            ],
        )?;

        let kind = match (&self.email, &self.slack, &self.webhook) {
            (Some(c), _, _) => ChannelKind::Email(c.to_api()),
            (_, Some(c), _) => ChannelKind::Slack(c.to_api()?),
            (_, _, Some(c)) => ChannelKind::Webhook(c.to_api()?),
            _ => {
                return Err(ModelError::VariantCount {
                    expected: VARIANTS,
                    count: 0,
                })
            }
        };

        Ok(Channel {
            id: self.id.clone().unwrap_or_default(),
            name: required(&self.name, "name")?,
            kind,
        })
    }
}

impl Reconcile for ChannelModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            id: fresh.id,
            name: fresh.name,
            email: merge_block(self.email, fresh.email),
            slack: merge_block(self.slack, fresh.slack),
            webhook: merge_block(self.webhook, fresh.webhook),
        }
    }
}

#[async_trait]
impl Model for ChannelModel {
    const TYPE_NAME: &'static str = "mackerel_channel";

    fn resource_schema(validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel notification channel")
            .attribute(id_attribute("The channel ID"))
            .attribute(replaced(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The channel name")
                    .required(),
            ))
            .block(Email::schema())
            .block(Slack::schema())
            .block(Webhook::schema(validators))
            .config_validator(ExactlyOneOf::create(VARIANTS))
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        Ok(Self {
            id: f.string("id")?,
            name: f.string("name")?,
            email: f.block(Email::BLOCK, Email::read)?,
            slack: f.block(Slack::BLOCK, Slack::read)?,
            webhook: f.block(Webhook::BLOCK, Webhook::read)?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("name"), self.name.clone())?;
        set_block(&mut v, Email::BLOCK, &self.email, Email::write)?;
        set_block(&mut v, Slack::BLOCK, &self.slack, Slack::write)?;
        set_block(&mut v, Webhook::BLOCK, &self.webhook, Webhook::write)?;
        Ok(v)
    }

    fn replace_blocks() -> &'static [&'static str] {
        VARIANTS
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.channels().create(&self.to_api()?).await?;
        tracing::info!("Created channel {} ({})", created.name, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let channel = client.channels().find(&required(&self.id, "id")?).await?;
        Self::from_api(channel)
    }

    /// Every change forces replacement, so there is nothing to send
    async fn update(&mut self, _client: &Client) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        client.channels().delete(&required(&self.id, "id")?).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for ChannelModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a Mackerel notification channel by ID",
        )
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Self::from_api(client.channels().find(&id).await?)
    }
}
