//! Scheduled downtime model

use async_trait::async_trait;
use tfplug::schema::{AttributeType, NestedBlock, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::NumberRangeValidator;

use super::{
    attr, choice_attr, id_attribute, into_lookup_schema, memo_attribute, optional_attr, required,
    required_attr, required_in, set_block, DataSourceModel, Fields, Model, Result,
};
use crate::api::downtimes::{Downtime, DowntimeRecurrence};
use crate::api::Client;
use crate::reconcile::{merge_block, merge_collection, Reconcile};
use crate::scope::normalize_scopes;
use crate::validators::Validators;

const RECURRENCE_TYPES: &[&str] = &["hourly", "daily", "weekly", "monthly", "yearly"];
const WEEKDAYS: &[&str] = &[
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// The six `*_scopes` attributes, in schema order
const SCOPES: [&str; 6] = [
    "service_scopes",
    "service_exclude_scopes",
    "role_scopes",
    "role_exclude_scopes",
    "monitor_scopes",
    "monitor_exclude_scopes",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recurrence {
    pub recurrence_type: Option<String>,
    pub interval: Option<i64>,
    pub weekdays: Option<Vec<String>>,
    pub until: Option<i64>,
}

impl Recurrence {
    const BLOCK: &'static str = "recurrence";

    fn schema() -> NestedBlock {
        let mut recurrence_type = choice_attr("type", RECURRENCE_TYPES, "How the downtime repeats");
        recurrence_type.required = true;
        recurrence_type.optional = false;

        let mut weekdays = choice_attr("weekdays", WEEKDAYS, "Days of week for weekly recurrence");
        weekdays.r#type = AttributeType::set_of_strings();

        let mut interval = required_attr("interval", AttributeType::Number, "Repeat interval");
        interval.validators.push(NumberRangeValidator::at_least(1.0));

        NestedBlockBuilder::new(Self::BLOCK)
            .description("Repetition of the downtime")
            .single()
            .attribute(recurrence_type)
            .attribute(interval)
            .attribute(weekdays)
            .attribute(optional_attr(
                "until",
                AttributeType::Number,
                "Epoch seconds after which the downtime stops repeating",
            ))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            recurrence_type: f.choice("type", RECURRENCE_TYPES)?,
            interval: f.i64("interval")?,
            weekdays: f.strings("weekdays")?,
            until: f.i64("until")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("type"), self.recurrence_type.clone())?;
        v.set_i64_opt(&attr("interval"), self.interval)?;
        v.set_string_list_opt(&attr("weekdays"), self.weekdays.clone())?;
        v.set_i64_opt(&attr("until"), self.until)?;
        Ok(())
    }

    fn from_api(r: DowntimeRecurrence) -> Self {
        Self {
            recurrence_type: Some(r.recurrence_type),
            interval: Some(r.interval),
            weekdays: Some(r.weekdays),
            until: r.until,
        }
    }

    fn to_api(&self) -> Result<DowntimeRecurrence> {
        Ok(DowntimeRecurrence {
            recurrence_type: required_in(&self.recurrence_type, Self::BLOCK, "type")?,
            interval: required_in(&self.interval, Self::BLOCK, "interval")?,
            weekdays: self.weekdays.clone().unwrap_or_default(),
            until: self.until,
        })
    }
}

impl Reconcile for Recurrence {
    fn merge(self, fresh: Self) -> Self {
        Self {
            weekdays: merge_collection(self.weekdays, fresh.weekdays),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DowntimeModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub start: Option<i64>,
    pub duration: Option<i64>,
    pub recurrence: Option<Recurrence>,
    /// Indexed like [`SCOPES`]
    pub scopes: [Option<Vec<String>>; 6],
}

impl DowntimeModel {
    pub fn from_api(downtime: Downtime) -> Self {
        Self {
            id: Some(downtime.id),
            name: Some(downtime.name),
            memo: Some(downtime.memo),
            start: Some(downtime.start),
            duration: Some(downtime.duration),
            recurrence: downtime.recurrence.map(Recurrence::from_api),
            scopes: [
                Some(downtime.service_scopes),
                Some(downtime.service_exclude_scopes),
                Some(normalize_scopes(&downtime.role_scopes)),
                Some(normalize_scopes(&downtime.role_exclude_scopes)),
                Some(downtime.monitor_scopes),
                Some(downtime.monitor_exclude_scopes),
            ],
        }
    }

    pub fn to_api(&self) -> Result<Downtime> {
        let [
            service_scopes,
            service_exclude_scopes,
            role_scopes,
            role_exclude_scopes,
            monitor_scopes,
            monitor_exclude_scopes,
        ] = self.scopes.clone().map(Option::unwrap_or_default);
        Ok(Downtime {
            id: self.id.clone().unwrap_or_default(),
            name: required(&self.name, "name")?,
            memo: self.memo.clone().unwrap_or_default(),
            start: required(&self.start, "start")?,
            duration: required(&self.duration, "duration")?,
            recurrence: self.recurrence.as_ref().map(Recurrence::to_api).transpose()?,
            service_scopes,
            service_exclude_scopes,
            role_scopes,
            role_exclude_scopes,
            monitor_scopes,
            monitor_exclude_scopes,
        })
    }
}

impl Reconcile for DowntimeModel {
    fn merge(self, fresh: Self) -> Self {
        let mut old_scopes = self.scopes.into_iter();
        let scopes = fresh
            .scopes
            .map(|fresh| merge_collection(old_scopes.next().flatten(), fresh));
        Self {
            recurrence: merge_block(self.recurrence, fresh.recurrence),
            scopes,
            ..fresh
        }
    }
}

#[async_trait]
impl Model for DowntimeModel {
    const TYPE_NAME: &'static str = "mackerel_downtime";

    fn resource_schema(_validators: &Validators) -> Schema {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a scheduled Mackerel downtime")
            .attribute(id_attribute("The downtime ID"))
            .attribute(required_attr("name", AttributeType::String, "The downtime name"))
            .attribute(memo_attribute())
            .attribute(required_attr(
                "start",
                AttributeType::Number,
                "Start as epoch seconds",
            ))
            .attribute(required_attr(
                "duration",
                AttributeType::Number,
                "Length in minutes",
            ))
            .block(Recurrence::schema());
        for name in SCOPES {
            builder = builder.attribute(optional_attr(
                name,
                AttributeType::set_of_strings(),
                "Scopes the downtime applies to or excludes",
            ));
        }
        builder.build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        let mut scopes: [Option<Vec<String>>; 6] = Default::default();
        for (slot, name) in scopes.iter_mut().zip(SCOPES) {
            *slot = f.strings(name)?;
        }
        Ok(Self {
            id: f.string("id")?,
            name: f.string("name")?,
            memo: f.string("memo")?,
            start: f.i64("start")?,
            duration: f.i64("duration")?,
            recurrence: f.block(Recurrence::BLOCK, Recurrence::read)?,
            scopes,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("name"), self.name.clone())?;
        v.set_string_opt(&attr("memo"), self.memo.clone())?;
        v.set_i64_opt(&attr("start"), self.start)?;
        v.set_i64_opt(&attr("duration"), self.duration)?;
        set_block(&mut v, Recurrence::BLOCK, &self.recurrence, Recurrence::write)?;
        for (name, scopes) in SCOPES.iter().zip(&self.scopes) {
            v.set_string_list_opt(&attr(name), scopes.clone())?;
        }
        Ok(v)
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.downtimes().create(&self.to_api()?).await?;
        tracing::info!("Created downtime {} ({})", created.name, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let id = required(&self.id, "id")?;
        Ok(Self::from_api(client.downtimes().find(&id).await?))
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.downtimes().update(&id, &self.to_api()?).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        client.downtimes().delete(&required(&self.id, "id")?).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for DowntimeModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a scheduled Mackerel downtime by ID",
        )
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Ok(Self::from_api(client.downtimes().find(&id).await?))
    }
}
