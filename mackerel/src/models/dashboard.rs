//! Custom dashboard model
//!
//! Widgets are grouped into one block list per widget type. The API keeps
//! a single ordered list, so a round trip orders widgets by type.

use async_trait::async_trait;
use tfplug::schema::{
    Attribute, AttributeType, NestedBlock, NestedBlockBuilder, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, DynamicValue};

use super::{
    attr, id_attribute, into_lookup_schema, memo_attribute, non_empty, optional_attr, required,
    required_attr, set_blocks, DataSourceModel, Fields, Model, ModelError, Result,
};
use crate::api::dashboards::{
    Dashboard, GraphRange, GraphSource, Layout, MetricSource, Widget, WidgetBody,
};
use crate::api::Client;
use crate::reconcile::{merge_collection, Reconcile};
use crate::validators::Validators;

const GRAPH_SOURCES: &[&str] = &["host", "role", "service", "expression", "query"];
const METRIC_SOURCES: &[&str] = &["host", "service", "expression", "query"];
const RANGES: &[&str] = &["relative", "absolute"];

fn need<T: Clone>(value: &Option<T>, path: AttributePath) -> Result<T> {
    value.clone().ok_or(ModelError::Missing(path))
}

fn number(name: &str, description: &str) -> Attribute {
    required_attr(name, AttributeType::Number, description)
}

fn string(name: &str, description: &str) -> Attribute {
    required_attr(name, AttributeType::String, description)
}

/// Reads at most one of the single blocks named in `names`
fn one_of<T>(
    f: &Fields<'_>,
    names: &'static [&'static str],
    mut read: impl FnMut(&str, Fields<'_>) -> Result<T>,
) -> Result<Option<T>> {
    let mut found = Vec::new();
    for name in names {
        if let Some(item) = f.block(name, |b| read(name, b))? {
            found.push(item);
        }
    }
    if found.len() > 1 {
        return Err(ModelError::VariantCount {
            expected: names,
            count: found.len(),
        });
    }
    Ok(found.pop())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutModel {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl LayoutModel {
    fn schema() -> NestedBlock {
        NestedBlockBuilder::new("layout")
            .description("Position and size of the widget on a 24 column grid")
            .single()
            .min_items(1)
            .attribute(number("x", "Column of the top left corner"))
            .attribute(number("y", "Row of the top left corner"))
            .attribute(number("width", "Width in columns"))
            .attribute(number("height", "Height in rows"))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            x: f.i64("x")?,
            y: f.i64("y")?,
            width: f.i64("width")?,
            height: f.i64("height")?,
        })
    }

    fn write(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_i64_opt(&attr("x"), self.x)?;
        v.set_i64_opt(&attr("y"), self.y)?;
        v.set_i64_opt(&attr("width"), self.width)?;
        v.set_i64_opt(&attr("height"), self.height)?;
        Ok(v)
    }

    fn from_api(layout: Layout) -> Self {
        Self {
            x: Some(layout.x),
            y: Some(layout.y),
            width: Some(layout.width),
            height: Some(layout.height),
        }
    }

    fn to_api(&self, base: &AttributePath) -> Result<Layout> {
        let at = |name: &str| base.clone().attribute(name);
        Ok(Layout {
            x: need(&self.x, at("x"))?,
            y: need(&self.y, at("y"))?,
            width: need(&self.width, at("width"))?,
            height: need(&self.height, at("height"))?,
        })
    }
}

/// Title and layout shared by every widget
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetHeader {
    pub title: Option<String>,
    pub layout: Option<LayoutModel>,
}

impl WidgetHeader {
    fn attach(builder: NestedBlockBuilder) -> NestedBlockBuilder {
        builder
            .attribute(string("title", "Widget title"))
            .block(LayoutModel::schema())
    }

    fn read(f: &Fields<'_>) -> Result<Self> {
        Ok(Self {
            title: f.string("title")?,
            layout: f.block("layout", LayoutModel::read)?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        v.set_string_opt(&attr("title"), self.title.clone())?;
        let layout = self.layout.as_ref().map(LayoutModel::write).transpose()?;
        v.set_block(&attr("layout"), layout)?;
        Ok(())
    }

    fn from_api(title: String, layout: Layout) -> Self {
        Self {
            title: Some(title),
            layout: Some(LayoutModel::from_api(layout)),
        }
    }

    fn to_api(&self, base: &AttributePath, body: WidgetBody) -> Result<Widget> {
        let layout_path = base.clone().attribute("layout").index(0);
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| ModelError::Missing(base.clone().attribute("layout")))?
            .to_api(&layout_path)?;
        Ok(Widget {
            title: need(&self.title, base.clone().attribute("title"))?,
            layout,
            body,
        })
    }
}

/// What a graph or value widget shows
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Host {
        host_id: Option<String>,
        name: Option<String>,
    },
    Role {
        role_fullname: Option<String>,
        name: Option<String>,
        is_stacked: Option<bool>,
    },
    Service {
        service_name: Option<String>,
        name: Option<String>,
    },
    Expression {
        expression: Option<String>,
    },
    Query {
        query: Option<String>,
        legend: Option<String>,
    },
}

impl Source {
    fn block_name(&self) -> &'static str {
        match self {
            Source::Host { .. } => "host",
            Source::Role { .. } => "role",
            Source::Service { .. } => "service",
            Source::Expression { .. } => "expression",
            Source::Query { .. } => "query",
        }
    }

    fn schemas(names: &[&str]) -> Vec<NestedBlock> {
        names
            .iter()
            .filter_map(|name| {
                let builder = NestedBlockBuilder::new(name).single();
                let builder = match *name {
                    "host" => builder
                        .description("A metric of one host")
                        .attribute(string("host_id", "The host ID"))
                        .attribute(string("name", "The metric name")),
                    "role" => builder
                        .description("A metric summed over the hosts of a role")
                        .attribute(string("role_fullname", "<service>:<role>"))
                        .attribute(string("name", "The metric name"))
                        .attribute(optional_attr(
                            "is_stacked",
                            AttributeType::Bool,
                            "Stack the host series",
                        )),
                    "service" => builder
                        .description("A service metric")
                        .attribute(string("service_name", "The service name"))
                        .attribute(string("name", "The metric name")),
                    "expression" => builder
                        .description("A graph expression")
                        .attribute(string("expression", "The expression")),
                    "query" => builder
                        .description("A metric query")
                        .attribute(string("query", "The query"))
                        .attribute(optional_attr("legend", AttributeType::String, "Legend")),
                    _ => return None,
                };
                Some(builder.build())
            })
            .collect()
    }

    fn read(name: &str, f: Fields<'_>) -> Result<Self> {
        Ok(match name {
            "host" => Source::Host {
                host_id: f.string("host_id")?,
                name: f.string("name")?,
            },
            "role" => Source::Role {
                role_fullname: f.string("role_fullname")?,
                name: f.string("name")?,
                is_stacked: f.bool("is_stacked")?,
            },
            "service" => Source::Service {
                service_name: f.string("service_name")?,
                name: f.string("name")?,
            },
            "expression" => Source::Expression {
                expression: f.string("expression")?,
            },
            _ => Source::Query {
                query: f.string("query")?,
                legend: f.string("legend")?,
            },
        })
    }

    /// Writes this source's block and empties the other `names`
    fn write(source: &Option<Self>, names: &[&str], v: &mut DynamicValue) -> Result<()> {
        for name in names {
            v.set_block(&attr(name), None)?;
        }
        let Some(source) = source else {
            return Ok(());
        };

        let mut element = DynamicValue::object();
        match source {
            Source::Host { host_id, name } => {
                element.set_string_opt(&attr("host_id"), host_id.clone())?;
                element.set_string_opt(&attr("name"), name.clone())?;
            }
            Source::Role {
                role_fullname,
                name,
                is_stacked,
            } => {
                element.set_string_opt(&attr("role_fullname"), role_fullname.clone())?;
                element.set_string_opt(&attr("name"), name.clone())?;
                element.set_bool_opt(&attr("is_stacked"), *is_stacked)?;
            }
            Source::Service { service_name, name } => {
                element.set_string_opt(&attr("service_name"), service_name.clone())?;
                element.set_string_opt(&attr("name"), name.clone())?;
            }
            Source::Expression { expression } => {
                element.set_string_opt(&attr("expression"), expression.clone())?;
            }
            Source::Query { query, legend } => {
                element.set_string_opt(&attr("query"), query.clone())?;
                element.set_string_opt(&attr("legend"), legend.clone())?;
            }
        }
        v.set_block(&attr(source.block_name()), Some(element))?;
        Ok(())
    }

    fn from_graph(source: GraphSource) -> Result<Self> {
        Ok(match source {
            GraphSource::Host { host_id, name } => Source::Host {
                host_id: Some(host_id),
                name: Some(name),
            },
            GraphSource::Role {
                role_fullname,
                name,
                is_stacked,
            } => Source::Role {
                role_fullname: Some(role_fullname),
                name: Some(name),
                is_stacked: Some(is_stacked),
            },
            GraphSource::Service { service_name, name } => Source::Service {
                service_name: Some(service_name),
                name: Some(name),
            },
            GraphSource::Expression { expression } => Source::Expression {
                expression: Some(expression),
            },
            GraphSource::Query { query, legend } => Source::Query {
                query: Some(query),
                legend: non_empty(legend),
            },
            GraphSource::Unknown => {
                return Err(ModelError::Unsupported {
                    kind: "graph",
                    type_name: "unknown".to_string(),
                })
            }
        })
    }

    fn from_metric(source: MetricSource) -> Result<Self> {
        Ok(match source {
            MetricSource::Host { host_id, name } => Source::Host {
                host_id: Some(host_id),
                name: Some(name),
            },
            MetricSource::Service { service_name, name } => Source::Service {
                service_name: Some(service_name),
                name: Some(name),
            },
            MetricSource::Expression { expression } => Source::Expression {
                expression: Some(expression),
            },
            MetricSource::Query { query, legend } => Source::Query {
                query: Some(query),
                legend: non_empty(legend),
            },
            MetricSource::Unknown => {
                return Err(ModelError::Unsupported {
                    kind: "metric",
                    type_name: "unknown".to_string(),
                })
            }
        })
    }

    fn to_graph(&self, base: &AttributePath) -> Result<GraphSource> {
        let at = |name: &str| base.clone().attribute(self.block_name()).index(0).attribute(name);
        Ok(match self {
            Source::Host { host_id, name } => GraphSource::Host {
                host_id: need(host_id, at("host_id"))?,
                name: need(name, at("name"))?,
            },
            Source::Role {
                role_fullname,
                name,
                is_stacked,
            } => GraphSource::Role {
                role_fullname: need(role_fullname, at("role_fullname"))?,
                name: need(name, at("name"))?,
                is_stacked: is_stacked.unwrap_or(false),
            },
            Source::Service { service_name, name } => GraphSource::Service {
                service_name: need(service_name, at("service_name"))?,
                name: need(name, at("name"))?,
            },
            Source::Expression { expression } => GraphSource::Expression {
                expression: need(expression, at("expression"))?,
            },
            Source::Query { query, legend } => GraphSource::Query {
                query: need(query, at("query"))?,
                legend: legend.clone().unwrap_or_default(),
            },
        })
    }

    fn to_metric(&self, base: &AttributePath) -> Result<MetricSource> {
        Ok(match self.to_graph(base)? {
            GraphSource::Host { host_id, name } => MetricSource::Host { host_id, name },
            GraphSource::Service { service_name, name } => {
                MetricSource::Service { service_name, name }
            }
            GraphSource::Expression { expression } => MetricSource::Expression { expression },
            GraphSource::Query { query, legend } => MetricSource::Query { query, legend },
            GraphSource::Role { .. } | GraphSource::Unknown => {
                return Err(ModelError::VariantCount {
                    expected: METRIC_SOURCES,
                    count: 0,
                })
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeModel {
    Relative {
        period: Option<i64>,
        offset: Option<i64>,
    },
    Absolute {
        start: Option<i64>,
        end: Option<i64>,
    },
}

impl RangeModel {
    fn schema() -> NestedBlock {
        NestedBlockBuilder::new("range")
            .description("Time range of the graph")
            .single()
            .block(
                NestedBlockBuilder::new("relative")
                    .single()
                    .attribute(number("period", "Length of the range in seconds"))
                    .attribute(number("offset", "Offset from now in seconds"))
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("absolute")
                    .single()
                    .attribute(number("start", "Start as epoch seconds"))
                    .attribute(number("end", "End as epoch seconds"))
                    .build(),
            )
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Option<Self>> {
        one_of(&f, RANGES, |name, b| {
            Ok(if name == "relative" {
                RangeModel::Relative {
                    period: b.i64("period")?,
                    offset: b.i64("offset")?,
                }
            } else {
                RangeModel::Absolute {
                    start: b.i64("start")?,
                    end: b.i64("end")?,
                }
            })
        })
    }

    fn write(&self) -> Result<DynamicValue> {
        let mut element = DynamicValue::object();
        let mut relative = None;
        let mut absolute = None;
        match self {
            RangeModel::Relative { period, offset } => {
                let mut v = DynamicValue::object();
                v.set_i64_opt(&attr("period"), *period)?;
                v.set_i64_opt(&attr("offset"), *offset)?;
                relative = Some(v);
            }
            RangeModel::Absolute { start, end } => {
                let mut v = DynamicValue::object();
                v.set_i64_opt(&attr("start"), *start)?;
                v.set_i64_opt(&attr("end"), *end)?;
                absolute = Some(v);
            }
        }
        element.set_block(&attr("relative"), relative)?;
        element.set_block(&attr("absolute"), absolute)?;
        Ok(element)
    }

    fn from_api(range: GraphRange) -> Self {
        match range {
            GraphRange::Relative { period, offset } => RangeModel::Relative {
                period: Some(period),
                offset: Some(offset),
            },
            GraphRange::Absolute { start, end } => RangeModel::Absolute {
                start: Some(start),
                end: Some(end),
            },
        }
    }

    fn to_api(&self, base: &AttributePath) -> Result<GraphRange> {
        let at = |block: &str, name: &str| {
            base.clone()
                .attribute("range")
                .index(0)
                .attribute(block)
                .index(0)
                .attribute(name)
        };
        Ok(match self {
            RangeModel::Relative { period, offset } => GraphRange::Relative {
                period: need(period, at("relative", "period"))?,
                offset: need(offset, at("relative", "offset"))?,
            },
            RangeModel::Absolute { start, end } => GraphRange::Absolute {
                start: need(start, at("absolute", "start"))?,
                end: need(end, at("absolute", "end"))?,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphWidget {
    pub header: WidgetHeader,
    pub source: Option<Source>,
    pub range: Option<RangeModel>,
}

impl GraphWidget {
    const BLOCK: &'static str = "graph";

    fn schema() -> NestedBlock {
        let mut builder = WidgetHeader::attach(
            NestedBlockBuilder::new(Self::BLOCK).description("Graph widget"),
        );
        for block in Source::schemas(GRAPH_SOURCES) {
            builder = builder.block(block);
        }
        builder.block(RangeModel::schema()).build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            header: WidgetHeader::read(&f)?,
            source: one_of(&f, GRAPH_SOURCES, Source::read)?,
            range: f.block("range", RangeModel::read)?.flatten(),
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        self.header.write(v)?;
        Source::write(&self.source, GRAPH_SOURCES, v)?;
        let range = self.range.as_ref().map(RangeModel::write).transpose()?;
        v.set_block(&attr("range"), range)?;
        Ok(())
    }

    fn to_api(&self, base: AttributePath) -> Result<Widget> {
        let source = self.source.as_ref().ok_or(ModelError::VariantCount {
            expected: GRAPH_SOURCES,
            count: 0,
        })?;
        let body = WidgetBody::Graph {
            graph: source.to_graph(&base)?,
            range: self.range.as_ref().map(|r| r.to_api(&base)).transpose()?,
        };
        self.header.to_api(&base, body)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueWidget {
    pub header: WidgetHeader,
    pub metric: Option<Source>,
    pub fraction_size: Option<i64>,
    pub suffix: Option<String>,
}

impl ValueWidget {
    const BLOCK: &'static str = "value";

    fn schema() -> NestedBlock {
        let mut metric = NestedBlockBuilder::new("metric")
            .description("The metric to display")
            .single()
            .min_items(1);
        for block in Source::schemas(METRIC_SOURCES) {
            metric = metric.block(block);
        }
        WidgetHeader::attach(NestedBlockBuilder::new(Self::BLOCK).description("Value widget"))
            .block(metric.build())
            .attribute(optional_attr(
                "fraction_size",
                AttributeType::Number,
                "Number of decimal places",
            ))
            .attribute(optional_attr("suffix", AttributeType::String, "Unit suffix"))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            header: WidgetHeader::read(&f)?,
            metric: f
                .block("metric", |m| one_of(&m, METRIC_SOURCES, Source::read))?
                .flatten(),
            fraction_size: f.i64("fraction_size")?,
            suffix: f.string("suffix")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        self.header.write(v)?;
        let mut metric = DynamicValue::object();
        Source::write(&self.metric, METRIC_SOURCES, &mut metric)?;
        v.set_block(&attr("metric"), Some(metric))?;
        v.set_i64_opt(&attr("fraction_size"), self.fraction_size)?;
        v.set_string_opt(&attr("suffix"), self.suffix.clone())?;
        Ok(())
    }

    fn to_api(&self, base: AttributePath) -> Result<Widget> {
        let metric = self.metric.as_ref().ok_or(ModelError::VariantCount {
            expected: METRIC_SOURCES,
            count: 0,
        })?;
        let body = WidgetBody::Value {
            metric: metric.to_metric(&base.clone().attribute("metric").index(0))?,
            fraction_size: self.fraction_size,
            suffix: self.suffix.clone(),
        };
        self.header.to_api(&base, body)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownWidget {
    pub header: WidgetHeader,
    pub markdown: Option<String>,
}

impl MarkdownWidget {
    const BLOCK: &'static str = "markdown";

    fn schema() -> NestedBlock {
        WidgetHeader::attach(NestedBlockBuilder::new(Self::BLOCK).description("Markdown widget"))
            .attribute(string("markdown", "Markdown source"))
            .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            header: WidgetHeader::read(&f)?,
            markdown: f.string("markdown")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        self.header.write(v)?;
        v.set_string_opt(&attr("markdown"), self.markdown.clone())?;
        Ok(())
    }

    fn to_api(&self, base: AttributePath) -> Result<Widget> {
        let body = WidgetBody::Markdown {
            markdown: need(&self.markdown, base.clone().attribute("markdown"))?,
        };
        self.header.to_api(&base, body)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertStatusWidget {
    pub header: WidgetHeader,
    pub role_fullname: Option<String>,
}

impl AlertStatusWidget {
    const BLOCK: &'static str = "alert_status";

    fn schema() -> NestedBlock {
        WidgetHeader::attach(
            NestedBlockBuilder::new(Self::BLOCK).description("Alert status widget"),
        )
        .attribute(string("role_fullname", "<service>:<role> whose alerts are shown"))
        .build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            header: WidgetHeader::read(&f)?,
            role_fullname: f.string("role_fullname")?,
        })
    }

    fn write(&self, v: &mut DynamicValue) -> Result<()> {
        self.header.write(v)?;
        v.set_string_opt(&attr("role_fullname"), self.role_fullname.clone())?;
        Ok(())
    }

    fn to_api(&self, base: AttributePath) -> Result<Widget> {
        let body = WidgetBody::AlertStatus {
            role_fullname: Some(need(
                &self.role_fullname,
                base.clone().attribute("role_fullname"),
            )?),
        };
        self.header.to_api(&base, body)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardModel {
    pub id: Option<String>,
    pub title: Option<String>,
    pub memo: Option<String>,
    pub url_path: Option<String>,
    pub graphs: Vec<GraphWidget>,
    pub values: Vec<ValueWidget>,
    pub markdowns: Vec<MarkdownWidget>,
    pub alert_statuses: Vec<AlertStatusWidget>,
}

impl DashboardModel {
    pub fn from_api(dashboard: Dashboard) -> Result<Self> {
        let mut model = Self {
            id: Some(dashboard.id),
            title: Some(dashboard.title),
            memo: Some(dashboard.memo),
            url_path: Some(dashboard.url_path),
            ..Self::default()
        };

        for widget in dashboard.widgets {
            let header = WidgetHeader::from_api(widget.title, widget.layout);
            match widget.body {
                WidgetBody::Graph { graph, range } => model.graphs.push(GraphWidget {
                    header,
                    source: Some(Source::from_graph(graph)?),
                    range: range.map(RangeModel::from_api),
                }),
                WidgetBody::Value {
                    metric,
                    fraction_size,
                    suffix,
                } => model.values.push(ValueWidget {
                    header,
                    metric: Some(Source::from_metric(metric)?),
                    fraction_size,
                    suffix,
                }),
                WidgetBody::Markdown { markdown } => model.markdowns.push(MarkdownWidget {
                    header,
                    markdown: Some(markdown),
                }),
                WidgetBody::AlertStatus { role_fullname } => {
                    model.alert_statuses.push(AlertStatusWidget {
                        header,
                        role_fullname,
                    })
                }
            }
        }
        Ok(model)
    }

    pub fn to_api(&self) -> Result<Dashboard> {
        let at = |block: &str, idx: usize| attr(block).index(idx as i64);
        let mut widgets = Vec::new();
        for (idx, w) in self.graphs.iter().enumerate() {
            widgets.push(w.to_api(at(GraphWidget::BLOCK, idx))?);
        }
        for (idx, w) in self.values.iter().enumerate() {
            widgets.push(w.to_api(at(ValueWidget::BLOCK, idx))?);
        }
        for (idx, w) in self.markdowns.iter().enumerate() {
            widgets.push(w.to_api(at(MarkdownWidget::BLOCK, idx))?);
        }
        for (idx, w) in self.alert_statuses.iter().enumerate() {
            widgets.push(w.to_api(at(AlertStatusWidget::BLOCK, idx))?);
        }

        Ok(Dashboard {
            id: self.id.clone().unwrap_or_default(),
            title: required(&self.title, "title")?,
            memo: self.memo.clone().unwrap_or_default(),
            url_path: required(&self.url_path, "url_path")?,
            widgets,
            created_at: None,
            updated_at: None,
        })
    }
}

impl Reconcile for DashboardModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            graphs: merge_collection(self.graphs, fresh.graphs),
            values: merge_collection(self.values, fresh.values),
            markdowns: merge_collection(self.markdowns, fresh.markdowns),
            alert_statuses: merge_collection(self.alert_statuses, fresh.alert_statuses),
            ..fresh
        }
    }
}

#[async_trait]
impl Model for DashboardModel {
    const TYPE_NAME: &'static str = "mackerel_dashboard";

    fn resource_schema(_validators: &Validators) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel custom dashboard")
            .attribute(id_attribute("The dashboard ID"))
            .attribute(string("title", "The dashboard title"))
            .attribute(memo_attribute())
            .attribute(string("url_path", "Path of the dashboard URL"))
            .block(GraphWidget::schema())
            .block(ValueWidget::schema())
            .block(MarkdownWidget::schema())
            .block(AlertStatusWidget::schema())
            .build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        Ok(Self {
            id: f.string("id")?,
            title: f.string("title")?,
            memo: f.string("memo")?,
            url_path: f.string("url_path")?,
            graphs: f.blocks(GraphWidget::BLOCK, GraphWidget::read)?,
            values: f.blocks(ValueWidget::BLOCK, ValueWidget::read)?,
            markdowns: f.blocks(MarkdownWidget::BLOCK, MarkdownWidget::read)?,
            alert_statuses: f.blocks(AlertStatusWidget::BLOCK, AlertStatusWidget::read)?,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("title"), self.title.clone())?;
        v.set_string_opt(&attr("memo"), self.memo.clone())?;
        v.set_string_opt(&attr("url_path"), self.url_path.clone())?;
        set_blocks(&mut v, GraphWidget::BLOCK, &self.graphs, GraphWidget::write)?;
        set_blocks(&mut v, ValueWidget::BLOCK, &self.values, ValueWidget::write)?;
        set_blocks(&mut v, MarkdownWidget::BLOCK, &self.markdowns, MarkdownWidget::write)?;
        set_blocks(
            &mut v,
            AlertStatusWidget::BLOCK,
            &self.alert_statuses,
            AlertStatusWidget::write,
        )?;
        Ok(v)
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.dashboards().create(&self.to_api()?).await?;
        tracing::info!("Created dashboard {} ({})", created.title, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let id = required(&self.id, "id")?;
        Self::from_api(client.dashboards().get(&id).await?)
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.dashboards().update(&id, &self.to_api()?).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        client.dashboards().delete(&required(&self.id, "id")?).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for DashboardModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a Mackerel custom dashboard by ID",
        )
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Self::from_api(client.dashboards().get(&id).await?)
    }
}
