//! AWS integration model
//!
//! Every supported AWS service is one optional block. The API expects the
//! full service map on every write, so unconfigured services are sent as
//! disabled, and only enabled services are read back into blocks.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tfplug::defaults::StaticDefault;
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, Schema, SchemaBuilder,
};
use tfplug::types::DynamicValue;

use super::{
    attr, id_attribute, into_lookup_schema, memo_attribute, non_empty, optional_attr, required,
    required_attr, set_block, DataSourceModel, Fields, Model, Result,
};
use crate::api::aws_integrations::{AwsIntegration, AwsIntegrationService};
use crate::api::Client;
use crate::reconcile::{merge_block, merge_collection, Reconcile};
use crate::validators::Validators;

/// A supported AWS service: block name, API key and whether the API
/// accepts `retireAutomatically` for it
pub struct AwsService {
    pub block: &'static str,
    pub api_name: &'static str,
    pub retire_automatically: bool,
}

const fn service(block: &'static str, api_name: &'static str, retire: bool) -> AwsService {
    AwsService {
        block,
        api_name,
        retire_automatically: retire,
    }
}

pub const AWS_SERVICES: &[AwsService] = &[
    service("ec2", "EC2", true),
    service("elb", "ELB", false),
    service("alb", "ALB", false),
    service("nlb", "NLB", false),
    service("rds", "RDS", true),
    service("redshift", "Redshift", false),
    service("elasticache", "ElastiCache", true),
    service("sqs", "SQS", false),
    service("lambda", "Lambda", false),
    service("dynamodb", "DynamoDB", false),
    service("cloudfront", "CloudFront", false),
    service("api_gateway", "APIGateway", false),
    service("kinesis", "Kinesis", false),
    service("s3", "S3", false),
    service("es", "ES", false),
    service("ecs_cluster", "ECSCluster", false),
    service("ses", "SES", false),
    service("states", "States", false),
    service("efs", "EFS", false),
    service("firehose", "Firehose", false),
    service("batch", "Batch", false),
    service("waf", "WAF", false),
    service("billing", "Billing", false),
    service("route53", "Route 53", false),
    service("connect", "Connect", false),
    service("docdb", "DocDB", false),
    service("codebuild", "CodeBuild", false),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwsServiceModel {
    pub enable: Option<bool>,
    pub role: Option<String>,
    pub excluded_metrics: Option<Vec<String>>,
    pub retire_automatically: Option<bool>,
}

impl AwsServiceModel {
    fn schema(service: &AwsService) -> NestedBlock {
        let mut builder = NestedBlockBuilder::new(service.block)
            .description(&format!("Integration settings for {}", service.api_name))
            .single()
            .attribute(
                AttributeBuilder::new("enable", AttributeType::Bool)
                    .description("Whether metrics are collected")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(optional_attr(
                "role",
                AttributeType::String,
                "<service>:<role> the hosts are assigned to",
            ))
            .attribute(optional_attr(
                "excluded_metrics",
                AttributeType::set_of_strings(),
                "Metric names that are not collected",
            ));
        if service.retire_automatically {
            builder = builder.attribute(optional_attr(
                "retire_automatically",
                AttributeType::Bool,
                "Retire hosts whose resource was deleted",
            ));
        }
        builder.build()
    }

    fn read(f: Fields<'_>) -> Result<Self> {
        Ok(Self {
            enable: f.bool("enable")?,
            role: f.string("role")?,
            excluded_metrics: f.strings("excluded_metrics")?,
            retire_automatically: f.bool("retire_automatically")?,
        })
    }

    fn writer(service: &AwsService) -> impl Fn(&Self, &mut DynamicValue) -> Result<()> + '_ {
        move |model, v| {
            v.set_bool_opt(&attr("enable"), model.enable)?;
            v.set_string_opt(&attr("role"), model.role.clone())?;
            v.set_string_list_opt(&attr("excluded_metrics"), model.excluded_metrics.clone())?;
            if service.retire_automatically {
                v.set_bool_opt(&attr("retire_automatically"), model.retire_automatically)?;
            }
            Ok(())
        }
    }

    fn from_api(service: &AwsService, api: AwsIntegrationService) -> Self {
        Self {
            enable: Some(api.enable),
            role: api.role.and_then(non_empty),
            excluded_metrics: Some(api.excluded_metrics),
            retire_automatically: if service.retire_automatically {
                Some(api.retire_automatically.unwrap_or(false))
            } else {
                None
            },
        }
    }

    fn to_api(&self, service: &AwsService) -> AwsIntegrationService {
        AwsIntegrationService {
            enable: self.enable.unwrap_or(true),
            role: self.role.clone(),
            excluded_metrics: self.excluded_metrics.clone().unwrap_or_default(),
            retire_automatically: if service.retire_automatically {
                Some(self.retire_automatically.unwrap_or(false))
            } else {
                None
            },
        }
    }

    fn disabled(service: &AwsService) -> AwsIntegrationService {
        Self {
            enable: Some(false),
            ..Self::default()
        }
        .to_api(service)
    }
}

impl Reconcile for AwsServiceModel {
    fn merge(self, fresh: Self) -> Self {
        Self {
            excluded_metrics: merge_collection(self.excluded_metrics, fresh.excluded_metrics),
            ..fresh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwsIntegrationModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub key: Option<String>,
    pub secret_key: Option<String>,
    pub role_arn: Option<String>,
    pub external_id: Option<String>,
    pub region: Option<String>,
    pub included_tags: Option<String>,
    pub excluded_tags: Option<String>,
    /// Keyed by block name
    pub services: BTreeMap<&'static str, AwsServiceModel>,
}

impl AwsIntegrationModel {
    pub fn from_api(mut integration: AwsIntegration) -> Self {
        let services = AWS_SERVICES
            .iter()
            .filter_map(|service| {
                let api = integration.services.remove(service.api_name)?;
                api.enable
                    .then(|| (service.block, AwsServiceModel::from_api(service, api)))
            })
            .collect();

        Self {
            id: Some(integration.id),
            name: Some(integration.name),
            memo: Some(integration.memo),
            key: integration.key.and_then(non_empty),
            secret_key: None,
            role_arn: integration.role_arn.and_then(non_empty),
            external_id: integration.external_id.and_then(non_empty),
            region: Some(integration.region),
            included_tags: Some(integration.included_tags),
            excluded_tags: Some(integration.excluded_tags),
            services,
        }
    }

    pub fn to_api(&self) -> Result<AwsIntegration> {
        let services = AWS_SERVICES
            .iter()
            .map(|service| {
                let api = match self.services.get(service.block) {
                    Some(model) => model.to_api(service),
                    None => AwsServiceModel::disabled(service),
                };
                (service.api_name.to_string(), api)
            })
            .collect();

        Ok(AwsIntegration {
            id: self.id.clone().unwrap_or_default(),
            name: required(&self.name, "name")?,
            memo: self.memo.clone().unwrap_or_default(),
            key: self.key.clone(),
            secret_key: self.secret_key.clone(),
            role_arn: self.role_arn.clone(),
            external_id: self.external_id.clone(),
            region: required(&self.region, "region")?,
            included_tags: self.included_tags.clone().unwrap_or_default(),
            excluded_tags: self.excluded_tags.clone().unwrap_or_default(),
            services,
        })
    }
}

impl Reconcile for AwsIntegrationModel {
    fn merge(mut self, mut fresh: Self) -> Self {
        let services = AWS_SERVICES
            .iter()
            .filter_map(|service| {
                merge_block(
                    self.services.remove(service.block),
                    fresh.services.remove(service.block),
                )
                .map(|merged| (service.block, merged))
            })
            .collect();

        Self {
            // never returned by the API
            secret_key: self.secret_key,
            services,
            ..fresh
        }
    }
}

#[async_trait]
impl Model for AwsIntegrationModel {
    const TYPE_NAME: &'static str = "mackerel_aws_integration";

    fn resource_schema(validators: &Validators) -> Schema {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a Mackerel AWS integration")
            .attribute(id_attribute("The AWS integration ID"))
            .attribute(required_attr("name", AttributeType::String, "The integration name"))
            .attribute(memo_attribute())
            .attribute(optional_attr("key", AttributeType::String, "AWS access key ID"))
            .attribute(
                AttributeBuilder::new("secret_key", AttributeType::String)
                    .description("AWS secret access key")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role_arn", AttributeType::String)
                    .description("IAM role assumed by Mackerel")
                    .optional()
                    .validator(validators.role_arn())
                    .build(),
            )
            .attribute(optional_attr(
                "external_id",
                AttributeType::String,
                "External ID required by the role's trust policy",
            ))
            .attribute(required_attr("region", AttributeType::String, "AWS region"))
            .attribute(
                AttributeBuilder::new("included_tags", AttributeType::String)
                    .description("Only resources with these tags are monitored")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(""))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("excluded_tags", AttributeType::String)
                    .description("Resources with these tags are not monitored")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(""))
                    .build(),
            );
        for service in AWS_SERVICES {
            builder = builder.block(AwsServiceModel::schema(service));
        }
        builder.build()
    }

    fn from_value(value: &DynamicValue) -> Result<Self> {
        let f = Fields::new(value);
        let mut services = BTreeMap::new();
        for service in AWS_SERVICES {
            if let Some(model) = f.block(service.block, AwsServiceModel::read)? {
                services.insert(service.block, model);
            }
        }

        Ok(Self {
            id: f.string("id")?,
            name: f.string("name")?,
            memo: f.string("memo")?,
            key: f.string("key")?,
            secret_key: f.string("secret_key")?,
            role_arn: f.string("role_arn")?,
            external_id: f.string("external_id")?,
            region: f.string("region")?,
            included_tags: f.string("included_tags")?,
            excluded_tags: f.string("excluded_tags")?,
            services,
        })
    }

    fn to_value(&self) -> Result<DynamicValue> {
        let mut v = DynamicValue::object();
        v.set_string_opt(&attr("id"), self.id.clone())?;
        v.set_string_opt(&attr("name"), self.name.clone())?;
        v.set_string_opt(&attr("memo"), self.memo.clone())?;
        v.set_string_opt(&attr("key"), self.key.clone())?;
        v.set_string_opt(&attr("secret_key"), self.secret_key.clone())?;
        v.set_string_opt(&attr("role_arn"), self.role_arn.clone())?;
        v.set_string_opt(&attr("external_id"), self.external_id.clone())?;
        v.set_string_opt(&attr("region"), self.region.clone())?;
        v.set_string_opt(&attr("included_tags"), self.included_tags.clone())?;
        v.set_string_opt(&attr("excluded_tags"), self.excluded_tags.clone())?;
        for service in AWS_SERVICES {
            let model = self.services.get(service.block).cloned();
            set_block(&mut v, service.block, &model, AwsServiceModel::writer(service))?;
        }
        Ok(v)
    }

    async fn create(&mut self, client: &Client) -> Result<()> {
        let created = client.aws_integrations().create(&self.to_api()?).await?;
        tracing::info!("Created AWS integration {} ({})", created.name, created.id);
        self.id = Some(created.id);
        Ok(())
    }

    async fn read(&self, client: &Client) -> Result<Self> {
        let id = required(&self.id, "id")?;
        Ok(Self::from_api(client.aws_integrations().get(&id).await?))
    }

    async fn update(&mut self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.aws_integrations().update(&id, &self.to_api()?).await?;
        Ok(())
    }

    async fn delete(&self, client: &Client) -> Result<()> {
        let id = required(&self.id, "id")?;
        client.aws_integrations().delete(&id).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSourceModel for AwsIntegrationModel {
    fn data_source_schema(validators: &Validators) -> Schema {
        let mut schema = into_lookup_schema(
            Self::resource_schema(validators),
            &["id"],
            "Looks up a Mackerel AWS integration by ID",
        );
        schema.block.attributes.retain(|a| a.name != "secret_key");
        schema
    }

    async fn lookup(config: &DynamicValue, client: &Client) -> Result<Self> {
        let id = required(&Fields::new(config).string("id")?, "id")?;
        Ok(Self::from_api(client.aws_integrations().get(&id).await?))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn model() -> AwsIntegrationModel {
        AwsIntegrationModel {
            id: Some("aws1".to_string()),
            name: Some("prod".to_string()),
            memo: Some(String::new()),
            role_arn: Some("arn:aws:iam::123456789012:role/mackerel".to_string()),
            external_id: Some("ext".to_string()),
            region: Some("ap-northeast-1".to_string()),
            included_tags: Some(String::new()),
            excluded_tags: Some(String::new()),
            services: BTreeMap::from([
                (
                    "ec2",
                    AwsServiceModel {
                        enable: Some(true),
                        role: Some("web:app".to_string()),
                        excluded_metrics: None,
                        retire_automatically: Some(true),
                    },
                ),
                (
                    "route53",
                    AwsServiceModel {
                        enable: Some(true),
                        role: None,
                        excluded_metrics: Some(vec!["route53.health".to_string()]),
                        retire_automatically: None,
                    },
                ),
            ]),
            ..AwsIntegrationModel::default()
        }
    }

    #[test]
    fn payload_lists_every_service() {
        let api = model().to_api().unwrap();
        assert_eq!(api.services.len(), AWS_SERVICES.len());
        assert!(api.services["EC2"].enable);
        assert_eq!(api.services["EC2"].retire_automatically, Some(true));
        assert!(api.services["Route 53"].enable);
        assert!(!api.services["SQS"].enable);
        assert_eq!(api.services["SQS"].retire_automatically, None);
        assert_eq!(api.services["RDS"].retire_automatically, Some(false));
    }

    #[test]
    fn only_enabled_services_are_read_back() {
        let fresh = AwsIntegrationModel::from_api(model().to_api().unwrap());
        let blocks: Vec<_> = fresh.services.keys().copied().collect();
        assert_eq!(blocks, vec!["ec2", "route53"]);
    }

    #[test]
    fn refresh_keeps_secret_and_null_metric_lists() {
        let stored = AwsIntegrationModel {
            key: Some("AKIA".to_string()),
            secret_key: Some("s3cret".to_string()),
            role_arn: None,
            external_id: None,
            ..model()
        };
        let fresh = AwsIntegrationModel::from_api(stored.to_api().unwrap());
        assert_eq!(fresh.secret_key, None);

        let merged = stored.clone().merge(fresh);
        assert_eq!(merged, stored);
    }

    #[test]
    fn state_round_trip() {
        let model = model();
        let again = AwsIntegrationModel::from_value(&model.to_value().unwrap()).unwrap();
        assert_eq!(again, model);
    }

    #[test]
    fn data_source_hides_secret() {
        let schema = AwsIntegrationModel::data_source_schema(&Validators::new().unwrap());
        assert!(schema.attribute("secret_key").is_none());
        assert!(schema.nested_block("codebuild").is_some());
    }
}
