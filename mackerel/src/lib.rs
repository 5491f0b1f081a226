//! Terraform provider for Mackerel
//!
//! `MackerelProvider` implements the tfplug `Provider` trait. Configuration
//! builds one API client that every resource and data source receives
//! through [`MackerelProviderData`].

pub mod api;
pub mod data_sources;
pub mod ids;
pub mod models;
pub mod provider_data;
pub mod reconcile;
pub mod resources;
pub mod scope;
pub mod typeutil;
pub mod validators;

pub use provider_data::MackerelProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue, ServerCapabilities};

use crate::validators::Validators;

/// Checked in order when `api_key` is not configured
pub const API_KEY_ENV_VARS: &[&str] = &["MACKEREL_APIKEY", "MACKEREL_API_KEY"];

pub const API_BASE_ENV_VAR: &str = "API_BASE";

pub struct MackerelProvider {
    validators: Arc<Validators>,
}

impl MackerelProvider {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            validators: Arc::new(Validators::new()?),
        })
    }

    fn provider_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provider for the Mackerel monitoring service")
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description(
                        "Mackerel API key. Defaults to MACKEREL_APIKEY or MACKEREL_API_KEY",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_base", AttributeType::String)
                    .description("Mackerel API base URL. Defaults to API_BASE")
                    .optional()
                    .build(),
            )
            .build()
    }

    /// Configured value first, then the environment
    fn setting(config: &DynamicValue, name: &str, env_vars: &[&str]) -> Option<String> {
        config
            .get_string_opt(&AttributePath::new(name))
            .ok()
            .flatten()
            .filter(|value| !value.is_empty())
            .or_else(|| {
                env_vars
                    .iter()
                    .filter_map(|var| std::env::var(var).ok())
                    .find(|value| !value.is_empty())
            })
    }
}

#[async_trait]
impl Provider for MackerelProvider {
    fn type_name(&self) -> &str {
        "mackerel"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::provider_schema(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = vec![];

        let api_key = Self::setting(&request.config, "api_key", API_KEY_ENV_VARS);
        let api_base = Self::setting(&request.config, "api_base", &[API_BASE_ENV_VAR])
            .unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string());

        let Some(api_key) = api_key else {
            diagnostics.push(
                Diagnostic::error(
                    "Missing API key",
                    "api_key is required (set in provider config or MACKEREL_APIKEY env var)",
                )
                .with_attribute(AttributePath::new("api_key")),
            );
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        match api::Client::new(&api_base, &api_key) {
            Ok(client) => {
                tracing::info!("Configured Mackerel provider for {}", client.base_url());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(MackerelProviderData::new(client))),
                }
            }
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Failed to create API client", e.to_string())
                        .with_attribute(AttributePath::new("api_base")),
                );
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = Self::provider_schema().validate(&request.config);

        if let Ok(Some(api_base)) = request.config.get_string_opt(&AttributePath::new("api_base")) {
            if let Err(e) = url::Url::parse(&api_base) {
                diagnostics.push(
                    Diagnostic::error("Invalid api_base", format!("{}: {}", api_base, e))
                        .with_attribute(AttributePath::new("api_base")),
                );
            }
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        resources::factories(&self.validators)
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        data_sources::factories(&self.validators)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::ClientCapabilities;

    fn configure_request(config: DynamicValue) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    fn clear_env() {
        for var in API_KEY_ENV_VARS.iter().chain([&API_BASE_ENV_VAR]) {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    #[serial]
    async fn configure_with_explicit_key() {
        clear_env();
        let mut provider = MackerelProvider::new().unwrap();
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("api_key"), "secret".to_string())
            .unwrap();

        let response = provider
            .configure(Context::new(), configure_request(config))
            .await;

        assert!(response.diagnostics.is_empty());
        let data = response.provider_data.unwrap();
        let data = data.downcast_ref::<MackerelProviderData>().unwrap();
        assert_eq!(data.client.base_url(), "https://api.mackerelio.com");
    }

    #[tokio::test]
    #[serial]
    async fn configure_falls_back_to_environment() {
        clear_env();
        std::env::set_var("MACKEREL_API_KEY", "from-env");
        std::env::set_var("API_BASE", "http://localhost:8080/");

        let mut provider = MackerelProvider::new().unwrap();
        let response = provider
            .configure(Context::new(), configure_request(DynamicValue::object()))
            .await;

        assert!(response.diagnostics.is_empty());
        let data = response.provider_data.unwrap();
        let data = data.downcast_ref::<MackerelProviderData>().unwrap();
        assert_eq!(data.client.base_url(), "http://localhost:8080");
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn missing_key_is_reported() {
        clear_env();
        let mut provider = MackerelProvider::new().unwrap();
        let response = provider
            .configure(Context::new(), configure_request(DynamicValue::object()))
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Missing API key");
    }

    #[tokio::test]
    #[serial]
    async fn invalid_base_url_is_reported() {
        clear_env();
        let mut provider = MackerelProvider::new().unwrap();
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("api_key"), "secret".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("api_base"), "ftp://example".to_string())
            .unwrap();

        let response = provider
            .configure(Context::new(), configure_request(config))
            .await;

        assert!(response.provider_data.is_none());
        assert_eq!(response.diagnostics[0].summary, "Failed to create API client");
    }

    #[test]
    fn registers_every_entity() {
        let provider = MackerelProvider::new().unwrap();
        let mut resources: Vec<String> = provider.resources().into_keys().collect();
        resources.sort();
        let mut data_sources: Vec<String> = provider.data_sources().into_keys().collect();
        data_sources.sort();

        let expected = vec![
            "mackerel_alert_group_setting",
            "mackerel_aws_integration",
            "mackerel_channel",
            "mackerel_dashboard",
            "mackerel_downtime",
            "mackerel_monitor",
            "mackerel_notification_group",
            "mackerel_role",
            "mackerel_role_metadata",
            "mackerel_service",
            "mackerel_service_metadata",
        ];
        assert_eq!(resources, expected);
        assert_eq!(data_sources, expected);
    }

    #[test]
    fn factories_build_matching_type_names() {
        let provider = MackerelProvider::new().unwrap();
        for (name, factory) in provider.resources() {
            assert_eq!(factory().type_name(), name);
        }
        for (name, factory) in provider.data_sources() {
            assert_eq!(factory().type_name(), name);
        }
    }
}
