#![allow(clippy::disallowed_methods)]
#![allow(dead_code)]

use mackerel::MackerelProvider;
use std::any::Any;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use tfplug::types::{AttributePath, ClientCapabilities, DynamicValue};
use tracing_subscriber::EnvFilter;

pub type ProviderData = Arc<dyn Any + Send + Sync>;

/// Shows provider logs when RUST_LOG is set; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn value(json: &str) -> DynamicValue {
    DynamicValue::decode_json(json.as_bytes()).unwrap()
}

pub fn path(name: &str) -> AttributePath {
    AttributePath::new(name)
}

/// Configures a provider against `server_url` and returns it with its data
pub async fn configured_provider(server_url: &str) -> (MackerelProvider, ProviderData) {
    init_tracing();
    let mut provider = MackerelProvider::new().unwrap();
    let mut config = DynamicValue::object();
    config
        .set_string(&path("api_key"), "test-api-key".to_string())
        .unwrap();
    config
        .set_string(&path("api_base"), server_url.to_string())
        .unwrap();

    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let data = response.provider_data.unwrap();
    (provider, data)
}

/// Builds a resource from the provider's factory and configures it
pub async fn resource(
    provider: &MackerelProvider,
    data: &ProviderData,
    type_name: &str,
) -> Box<dyn ResourceWithConfigure> {
    let factories = provider.resources();
    let mut resource = factories.get(type_name).unwrap()();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(Arc::clone(data)),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

pub async fn data_source(
    provider: &MackerelProvider,
    data: &ProviderData,
    type_name: &str,
) -> Box<dyn DataSourceWithConfigure> {
    let factories = provider.data_sources();
    let mut data_source = factories.get(type_name).unwrap()();
    let response = data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(Arc::clone(data)),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    data_source
}
