//! Drives the provider, resource and data source traits through an
//! in-memory provider

#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan::plan_resource_change;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{
    AttributePath, ClientCapabilities, Diagnostic, DynamicValue, ServerCapabilities,
};
use tfplug::validator::StringLengthValidator;

/// Shared backend handed out as provider data
#[derive(Default)]
struct NoteStore {
    notes: RwLock<HashMap<String, String>>,
    next_id: AtomicUsize,
}

fn attr(name: &str) -> AttributePath {
    AttributePath::new(name)
}

fn note_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("A note kept in memory")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("folder", AttributeType::String)
                .optional()
                .computed()
                .default(StaticDefault::string("inbox"))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("text", AttributeType::String)
                .required()
                .validator(StringLengthValidator::at_least(1))
                .build(),
        )
        .build()
}

fn not_configured() -> Diagnostic {
    Diagnostic::error("Provider not configured", "Provider data was not properly configured")
}

#[derive(Default)]
struct NoteResource {
    store: Option<Arc<NoteStore>>,
}

#[async_trait]
impl Resource for NoteResource {
    fn type_name(&self) -> &str {
        "memory_note"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: note_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: note_schema().validate(&request.config),
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let Some(store) = &self.store else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let id = format!("note-{}", store.next_id.fetch_add(1, Ordering::SeqCst));
        let text = request.planned_state.get_string(&attr("text")).unwrap();
        store.notes.write().await.insert(id.clone(), text);

        let mut new_state = request.planned_state;
        new_state.set_string(&attr("id"), id).unwrap();
        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut response = ReadResourceResponse {
            new_state: None,
            diagnostics: vec![],
            private: vec![],
            deferred: None,
            new_identity: None,
        };
        let Some(store) = &self.store else {
            response.new_state = Some(request.current_state);
            response.diagnostics.push(not_configured());
            return response;
        };

        let id = request.current_state.get_string(&attr("id")).unwrap();
        if let Some(text) = store.notes.read().await.get(&id) {
            let mut state = request.current_state.clone();
            state.set_string(&attr("text"), text.clone()).unwrap();
            response.new_state = Some(state);
        }
        response
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        if let Some(store) = &self.store {
            let id = request.planned_state.get_string(&attr("id")).unwrap();
            let text = request.planned_state.get_string(&attr("text")).unwrap();
            store.notes.write().await.insert(id, text);
        }
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
            new_identity: None,
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        if let Some(store) = &self.store {
            let id = request.prior_state.get_string(&attr("id")).unwrap();
            store.notes.write().await.remove(&id);
        }
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for NoteResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request
            .provider_data
            .and_then(|data| data.downcast::<NoteStore>().ok())
        {
            Some(store) => self.store = Some(store),
            None => diagnostics.push(Diagnostic::error(
                "Invalid provider data",
                "Expected a NoteStore",
            )),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for NoteResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let plan = plan_resource_change(
            &note_schema(),
            &request.prior_state,
            &request.proposed_new_state,
            &request.config,
        );
        ModifyPlanResponse {
            planned_state: plan.planned_state,
            requires_replace: plan.requires_replace,
            planned_private: vec![],
            diagnostics: plan.diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for NoteResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, attr("id"), &request, &mut response);
        response
    }
}

#[derive(Default)]
struct NoteCountDataSource {
    store: Option<Arc<NoteStore>>,
}

#[async_trait]
impl DataSource for NoteCountDataSource {
    fn type_name(&self) -> &str {
        "memory_note_count"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("count", AttributeType::Number)
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(store) = &self.store else {
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![not_configured()],
                deferred: None,
            };
        };
        let mut state = DynamicValue::object();
        state
            .set_number(&attr("count"), store.notes.read().await.len() as f64)
            .unwrap();
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for NoteCountDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.store = request
            .provider_data
            .and_then(|data| data.downcast::<NoteStore>().ok());
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

#[derive(Default)]
struct MemoryProvider;

#[async_trait]
impl Provider for MemoryProvider {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "memory".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
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
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(NoteStore::default())),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "memory_note".to_string(),
            Box::new(|| Box::new(NoteResource::default()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "memory_note_count".to_string(),
            Box::new(|| {
                Box::new(NoteCountDataSource::default()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}

async fn configure_provider(provider: &mut MemoryProvider) -> Arc<dyn std::any::Any + Send + Sync> {
    provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::object(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await
        .provider_data
        .unwrap()
}

fn planned(text: &str) -> DynamicValue {
    let mut state = DynamicValue::object();
    state.set_string(&attr("text"), text.to_string()).unwrap();
    state.set_string(&attr("folder"), "inbox".to_string()).unwrap();
    state
}

fn create_request(planned_state: DynamicValue) -> CreateResourceRequest {
    CreateResourceRequest {
        type_name: "memory_note".to_string(),
        config: planned_state.clone(),
        planned_state,
        planned_private: vec![],
        provider_meta: None,
    }
}

#[tokio::test]
async fn factory_instances_share_configured_data() {
    let mut provider = MemoryProvider;
    let data = configure_provider(&mut provider).await;
    let factories = provider.resources();
    let factory = factories.get("memory_note").unwrap();

    let mut writer = factory();
    let mut reader = factory();
    for resource in [&mut writer, &mut reader] {
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(data.clone()),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
    }

    let created = writer
        .create(Context::new(), create_request(planned("hello")))
        .await;
    let id = created.new_state.get_string(&attr("id")).unwrap();

    let read = reader
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "memory_note".to_string(),
                current_state: created.new_state.clone(),
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
                current_identity: None,
            },
        )
        .await;
    let state = read.new_state.unwrap();
    assert_eq!(state.get_string(&attr("id")).unwrap(), id);
    assert_eq!(state.get_string(&attr("text")).unwrap(), "hello");

    let counter = provider.data_sources().get("memory_note_count").unwrap()();
    assert_eq!(counter.type_name(), "memory_note_count");
}

#[tokio::test]
async fn unconfigured_resource_returns_diagnostic() {
    let resource = NoteResource::default();
    let response = resource
        .create(Context::new(), create_request(planned("hello")))
        .await;
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
}

#[tokio::test]
async fn wrong_provider_data_is_rejected() {
    let mut resource = NoteResource::default();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(Arc::new("not a store".to_string())),
            },
        )
        .await;
    assert_eq!(response.diagnostics[0].summary, "Invalid provider data");
}

#[tokio::test]
async fn concurrent_creates_get_distinct_ids() {
    let mut provider = MemoryProvider;
    let data = configure_provider(&mut provider).await;
    let mut resource = NoteResource::default();
    resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(data),
            },
        )
        .await;
    let resource = Arc::new(resource);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let resource = Arc::clone(&resource);
            tokio::spawn(async move {
                resource
                    .create(Context::new(), create_request(planned(&format!("note {}", i))))
                    .await
                    .new_state
                    .get_string(&attr("id"))
                    .unwrap()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn modify_plan_applies_defaults_and_replacement() {
    let resource = NoteResource::default();

    let mut config = DynamicValue::object();
    config.set_string(&attr("text"), "hello".to_string()).unwrap();
    config.set_null(&attr("folder")).unwrap();
    config.set_null(&attr("id")).unwrap();

    let created = resource
        .modify_plan(
            Context::new(),
            ModifyPlanRequest {
                type_name: "memory_note".to_string(),
                config: config.clone(),
                prior_state: DynamicValue::null(),
                proposed_new_state: config.clone(),
                prior_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(
        created.planned_state.get_string(&attr("folder")).unwrap(),
        "inbox"
    );
    assert!(created.planned_state.get(&attr("id")).unwrap().is_unknown());
    assert!(created.requires_replace.is_empty());

    let mut prior = planned("hello");
    prior.set_string(&attr("id"), "note-0".to_string()).unwrap();
    let mut moved = prior.clone();
    moved.set_string(&attr("folder"), "archive".to_string()).unwrap();

    let moved_plan = resource
        .modify_plan(
            Context::new(),
            ModifyPlanRequest {
                type_name: "memory_note".to_string(),
                config: moved.clone(),
                prior_state: prior,
                proposed_new_state: moved,
                prior_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(moved_plan.requires_replace, vec![attr("folder")]);
    assert_eq!(
        moved_plan.planned_state.get_string(&attr("id")).unwrap(),
        "note-0"
    );
}

#[tokio::test]
async fn import_passes_the_id_through() {
    let resource = NoteResource::default();
    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "memory_note".to_string(),
                id: "note-42".to_string(),
                client_capabilities: ClientCapabilities::default(),
                identity: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(response.imported_resources.len(), 1);
    assert_eq!(response.imported_resources[0].type_name, "memory_note");
    assert_eq!(
        response.imported_resources[0]
            .state
            .get_string(&attr("id"))
            .unwrap(),
        "note-42"
    );
}

#[tokio::test]
async fn empty_text_fails_validation() {
    let resource = NoteResource::default();
    let response = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "memory_note".to_string(),
                config: planned(""),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].attribute, Some(attr("text")));
}

#[tokio::test]
async fn context_timeout_cancels() {
    let ctx = Context::new().with_timeout(Duration::from_millis(10));
    assert!(!ctx.is_cancelled());
    let mut done = ctx.done();
    done.changed().await.unwrap();
    assert!(ctx.is_cancelled());
}
