//! Resource adapter shared by every managed entity
//!
//! `ModelResource<M>` turns the framework's request envelopes into calls on
//! a [`Model`]: the planned or stored value is decoded into the model, the
//! API is called and the result is encoded back into state. Reads merge the
//! fresh API object into the prior state so that null and empty collections
//! and semantically equal values keep the user's spelling.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::import::push_imported;
use tfplug::plan::plan_resource_change;
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
use tfplug::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::Client;
use crate::models::{Model, ModelError};
use crate::validators::Validators;
use crate::MackerelProviderData;

fn has_block(value: &DynamicValue, path: &AttributePath) -> bool {
    matches!(value.get_opt(path), Some(Dynamic::List(items)) if !items.is_empty())
}

pub struct ModelResource<M: Model> {
    validators: Arc<Validators>,
    provider_data: Option<MackerelProviderData>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelResource<M> {
    pub fn new(validators: Arc<Validators>) -> Self {
        Self {
            validators,
            provider_data: None,
            _model: PhantomData,
        }
    }

    fn client(&self, ctx: &Context) -> Result<&Client, Diagnostic> {
        let data = self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?;
        if ctx.is_cancelled() {
            return Err(Diagnostic::error(
                "Operation cancelled",
                format!("{} request was cancelled before reaching the API", M::TYPE_NAME),
            ));
        }
        Ok(data.client.as_ref())
    }

    /// Fetches the remote object and folds it into `model`
    async fn refresh(model: M, client: &Client) -> Result<M, ModelError> {
        let fresh = model.read(client).await?;
        Ok(model.merge(fresh))
    }

    fn failure(action: &str, error: &ModelError) -> Diagnostic {
        tracing::error!("{} {} failed: {}", action, M::TYPE_NAME, error);
        error.to_diagnostic(format!("Failed to {} {}", action, M::TYPE_NAME))
    }
}

#[async_trait]
impl<M: Model> Resource for ModelResource<M> {
    fn type_name(&self) -> &str {
        M::TYPE_NAME
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
            schema: M::resource_schema(&self.validators),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = M::resource_schema(&self.validators).validate(&request.config);

        // conversion errors the schema cannot see, e.g. malformed thresholds
        if !has_errors(&diagnostics) {
            if let Err(e) = M::from_value(&request.config) {
                diagnostics.push(e.to_diagnostic("Invalid configuration"));
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let client = match self.client(&ctx) {
            Ok(client) => client,
            Err(diagnostic) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diagnostic],
                };
            }
        };

        let result = async {
            let mut model = M::from_value(&request.planned_state)?;
            model.create(client).await?;
            Self::refresh(model, client).await?.to_value()
        }
        .await;

        match result {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Self::failure("create", &e)],
            },
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let client = match self.client(&ctx) {
            Ok(client) => client,
            Err(diagnostic) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diagnostic],
                    private: request.private,
                    deferred: None,
                    new_identity: None,
                };
            }
        };

        let result = async {
            let model = M::from_value(&request.current_state)?;
            Self::refresh(model, client).await?.to_value()
        }
        .await;

        let (new_state, diagnostics) = match result {
            Ok(state) => (Some(state), vec![]),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "{} no longer exists, removing it from state: {}",
                    M::TYPE_NAME,
                    e
                );
                (None, vec![])
            }
            Err(e) => (
                Some(request.current_state),
                vec![Self::failure("read", &e)],
            ),
        };

        ReadResourceResponse {
            new_state,
            diagnostics,
            private: request.private,
            deferred: None,
            new_identity: None,
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let client = match self.client(&ctx) {
            Ok(client) => client,
            Err(diagnostic) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diagnostic],
                    new_identity: None,
                };
            }
        };

        let result = async {
            let mut model = M::from_value(&request.planned_state)?;
            model.update(client).await?;
            Self::refresh(model, client).await?.to_value()
        }
        .await;

        match result {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
                new_identity: None,
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Self::failure("update", &e)],
                new_identity: None,
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match self.client(&ctx) {
            Ok(client) => client,
            Err(diagnostic) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diagnostic],
                };
            }
        };

        let result = async {
            let model = M::from_value(&request.prior_state)?;
            model.delete(client).await
        }
        .await;

        let diagnostics = match result {
            Ok(()) => vec![],
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} was already deleted", M::TYPE_NAME);
                vec![]
            }
            Err(e) => vec![Self::failure("delete", &e)],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl<M: Model> ResourceWithConfigure for ModelResource<M> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match request.provider_data {
            Some(data) => match data.downcast_ref::<MackerelProviderData>() {
                Some(provider_data) => {
                    tracing::debug!("Configured {}", M::TYPE_NAME);
                    self.provider_data = Some(provider_data.clone());
                }
                None => diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract MackerelProviderData from provider data",
                )),
            },
            None => diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            )),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl<M: Model> ResourceWithModifyPlan for ModelResource<M> {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let schema = M::resource_schema(&self.validators);
        let plan = plan_resource_change(
            &schema,
            &request.prior_state,
            &request.proposed_new_state,
            &request.config,
        );

        let mut requires_replace = plan.requires_replace;
        if !request.prior_state.is_null() && !plan.planned_state.is_null() {
            let prior = &request.prior_state;
            let planned = &plan.planned_state;
            let changed = M::replace_blocks()
                .iter()
                .map(|block| AttributePath::new(block))
                .filter(|path| prior.get(path).ok() != planned.get(path).ok());
            let switched = M::variant_blocks()
                .iter()
                .map(|block| AttributePath::new(block))
                .filter(|path| has_block(prior, path) != has_block(planned, path));

            for path in changed.chain(switched) {
                if !requires_replace.contains(&path) {
                    tracing::debug!(block = %path, "block change requires replacement");
                    requires_replace.push(path);
                }
            }
        }

        ModifyPlanResponse {
            planned_state: plan.planned_state,
            requires_replace,
            planned_private: request.prior_private,
            diagnostics: plan.diagnostics,
        }
    }
}

#[async_trait]
impl<M: Model> ResourceWithImportState for ModelResource<M> {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };

        match M::import_state(&request.id) {
            Ok(state) => push_imported(&request, &mut response, state),
            Err(e) => response
                .diagnostics
                .push(e.to_diagnostic(format!("Invalid import ID for {}", M::TYPE_NAME))),
        }

        response
    }
}
