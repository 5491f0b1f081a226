//! Data source adapter: looks an entity up and exposes it as computed state

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::types::Diagnostic;

use crate::models::DataSourceModel;
use crate::validators::Validators;
use crate::MackerelProviderData;

pub struct ModelDataSource<M: DataSourceModel> {
    validators: Arc<Validators>,
    provider_data: Option<MackerelProviderData>,
    _model: PhantomData<fn() -> M>,
}

impl<M: DataSourceModel> ModelDataSource<M> {
    pub fn new(validators: Arc<Validators>) -> Self {
        Self {
            validators,
            provider_data: None,
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: DataSourceModel> DataSource for ModelDataSource<M> {
    fn type_name(&self) -> &str {
        M::TYPE_NAME
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
            schema: M::data_source_schema(&self.validators),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: M::data_source_schema(&self.validators).validate(&request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                    deferred: None,
                };
            }
        };

        if ctx.is_cancelled() {
            diagnostics.push(Diagnostic::error(
                "Operation cancelled",
                format!("{} lookup was cancelled", M::TYPE_NAME),
            ));
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics,
                deferred: None,
            };
        }

        let result = async {
            M::lookup(&request.config, &provider_data.client)
                .await?
                .to_value()
        }
        .await;

        match result {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics,
                deferred: None,
            },
            Err(e) => {
                tracing::error!("Failed to read {}: {}", M::TYPE_NAME, e);
                diagnostics.push(e.to_diagnostic(format!("Failed to read {}", M::TYPE_NAME)));
                ReadDataSourceResponse {
                    state: request.config,
                    diagnostics,
                    deferred: None,
                }
            }
        }
    }
}

#[async_trait]
impl<M: DataSourceModel> DataSourceWithConfigure for ModelDataSource<M> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<MackerelProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract MackerelProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
