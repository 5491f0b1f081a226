//! Data source implementations

mod model_data_source;

pub use model_data_source::ModelDataSource;

use std::collections::HashMap;
use std::sync::Arc;
use tfplug::DataSourceFactory;

use crate::models::alert_group_setting::AlertGroupSettingModel;
use crate::models::aws_integration::AwsIntegrationModel;
use crate::models::channel::ChannelModel;
use crate::models::dashboard::DashboardModel;
use crate::models::downtime::DowntimeModel;
use crate::models::metadata::{RoleMetadataModel, ServiceMetadataModel};
use crate::models::monitor::MonitorModel;
use crate::models::notification_group::NotificationGroupModel;
use crate::models::role::RoleModel;
use crate::models::service::ServiceModel;
use crate::models::DataSourceModel;
use crate::validators::Validators;

fn register<M: DataSourceModel>(
    factories: &mut HashMap<String, DataSourceFactory>,
    validators: &Arc<Validators>,
) {
    let validators = Arc::clone(validators);
    factories.insert(
        M::TYPE_NAME.to_string(),
        Box::new(move || Box::new(ModelDataSource::<M>::new(Arc::clone(&validators)))),
    );
}

/// Factories for every data source, keyed by type name. Data sources share
/// the type name of the resource they look up.
pub fn factories(validators: &Arc<Validators>) -> HashMap<String, DataSourceFactory> {
    let mut factories = HashMap::new();
    register::<ServiceModel>(&mut factories, validators);
    register::<RoleModel>(&mut factories, validators);
    register::<ServiceMetadataModel>(&mut factories, validators);
    register::<RoleMetadataModel>(&mut factories, validators);
    register::<MonitorModel>(&mut factories, validators);
    register::<ChannelModel>(&mut factories, validators);
    register::<NotificationGroupModel>(&mut factories, validators);
    register::<DashboardModel>(&mut factories, validators);
    register::<DowntimeModel>(&mut factories, validators);
    register::<AwsIntegrationModel>(&mut factories, validators);
    register::<AlertGroupSettingModel>(&mut factories, validators);
    factories
}
