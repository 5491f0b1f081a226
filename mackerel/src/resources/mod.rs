//! Resource implementations

mod model_resource;

pub use model_resource::ModelResource;

use std::collections::HashMap;
use std::sync::Arc;
use tfplug::ResourceFactory;

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
use crate::models::Model;
use crate::validators::Validators;

pub type ServiceResource = ModelResource<ServiceModel>;
pub type RoleResource = ModelResource<RoleModel>;
pub type ServiceMetadataResource = ModelResource<ServiceMetadataModel>;
pub type RoleMetadataResource = ModelResource<RoleMetadataModel>;
pub type MonitorResource = ModelResource<MonitorModel>;
pub type ChannelResource = ModelResource<ChannelModel>;
pub type NotificationGroupResource = ModelResource<NotificationGroupModel>;
pub type DashboardResource = ModelResource<DashboardModel>;
pub type DowntimeResource = ModelResource<DowntimeModel>;
pub type AwsIntegrationResource = ModelResource<AwsIntegrationModel>;
pub type AlertGroupSettingResource = ModelResource<AlertGroupSettingModel>;

fn register<M: Model>(
    factories: &mut HashMap<String, ResourceFactory>,
    validators: &Arc<Validators>,
) {
    let validators = Arc::clone(validators);
    factories.insert(
        M::TYPE_NAME.to_string(),
        Box::new(move || Box::new(ModelResource::<M>::new(Arc::clone(&validators)))),
    );
}

/// Factories for every managed resource, keyed by type name
pub fn factories(validators: &Arc<Validators>) -> HashMap<String, ResourceFactory> {
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
