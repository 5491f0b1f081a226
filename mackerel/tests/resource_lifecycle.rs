//! Resource CRUD against a mock Mackerel API

#![allow(clippy::disallowed_methods)]

mod common;

use common::{configured_provider, path, resource, value};
use mackerel::resources::{ChannelResource, MonitorResource, RoleResource, ServiceResource};
use mackerel::validators::Validators;
use mockito::{Matcher, Server};
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::resource::{
    CreateResourceRequest, DeleteResourceRequest, ImportResourceStateRequest, ModifyPlanRequest,
    ReadResourceRequest, ResourceWithImportState, ResourceWithModifyPlan, UpdateResourceRequest,
};
use tfplug::types::{ClientCapabilities, DynamicValue};
use tfplug::Resource;

const HOST_MONITOR: &str = r#"{
    "id": "mon1",
    "name": "cpu",
    "memo": "",
    "isMute": false,
    "type": "host",
    "metric": "cpu%",
    "operator": ">",
    "warning": 70,
    "critical": 90,
    "duration": 5,
    "scopes": [],
    "excludeScopes": []
}"#;

const PLANNED_MONITOR: &str = r#"{
    "id": "__unknown__",
    "name": "cpu",
    "memo": "",
    "is_mute": false,
    "notification_interval": null,
    "host_metric": [{
        "metric": "cpu%",
        "operator": ">",
        "warning": "70.000",
        "critical": "90",
        "duration": 5,
        "max_check_attempts": null,
        "scopes": null,
        "exclude_scopes": null
    }],
    "connectivity": [],
    "service_metric": [],
    "external": [],
    "expression": [],
    "anomaly_detection": [],
    "query": []
}"#;

fn create_request(type_name: &str, planned: DynamicValue) -> CreateResourceRequest {
    CreateResourceRequest {
        type_name: type_name.to_string(),
        config: planned.clone(),
        planned_state: planned,
        planned_private: vec![],
        provider_meta: None,
    }
}

fn read_request(type_name: &str, state: DynamicValue) -> ReadResourceRequest {
    ReadResourceRequest {
        type_name: type_name.to_string(),
        current_state: state,
        private: vec![],
        provider_meta: None,
        client_capabilities: ClientCapabilities::default(),
        current_identity: None,
    }
}

fn import_request(type_name: &str, id: &str) -> ImportResourceStateRequest {
    ImportResourceStateRequest {
        type_name: type_name.to_string(),
        id: id.to_string(),
        client_capabilities: ClientCapabilities::default(),
        identity: None,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn service_create_read_delete() {
    let mut server = Server::new_async().await;
    let create_mock = server
        .mock("POST", "/api/v0/services")
        .match_header("x-api-key", "test-api-key")
        .match_body(Matcher::Json(serde_json::json!({"name": "web", "memo": "frontend"})))
        .with_body(r#"{"name": "web", "memo": "frontend", "roles": []}"#)
        .create_async()
        .await;
    let list_mock = server
        .mock("GET", "/api/v0/services")
        .with_body(r#"{"services": [{"name": "web", "memo": "frontend", "roles": ["app"]}]}"#)
        .expect(2)
        .create_async()
        .await;
    let delete_mock = server
        .mock("DELETE", "/api/v0/services/web")
        .with_body(r#"{"name": "web", "memo": "frontend", "roles": []}"#)
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let service = resource(&provider, &data, "mackerel_service").await;

    let planned = value(r#"{"id": "__unknown__", "name": "web", "memo": "frontend"}"#);
    let created = service
        .create(Context::new(), create_request("mackerel_service", planned))
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(created.new_state.get_string(&path("id")).unwrap(), "web");
    assert_eq!(created.new_state.get_string(&path("memo")).unwrap(), "frontend");

    let read = service
        .read(
            Context::new(),
            read_request("mackerel_service", created.new_state.clone()),
        )
        .await;
    assert!(read.diagnostics.is_empty());
    assert_eq!(read.new_state, Some(created.new_state.clone()));

    let deleted = service
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "mackerel_service".to_string(),
                prior_state: created.new_state,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty());

    create_mock.assert_async().await;
    list_mock.assert_async().await;
    delete_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn vanished_service_is_removed_from_state() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/api/v0/services")
        .with_body(r#"{"services": []}"#)
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let service = resource(&provider, &data, "mackerel_service").await;

    let state = value(r#"{"id": "web", "name": "web", "memo": ""}"#);
    let read = service
        .read(Context::new(), read_request("mackerel_service", state))
        .await;

    assert!(read.diagnostics.is_empty());
    assert!(read.new_state.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn api_errors_become_diagnostics() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/api/v0/services")
        .with_status(400)
        .with_body(r#"{"error": {"message": "Service name is already used"}}"#)
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let service = resource(&provider, &data, "mackerel_service").await;

    let planned = value(r#"{"id": "__unknown__", "name": "web", "memo": ""}"#);
    let created = service
        .create(Context::new(), create_request("mackerel_service", planned))
        .await;

    assert_eq!(created.diagnostics.len(), 1);
    assert_eq!(created.diagnostics[0].summary, "Failed to create mackerel_service");
    assert!(created.diagnostics[0]
        .detail
        .contains("Service name is already used"));
}

#[tokio::test(flavor = "multi_thread")]
async fn monitor_keeps_threshold_spelling_and_null_scopes() {
    let mut server = Server::new_async().await;
    let create_mock = server
        .mock("POST", "/api/v0/monitors")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "type": "host",
            "warning": 70.0,
            "critical": 90.0,
            "scopes": []
        })))
        .with_body(HOST_MONITOR)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/api/v0/monitors/mon1")
        .with_body(format!(r#"{{"monitor": {}}}"#, HOST_MONITOR))
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let monitor = resource(&provider, &data, "mackerel_monitor").await;

    let created = monitor
        .create(
            Context::new(),
            create_request("mackerel_monitor", value(PLANNED_MONITOR)),
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);

    let state = created.new_state;
    let block = path("host_metric").index(0);
    assert_eq!(state.get_string(&path("id")).unwrap(), "mon1");
    assert_eq!(
        state.get_string(&block.clone().attribute("warning")).unwrap(),
        "70.000"
    );
    assert_eq!(
        state.get_string(&block.clone().attribute("critical")).unwrap(),
        "90"
    );
    assert!(state.get_opt(&block.attribute("scopes")).is_none());

    // a second refresh changes nothing
    let read = monitor
        .read(Context::new(), read_request("mackerel_monitor", state.clone()))
        .await;
    assert_eq!(read.new_state, Some(state));

    create_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn monitor_update_sends_new_threshold() {
    let mut server = Server::new_async().await;
    let updated_monitor = HOST_MONITOR.replace(r#""warning": 70"#, r#""warning": 75.5"#);
    let put_mock = server
        .mock("PUT", "/api/v0/monitors/mon1")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": "mon1",
            "warning": 75.5
        })))
        .with_body(updated_monitor.clone())
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/api/v0/monitors/mon1")
        .with_body(format!(r#"{{"monitor": {}}}"#, updated_monitor))
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let monitor = resource(&provider, &data, "mackerel_monitor").await;

    let planned = value(
        &PLANNED_MONITOR
            .replace(r#""id": "__unknown__""#, r#""id": "mon1""#)
            .replace(r#""warning": "70.000""#, r#""warning": "75.50""#),
    );
    let updated = monitor
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "mackerel_monitor".to_string(),
                prior_state: planned.clone(),
                planned_state: planned.clone(),
                config: planned,
                planned_private: vec![],
                provider_meta: None,
                planned_identity: None,
            },
        )
        .await;

    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    assert_eq!(
        updated
            .new_state
            .get_string(&path("host_metric").index(0).attribute("warning"))
            .unwrap(),
        "75.50"
    );
    put_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_monitor_is_removed_from_state() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", "/api/v0/monitors/gone")
        .with_status(404)
        .with_body(r#"{"error": {"message": "Monitor Not Found."}}"#)
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let monitor = resource(&provider, &data, "mackerel_monitor").await;

    let read = monitor
        .read(
            Context::new(),
            read_request("mackerel_monitor", value(r#"{"id": "gone"}"#)),
        )
        .await;

    assert!(read.diagnostics.is_empty());
    assert!(read.new_state.is_none());
}

#[tokio::test]
async fn unconfigured_resource_reports_provider_error() {
    let service = ServiceResource::new(Arc::new(Validators::new().unwrap()));
    let planned = value(r#"{"id": "__unknown__", "name": "web", "memo": ""}"#);

    let created = service
        .create(Context::new(), create_request("mackerel_service", planned.clone()))
        .await;

    assert_eq!(created.diagnostics.len(), 1);
    assert_eq!(created.diagnostics[0].summary, "Provider not configured");
    assert_eq!(created.new_state, planned);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_context_skips_the_api() {
    let mut server = Server::new_async().await;
    let create_mock = server
        .mock("POST", "/api/v0/services")
        .expect(0)
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let service = resource(&provider, &data, "mackerel_service").await;

    let ctx = Context::new();
    ctx.cancel();
    let planned = value(r#"{"id": "__unknown__", "name": "web", "memo": ""}"#);
    let created = service
        .create(ctx, create_request("mackerel_service", planned))
        .await;

    assert_eq!(created.diagnostics[0].summary, "Operation cancelled");
    create_mock.assert_async().await;
}

#[tokio::test]
async fn role_import_splits_compound_id() {
    let role = RoleResource::new(Arc::new(Validators::new().unwrap()));

    let imported = role
        .import_state(Context::new(), import_request("mackerel_role", "web:app"))
        .await;
    assert!(imported.diagnostics.is_empty());
    let state = &imported.imported_resources[0].state;
    assert_eq!(state.get_string(&path("id")).unwrap(), "web:app");
    assert_eq!(state.get_string(&path("service")).unwrap(), "web");
    assert_eq!(state.get_string(&path("name")).unwrap(), "app");

    let malformed = role
        .import_state(Context::new(), import_request("mackerel_role", "web"))
        .await;
    assert!(malformed.imported_resources.is_empty());
    assert_eq!(malformed.diagnostics.len(), 1);
    assert!(malformed.diagnostics[0].is_error());
}

#[tokio::test(flavor = "multi_thread")]
async fn imported_role_is_completed_by_read() {
    let mut server = Server::new_async().await;
    let _roles = server
        .mock("GET", "/api/v0/services/web/roles")
        .with_body(r#"{"roles": [{"name": "app", "memo": "application servers"}]}"#)
        .create_async()
        .await;

    let (provider, data) = configured_provider(&server.url()).await;
    let role_resource = resource(&provider, &data, "mackerel_role").await;
    let role = RoleResource::new(Arc::new(Validators::new().unwrap()));

    let imported = role
        .import_state(Context::new(), import_request("mackerel_role", "web:app"))
        .await;
    let state = imported.imported_resources[0].state.clone();

    let read = role_resource
        .read(Context::new(), read_request("mackerel_role", state))
        .await;
    let state = read.new_state.unwrap();
    assert_eq!(
        state.get_string(&path("memo")).unwrap(),
        "application servers"
    );
}

#[tokio::test]
async fn changing_channel_kind_forces_replacement() {
    let channel = ChannelResource::new(Arc::new(Validators::new().unwrap()));

    let prior = value(
        r#"{
            "id": "ch1",
            "name": "ops",
            "email": [{"emails": ["ops@example.com"], "user_ids": null, "events": ["alert"]}],
            "slack": [],
            "webhook": []
        }"#,
    );
    let proposed = value(
        r#"{
            "id": "ch1",
            "name": "ops",
            "email": [],
            "slack": [],
            "webhook": [{"url": "https://hooks.example.com/ops", "events": null}]
        }"#,
    );

    let plan = channel
        .modify_plan(
            Context::new(),
            ModifyPlanRequest {
                type_name: "mackerel_channel".to_string(),
                config: proposed.clone(),
                prior_state: prior,
                proposed_new_state: proposed,
                prior_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(plan.diagnostics.is_empty());
    assert!(plan.requires_replace.contains(&path("email")));
    assert!(plan.requires_replace.contains(&path("webhook")));
    assert!(!plan.requires_replace.contains(&path("slack")));
    assert!(!plan.requires_replace.contains(&path("name")));
}

fn monitor_plan_request(prior: DynamicValue, proposed: DynamicValue) -> ModifyPlanRequest {
    ModifyPlanRequest {
        type_name: "mackerel_monitor".to_string(),
        config: proposed.clone(),
        prior_state: prior,
        proposed_new_state: proposed,
        prior_private: vec![],
        provider_meta: None,
    }
}

#[tokio::test]
async fn monitor_replaced_only_when_kind_changes() {
    let monitor = MonitorResource::new(Arc::new(Validators::new().unwrap()));
    let prior_json = PLANNED_MONITOR.replace(r#""id": "__unknown__""#, r#""id": "mon1""#);
    let prior = value(&prior_json);

    let tuned = value(&prior_json.replace(r#""warning": "70.000""#, r#""warning": "80""#));
    let plan = monitor
        .modify_plan(Context::new(), monitor_plan_request(prior.clone(), tuned))
        .await;
    assert!(plan.requires_replace.is_empty(), "{:?}", plan.requires_replace);

    let mut switched = prior.clone();
    switched.set_blocks(&path("host_metric"), vec![]).unwrap();
    switched
        .set_blocks(
            &path("connectivity"),
            vec![value(
                r#"{"scopes": null, "exclude_scopes": null, "alert_status_on_gone": null}"#,
            )],
        )
        .unwrap();
    let plan = monitor
        .modify_plan(Context::new(), monitor_plan_request(prior, switched))
        .await;
    assert!(plan.requires_replace.contains(&path("host_metric")));
    assert!(plan.requires_replace.contains(&path("connectivity")));
    assert!(!plan.requires_replace.contains(&path("query")));
}

#[tokio::test]
async fn validate_rejects_two_monitor_kinds() {
    let monitor = MonitorResource::new(Arc::new(Validators::new().unwrap()));
    let config = value(&PLANNED_MONITOR.replace(
        r#""connectivity": []"#,
        r#""connectivity": [{"scopes": null, "exclude_scopes": null, "alert_status_on_gone": null}]"#,
    ));

    let response = monitor
        .validate(
            Context::new(),
            tfplug::resource::ValidateResourceConfigRequest {
                type_name: "mackerel_monitor".to_string(),
                config,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert!(response.diagnostics.iter().any(|d| d.is_error()));
}
