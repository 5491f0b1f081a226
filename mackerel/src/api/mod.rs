//! Typed client for the Mackerel REST API

pub mod alert_group_settings;
pub mod aws_integrations;
pub mod channels;
pub mod client;
pub mod dashboards;
pub mod downtimes;
pub mod error;
pub mod monitors;
pub mod notification_groups;
pub mod services;

pub use client::{Client, ClientConfig, DEFAULT_BASE_URL};
pub use error::ApiError;

/// Serde helper for `skip_serializing_if` on plain strings
pub(crate) fn is_empty(value: &str) -> bool {
    value.is_empty()
}
