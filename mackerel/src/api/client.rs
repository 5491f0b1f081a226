use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::{ApiError, ErrorResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.mackerelio.com/";

const API_KEY_HEADER: &str = "X-Api-Key";

/// Mackerel API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    config: ClientConfig,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
            user_agent: format!("terraform-provider-mackerel/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Client {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_config(base_url, api_key, ClientConfig::default())
    }

    pub fn with_config(
        base_url: &str,
        api_key: &str,
        config: ClientConfig,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                base_url,
                parsed.scheme()
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
                config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(Method::DELETE, path, None::<&()>).await
    }

    pub fn services(&self) -> super::services::ServicesApi<'_> {
        super::services::ServicesApi::new(self)
    }

    pub fn roles(&self) -> super::services::RolesApi<'_> {
        super::services::RolesApi::new(self)
    }

    pub fn metadata(&self) -> super::services::MetadataApi<'_> {
        super::services::MetadataApi::new(self)
    }

    pub fn monitors(&self) -> super::monitors::MonitorsApi<'_> {
        super::monitors::MonitorsApi::new(self)
    }

    pub fn channels(&self) -> super::channels::ChannelsApi<'_> {
        super::channels::ChannelsApi::new(self)
    }

    pub fn notification_groups(&self) -> super::notification_groups::NotificationGroupsApi<'_> {
        super::notification_groups::NotificationGroupsApi::new(self)
    }

    pub fn dashboards(&self) -> super::dashboards::DashboardsApi<'_> {
        super::dashboards::DashboardsApi::new(self)
    }

    pub fn downtimes(&self) -> super::downtimes::DowntimesApi<'_> {
        super::downtimes::DowntimesApi::new(self)
    }

    pub fn aws_integrations(&self) -> super::aws_integrations::AwsIntegrationsApi<'_> {
        super::aws_integrations::AwsIntegrationsApi::new(self)
    }

    pub fn alert_group_settings(&self) -> super::alert_group_settings::AlertGroupSettingsApi<'_> {
        super::alert_group_settings::AlertGroupSettingsApi::new(self)
    }

    /// Sends the request with exponential backoff. Rate limits and refused
    /// connections are retried for every method; server errors and
    /// timeouts only for methods that are safe to repeat, so a create is
    /// never sent twice
    async fn execute_with_retry<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.inner.base_url, path);
        let retry = &self.inner.config;
        let idempotent = method != Method::POST;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * 2_u64.pow(attempt - 1),
                    retry.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying {} {} after {}ms (attempt {})",
                    method,
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            tracing::debug!("{} request to: {}", method, url);
            let mut request = self
                .inner
                .http_client
                .request(method.clone(), &url)
                .header(API_KEY_HEADER, &self.inner.api_key);
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!("Response status for {} {}: {}", method, path, status);

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }
                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        return Err(ApiError::AuthError);
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() && idempotent {
                        last_error = Some(self.handle_error_response(response).await);
                    } else {
                        return Err(self.handle_error_response(response).await);
                    }
                }
                Err(e) if e.is_timeout() => {
                    if !idempotent {
                        return Err(ApiError::Timeout(retry.timeout_seconds));
                    }
                    last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                }
                Err(e) if e.is_connect() => {
                    tracing::warn!("Connection to {} failed: {}", url, e);
                    last_error = Some(ApiError::RequestError(e));
                }
                Err(e) => return Err(ApiError::RequestError(e)),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        // DELETE endpoints may answer with an empty body
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => body.error.into_message(),
            Err(_) => text,
        };

        ApiError::ApiError { status, message }
    }
}

/// Percent-encodes one path segment (service names, namespaces)
pub(crate) fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::Value;

    fn fast_config() -> ClientConfig {
        ClientConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn sends_api_key_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v0/services")
            .match_header("x-api-key", "secret")
            .with_body(r#"{"services": []}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let body: Value = client.get("/api/v0/services").await.unwrap();

        assert_eq!(body["services"], Value::Array(vec![]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decodes_mackerel_error_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v0/monitors/xxx")
            .with_status(404)
            .with_body(r#"{"error": {"message": "Monitor not found"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret").unwrap();
        let err = client.get::<Value>("/api/v0/monitors/xxx").await.unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("Monitor not found"));
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v0/services")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "bad", fast_config()).unwrap();
        let err = client.get::<Value>("/api/v0/services").await.unwrap_err();

        assert!(matches!(err, ApiError::AuthError));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_is_sent_once_on_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v0/monitors")
            .match_body(Matcher::Json(serde_json::json!({"name": "cpu"})))
            .with_status(500)
            .with_body(r#"{"error": {"message": "duplicate monitor name"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "k", fast_config()).unwrap();
        let err = client
            .post::<Value, _>("/api/v0/monitors", &serde_json::json!({"name": "cpu"}))
            .await
            .unwrap_err();

        match err {
            ApiError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "duplicate monitor name");
            }
            other => panic!("unexpected error {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reads_are_retried_and_keep_the_last_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v0/services")
            .with_status(503)
            .with_body(r#"{"error": {"message": "maintenance"}}"#)
            .expect(3)
            .create_async()
            .await;

        let client = Client::with_config(&server.url(), "k", fast_config()).unwrap();
        let err = client.get::<Value>("/api/v0/services").await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::ApiError { status: 503, ref message } if message == "maintenance"
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_body_decodes_as_unit() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v0/channels/abc")
            .with_status(200)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/", server.url()), "k").unwrap();
        let result: () = client.delete("/api/v0/channels/abc").await.unwrap();
        assert_eq!(result, ());
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            Client::new("not a url", "k"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            Client::new("ftp://example.com", "k"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(segment("my service/x"), "my%20service%2Fx");
    }
}
