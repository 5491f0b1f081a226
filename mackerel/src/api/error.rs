use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Synthesized when a lookup by key finds nothing
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: check the API key")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// True for HTTP 404 responses and for synthesized lookup misses
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::NotFound { .. } | ApiError::ApiError { status: 404, .. }
        )
    }
}

/// Mackerel error body: `{"error": {"message": "..."}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorBody {
    Message { message: String },
    Plain(String),
}

impl ErrorBody {
    pub fn into_message(self) -> String {
        match self {
            ErrorBody::Message { message } => message,
            ErrorBody::Plain(message) => message,
        }
    }
}
