//! Error taxonomy for the Anthropic API adapter.

use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::errors::SearchError;

/// Errors from the Anthropic Messages API, classified for retry decisions.
#[derive(Debug, Clone, Error)]
pub enum AnthropicApiError {
    /// Malformed request body or parameters (400).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed (401) or key lacks permission (403).
    #[error("authentication failed ({0})")]
    Auth(StatusCode),

    /// Rate limit exceeded (429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// Server-side failure worth retrying (500, 502, 503, 504, 529).
    #[error("server error ({status}): {body}")]
    Server { status: StatusCode, body: String },

    /// Connection failure, timeout, or other transport problem.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not parse as a Messages API response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other status code.
    #[error("unexpected status ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },
}

impl AnthropicApiError {
    /// Classify an HTTP error status and body.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::Auth(status),
            429 => Self::RateLimited,
            500 | 502 | 503 | 504 | 529 => Self::Server { status, body },
            _ => Self::Unexpected { status, body },
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Server { .. } | Self::Network(_)
        )
    }
}

impl From<AnthropicApiError> for SearchError {
    fn from(err: AnthropicApiError) -> Self {
        SearchError::Llm(err.to_string())
    }
}
