//! Provider call errors

use std::time::Duration;
use thiserror::Error;

/// Failure of one provider completion call, after transport retries
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Provider rate limit hit (suggested wait {retry_after:?})")]
    RateLimited { retry_after: Duration },

    #[error("Provider returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unusable provider response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether asking the human to retry the same step could help
    ///
    /// Server-side and transport failures are transient; a bad request, a
    /// missing key or an unparseable body will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::ApiError { status, .. } => *status == 429 || *status >= 500,
            LlmError::InvalidResponse(_) | LlmError::MissingApiKey(_) | LlmError::Json(_) => false,
        }
    }
}
