//! Error taxonomy for generative API calls.
//!
//! Every failure a stream can end with is one of these variants. The session
//! controller only needs to know that an error is terminal; the variants exist
//! so the user gets a message that says what went wrong.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("API Key Error: {var} environment variable not set.")]
    MissingApiKey { var: &'static str },

    #[error("API Permission Denied. Check Key/Permissions. {0}")]
    PermissionDenied(String),

    #[error("API Quota Exceeded. {0}")]
    QuotaExceeded(String),

    #[error("Location not supported by API.")]
    UnsupportedRegion,

    #[error("API key not valid. {0}")]
    InvalidKey(String),

    #[error("Invalid API Argument. {0}")]
    InvalidArgument(String),

    #[error("Model/Resource Not Found. {0}")]
    NotFound(String),

    #[error("API Precondition Failed (Billing?). {0}")]
    FailedPrecondition(String),

    #[error("API Internal Server Error. {0}")]
    ServerError(String),

    #[error("API Service Unavailable. {0}")]
    Unavailable(String),

    #[error("Blocked by safety filters. Reason: {reason}. Category: {category}.")]
    SafetyBlocked { reason: String, category: String },

    #[error("cancelled")]
    Cancelled,

    #[error("API stream call failed: {0}")]
    Other(String),
}

impl ProviderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }

    /// Classify a non-success HTTP response from the Google API.
    ///
    /// The body is usually `{"error": {"code": .., "message": .., "status": ..}}`;
    /// the textual `status` wins over the numeric HTTP code when present.
    pub fn from_response(http_status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error);

        let (status, message) = match parsed {
            Some(detail) => (
                detail.status.unwrap_or_default(),
                detail.message.unwrap_or_default(),
            ),
            None => (String::new(), truncate_body(body)),
        };

        match (status.as_str(), http_status) {
            ("PERMISSION_DENIED" | "UNAUTHENTICATED", _) | ("", 401 | 403) => {
                ProviderError::PermissionDenied(message)
            }
            ("RESOURCE_EXHAUSTED", _) | ("", 429) => ProviderError::QuotaExceeded(message),
            ("INVALID_ARGUMENT", _) | ("", 400) => classify_invalid_argument(message),
            ("NOT_FOUND", _) | ("", 404) => ProviderError::NotFound(message),
            ("FAILED_PRECONDITION", _) => ProviderError::FailedPrecondition(message),
            ("INTERNAL", _) | ("", 500) => ProviderError::ServerError(message),
            ("UNAVAILABLE", _) | ("", 503) => ProviderError::Unavailable(message),
            _ => ProviderError::Other(format!("HTTP {http_status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Other(err.to_string())
    }
}

fn classify_invalid_argument(message: String) -> ProviderError {
    if message.contains("User location is not supported") {
        ProviderError::UnsupportedRegion
    } else if message.contains("API key not valid") {
        ProviderError::InvalidKey(message)
    } else {
        ProviderError::InvalidArgument(message)
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 800 {
        let head: String = trimmed.chars().take(800).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}
