//! Backend client errors.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Shown when the backend cannot be reached at all.
pub const UNREACHABLE_MESSAGE: &str =
    "The store backend is unreachable. Check that the API is running and try again.";

/// Shown when the backend rejects requests because the brand is not set up.
pub const CONFIGURATION_MESSAGE: &str =
    "The store brand is not configured on the backend. Set STOREFRONT_BRAND to a configured brand.";

const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when talking to the store backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The connection was refused or could not be established.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend rejected the request because tenant/brand setup is missing.
    #[error("backend configuration error: {0}")]
    Configuration(String),

    /// The requested resource does not exist (any more).
    #[error("resource not found")]
    NotFound,

    /// Any other non-2xx response.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    /// Transport failure other than connection refusal.
    #[error("http error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for showing to a shopper.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Unreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            Self::Configuration(_) => CONFIGURATION_MESSAGE.to_string(),
            Self::NotFound => "The requested item could not be found.".to_string(),
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(source) => source.to_string(),
            Self::Decode(detail) => detail.clone(),
        };

        if message.trim().is_empty() {
            GENERIC_MESSAGE.to_string()
        } else {
            message
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            return Self::Unreachable(error.to_string());
        }

        if error.is_decode() {
            return Self::Decode(error.to_string());
        }

        if error.status() == Some(StatusCode::NOT_FOUND) {
            return Self::NotFound;
        }

        Self::Transport(error)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,

    #[serde(default)]
    detail: Option<String>,
}

/// Classify a non-2xx response from its status and raw body.
pub(crate) fn from_response(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound;
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).ok();

    let message = parsed
        .and_then(|body| body.error.or(body.detail))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or(GENERIC_MESSAGE)
                .to_string()
        });

    if mentions_brand(body) {
        return ApiError::Configuration(message);
    }

    ApiError::Rejected { status, message }
}

fn mentions_brand(body: &str) -> bool {
    body.to_ascii_lowercase().contains("brand")
}
