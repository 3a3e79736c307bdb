//! Error types for the Gemini client

use serde::Deserialize;
use thiserror::Error;
use verdant_core::backend::BackendError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// `ErrorInfo.reason` values that mean the project cannot use a paid model
const ENTITLEMENT_REASONS: &[&str] = &["BILLING_DISABLED", "BILLING_NOT_ENABLED"];

/// Errors that can occur when using the Gemini client
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API key was supplied
    #[error("missing API key")]
    MissingCredentials,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Canonical RPC status, e.g. `FAILED_PRECONDITION`
        code: Option<String>,
        /// First `ErrorInfo.reason` attached to the error, if any
        reason: Option<String>,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from a status code and raw response body
    ///
    /// Google APIs wrap failures in `{"error": {"code", "message", "status", "details"}}`;
    /// when the body is not in that shape it is kept verbatim as the message.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();

        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => {
                let reason = envelope
                    .error
                    .details
                    .iter()
                    .find_map(|detail| detail.reason.clone());
                Self::ApiError {
                    status,
                    code: envelope.error.status,
                    reason,
                    message: envelope.error.message,
                }
            }
            Err(_) => Self::ApiError {
                status,
                code: None,
                reason: None,
                message: body,
            },
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error means the account lacks billing for the model
    ///
    /// The structured `ErrorInfo.reason` decides when present. The public API
    /// sometimes reports the billing precondition without details, so a
    /// `FAILED_PRECONDITION` that names billing is treated the same way.
    pub fn is_entitlement(&self) -> bool {
        match self {
            Self::ApiError {
                reason: Some(reason),
                ..
            } => ENTITLEMENT_REASONS.contains(&reason.as_str()),
            Self::ApiError {
                code: Some(code),
                message,
                ..
            } if code == "FAILED_PRECONDITION" => message.to_lowercase().contains("billing"),
            _ => false,
        }
    }
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        if err.is_entitlement() {
            let message = match err {
                ClientError::ApiError { message, .. } => message,
                other => other.to_string(),
            };
            return BackendError::Entitlement { message };
        }

        match err {
            ClientError::ApiError {
                status,
                code,
                message,
                ..
            } => BackendError::Rejected {
                status,
                code,
                message,
            },
            ClientError::RequestFailed(err) => BackendError::Transport(err.to_string()),
            ClientError::MissingCredentials => BackendError::Transport("missing API key".to_string()),
            ClientError::ParseError(msg) => BackendError::Malformed(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}
