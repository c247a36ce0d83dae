//! HTTP error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chainpay::error::{ConfigError, IntentError, StoreError, VerifyError};

/// Errors a request handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The `X-Owner-Id` header is absent or blank.
    #[error("missing owner identity")]
    MissingOwner,

    /// No intent exists for this reference and owner.
    #[error("payment intent not found")]
    NotFound,

    /// The request body is not the expected JSON.
    #[error("invalid request body: {}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    /// The requested amount is unusable.
    #[error("{0}")]
    InvalidAmount(String),

    /// Payment configuration is incomplete.
    #[error(transparent)]
    Config(ConfigError),

    /// The node cannot be reached with the current configuration.
    #[error("chain verification unavailable: {0}")]
    ChainUnavailable(ConfigError),

    /// The intent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IntentError> for ServerError {
    fn from(err: IntentError) -> Self {
        match err {
            IntentError::Config(e) => Self::Config(e),
            IntentError::InvalidAmount(_) | IntentError::Amount(_) => {
                Self::InvalidAmount(err.to_string())
            }
            IntentError::Store(e) => Self::Store(e),
        }
    }
}

impl From<VerifyError> for ServerError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Store(e) => Self::Store(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingOwner => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidBody(rejection) => rejection.status(),
            Self::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Self::ChainUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
