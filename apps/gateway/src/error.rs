//! Request-time gateway errors and their HTTP mapping.

use crate::request::RequestError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use provider::ProviderError;
use serde_json::json;

/// Why a gateway request failed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The caller did not present a valid service key.
    #[error("not authenticated")]
    Unauthorized,
    /// Malformed caller input.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// No provider is routed for the request.
    #[error("no provider configured: {0}")]
    Routing(String),
    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::Routing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Provider(ProviderError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Provider(ProviderError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed with {status}: {self}");
        } else {
            tracing::debug!("request rejected with {status}: {self}");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
