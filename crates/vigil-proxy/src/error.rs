//! Gateway error responses.
//!
//! Gateway-generated failures carry a `type` discriminant so a client can
//! tell a refused request apart from an upstream failure. Upstream error
//! responses (a provider's own 4xx/5xx) are passed through untouched and
//! never go through this type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use vigil_core::{PluginFault, RepositoryError};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No provider prefix matches the path.
    #[error("No provider route for {0}")]
    RouteMiss(String),

    /// A request-phase plugin refused the request.
    #[error("Request blocked by {plugin}: {reason}")]
    Blocked { plugin: String, reason: String },

    /// A plugin faulted while the gateway runs fail-closed.
    #[error("Plugin {} failed: {}", .0.plugin, .0.error)]
    Pipeline(PluginFault),

    /// The upstream provider could not be reached or its body not read.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RouteMiss(_) => StatusCode::NOT_FOUND,
            Self::Blocked { .. } => StatusCode::FORBIDDEN,
            Self::Pipeline(_) | Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable discriminant for client-side handling.
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::RouteMiss(_) => "gateway_routing_error",
            Self::Blocked { .. } => "gateway_blocked",
            Self::Pipeline(_) => "gateway_pipeline_error",
            Self::Upstream(_) => "upstream_error",
            Self::BadRequest(_) => "invalid_request",
            Self::Storage(_) => "gateway_storage_error",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::RouteMiss(_) => "No provider matches this path",
            Self::Blocked { .. } => "Request blocked by gateway policy",
            Self::Pipeline(_) => "Gateway plugin pipeline failed",
            Self::Upstream(_) => "Upstream provider request failed",
            Self::BadRequest(_) => "Invalid request",
            Self::Storage(_) => "Gateway storage failed",
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    message: &'static str,
    detail: String,
    #[serde(rename = "type")]
    error_type: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                message: self.message(),
                detail: self.to_string(),
                error_type: self.error_type(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for GatewayError {
    fn from(err: RepositoryError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}
