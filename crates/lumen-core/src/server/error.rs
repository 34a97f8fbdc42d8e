//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::pipeline::PipelineError;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The request body could not be read as a query.
    Validation(String),
    /// The pipeline failed.
    Pipeline(PipelineError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Pipeline(PipelineError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Pipeline(err) if err.is_remote() => StatusCode::BAD_GATEWAY,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::Validation(message) => ErrorResponse {
                error_type: "validation_error".to_string(),
                message: message.clone(),
            },
            Self::Pipeline(err) => {
                ErrorResponse { error_type: err.kind().to_string(), message: err.to_string() }
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Pipeline(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        if status.is_server_error() {
            error!(status = status.as_u16(), error_type = %body.error_type, message = %body.message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error_type = %body.error_type, message = %body.message, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}
