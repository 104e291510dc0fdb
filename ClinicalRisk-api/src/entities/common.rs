use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use clinical_risk_domain::services::{ErrorKind, PredictionError};

/// Error response format for API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create an invalid input error response
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            error: ErrorKind::InvalidInput.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Status code for this error's kind
    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "forbidden" => StatusCode::FORBIDDEN,
            "invalid_input" => StatusCode::BAD_REQUEST,
            "invalid_response" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PredictionError> for ErrorResponse {
    fn from(err: PredictionError) -> Self {
        let kind = err.kind();

        // Model output and storage internals stay in the logs
        let message = match &err {
            PredictionError::InvalidResponse(_) => {
                error!("Rejected risk model response: {}", err);
                "The risk model returned a response that could not be used".to_string()
            }
            PredictionError::ServiceUnavailable(_) => {
                error!("Risk model unavailable: {}", err);
                "The risk model is currently unavailable, please retry later".to_string()
            }
            PredictionError::Storage(_) => {
                error!("Storage failure: {}", err);
                "An unexpected error occurred".to_string()
            }
            _ => err.to_string(),
        };

        Self {
            error: kind.as_str().to_string(),
            message,
            details: None,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
