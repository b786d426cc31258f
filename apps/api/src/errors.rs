use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::pipeline::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Unparsable model output: {0}")]
    UnparsableOutput(String),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidInput(msg) => AppError::Validation(msg),
            AnalysisError::Provider(e) => AppError::Upstream(e.to_string()),
            e @ AnalysisError::UnparsableModelOutput { .. } => {
                AppError::UnparsableOutput(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!("Error calling model provider: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "Failed to communicate with the analysis service.".to_string(),
                )
            }
            AppError::UnparsableOutput(msg) => {
                tracing::error!("Model output could not be parsed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UNPARSABLE_MODEL_OUTPUT",
                    "The analysis service returned an unreadable response.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
