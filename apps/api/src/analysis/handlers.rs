//! Axum route handler for the analysis API.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use tracing::info;

use crate::analysis::models::AnalysisResult;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: Option<String>,
    pub role: Option<String>,
}

/// POST /analyze
///
/// Runs one analysis of `text` from the perspective of `role`.
/// Missing fields, empty fields and oversized documents are rejected with 400.
pub async fn handle_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let (Some(text), Some(role)) = (request.text, request.role) else {
        return Err(AppError::Validation(
            "Missing document text or role in request.".to_string(),
        ));
    };

    let limit = state.config.max_document_chars;
    if text.chars().count() > limit {
        return Err(AppError::Validation(format!(
            "Document text exceeds the {limit} character limit"
        )));
    }

    info!("Analyzing document as '{}' ({} bytes)", role, text.len());

    let result = state.pipeline.analyze(&role, &text).await?;
    Ok(Json(result))
}
