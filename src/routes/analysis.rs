//! Analysis endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::analysis::{dispatch, AnalysisRequest, AnalysisResponse};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(analyze))
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: AnalysisResponse,
}

/// Run one analysis over the supplied content
async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<AnalyzeResponse>> {
    if !body.is_object() {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }
    let request: AnalysisRequest = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid analysis request: {}", e)))?;

    let data = dispatch(state.analysis(), request).await?;

    Ok(Json(AnalyzeResponse {
        success: true,
        data,
    }))
}
