//! Stateless analysis preview

use axum::{extract::State, Json};
use validator::Validate;

use crate::logic::assessor::assess;
use crate::logic::normalize::normalize_domain;
use crate::models::{AnalyzeRequest, AssessResponse};
use crate::{AppError, AppResult, AppState};

/// Analyze and assess a domain without touching any session or the ledger
pub async fn preview(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<AssessResponse>> {
    req.validate()?;

    let domain = normalize_domain(&req.domain);
    if domain.is_empty() {
        return Err(AppError::ValidationError("Domain is empty".to_string()));
    }

    let analysis = state.analyzer.analyze(&domain).await;
    let assessment = assess(&analysis);

    Ok(Json(AssessResponse { analysis, assessment }))
}
