//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    analyzer: &'static str,
    network: String,
    active_sessions: usize,
    timestamp: i64,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: crate::constants::APP_VERSION,
        analyzer: state.analyzer.name(),
        network: state.config.network.clone(),
        active_sessions: state.sessions.len(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
