use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub upload_dir: String,
    /// Whether an AI API key was found at startup
    pub ai_configured: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = if tokio::fs::metadata(state.receiver.upload_dir())
        .await
        .is_ok_and(|m| m.is_dir())
    {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        upload_dir: state.receiver.upload_dir().display().to_string(),
        ai_configured: state.config.gemini_api_key.is_some(),
    })
}
