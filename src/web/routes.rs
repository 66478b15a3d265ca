//! REST endpoints for the demo workflow and the live call.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use super::{ApiError, AppState};
use crate::profile::UserData;

pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "voice-agent-demo"
    }))
}

/// GET /api/workflow
pub(super) async fn get_workflow(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.workflow.snapshot().await)
}

/// POST /api/workflow/submit
///
/// Accepts the contact form and returns 202 once the analysis has started.
pub(super) async fn submit_form(
    State(state): State<AppState>,
    Json(user): Json<UserData>,
) -> Result<impl IntoResponse, ApiError> {
    state.workflow.submit_form(user).await?;
    Ok((StatusCode::ACCEPTED, Json(state.workflow.snapshot().await)))
}

/// POST /api/workflow/back
pub(super) async fn go_back(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.workflow.go_back().await?;
    info!("Visitor left the live demo");
    Ok(Json(state.workflow.snapshot().await))
}

/// POST /api/workflow/acknowledge
pub(super) async fn acknowledge_error(State(state): State<AppState>) -> impl IntoResponse {
    state.workflow.acknowledge_error().await;
    StatusCode::NO_CONTENT
}

/// POST /api/call/toggle
pub(super) async fn toggle_call(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.workflow.toggle_call().await?))
}

/// POST /api/call/stop
pub(super) async fn stop_call(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.workflow.stop_call().await?))
}

/// POST /api/call/reset
pub(super) async fn reset_call(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.workflow.reset_call().await?))
}

/// POST /api/demo/secure
pub(super) async fn secure_demo(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let delivery = state.workflow.request_secure_demo().await?;
    Ok(Json(serde_json::json!({"delivery": delivery})))
}
