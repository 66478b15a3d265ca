//! HTTP surface: REST endpoints plus a WebSocket that streams workflow and
//! call updates to the browser.

pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::call::EventSource;
use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    /// Where browser-observed call events are fed back in. `None` ignores them.
    pub session_events: Option<EventSource>,
}

/// Build the Axum router with all demo routes.
pub fn demo_routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(routes::health))
        .route("/api/workflow", get(routes::get_workflow))
        .route("/api/workflow/submit", post(routes::submit_form))
        .route("/api/workflow/back", post(routes::go_back))
        .route("/api/workflow/acknowledge", post(routes::acknowledge_error))
        .route("/api/call/toggle", post(routes::toggle_call))
        .route("/api/call/stop", post(routes::stop_call))
        .route("/api/call/reset", post(routes::reset_call))
        .route("/api/demo/secure", post(routes::secure_demo))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Workflow errors rendered as JSON with a matching status code.
pub struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WorkflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WorkflowError::InvalidStep { .. } => StatusCode::CONFLICT,
            WorkflowError::Analysis(_) | WorkflowError::Provisioning(_) => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(serde_json::json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}
