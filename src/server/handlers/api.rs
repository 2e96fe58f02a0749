//! JSON API handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::super::AppState;
use crate::faults::ClassifiedError;
use crate::services::PageOutcome;

/// Health check endpoint for load balancers.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_body(error: &ClassifiedError, detail: Option<&str>) -> Response {
    let mut body = serde_json::json!({
        "error": error.kind.as_str(),
        "message": error.user_message,
        "retryable": error.retryable,
    });
    if let Some(detail) = detail {
        body["detail"] = serde_json::Value::from(detail);
    }
    (error.status_code(), Json(body)).into_response()
}

/// Active templates as JSON.
pub async fn api_templates(State(state): State<AppState>) -> Response {
    match state.catalog.list_templates().await {
        PageOutcome::Content(templates) => Json(templates).into_response(),
        PageOutcome::Empty => Json(serde_json::json!([])).into_response(),
        PageOutcome::NotFound => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not_found" })),
        )
            .into_response(),
        PageOutcome::Unavailable(error) => error_body(&error, None),
        PageOutcome::Detailed { error, detail } => error_body(&error, Some(&detail)),
    }
}
