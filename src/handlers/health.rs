use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::context::AppContext;

/// Health check endpoint
/// Returns 200 OK if the service is running
pub async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "service": "loghub",
        "version": env!("CARGO_PKG_VERSION"),
        "observers": ctx.hub.observer_count(),
    })))
}
