//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// "pool", "single_model" or "passthrough_only"
    pub mode: &'static str,
}

/// Health check handler
///
/// Always returns 200 OK. `mode` reports which routing context the server
/// was started with; it does not probe upstream deployments.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mode = if state.pool().is_some() {
        "pool"
    } else if state.single_model().is_some() {
        "single_model"
    } else {
        "passthrough_only"
    };

    (StatusCode::OK, Json(HealthResponse { status: "OK", mode }))
}
