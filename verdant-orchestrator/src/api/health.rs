//! Health Check API Handler
//!
//! Simple health check endpoint for monitoring.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::AppState;

/// GET /health
/// Health check endpoint, reporting whether video generation is live
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let generation = if state.orchestrator.backend_available() {
        "live"
    } else {
        "substitute"
    };

    Json(json!({ "status": "ok", "generation": generation }))
}
