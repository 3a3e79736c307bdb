//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod field_vision;
pub mod health;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::analysis_service::FieldAnalyzer;
use crate::service::generation_service::GenerationOrchestrator;

/// Room for multipart framing and the crop hint on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: GenerationOrchestrator,
    pub analyzer: FieldAnalyzer,
    pub max_upload_bytes: usize,
    pub retention: Duration,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Field vision endpoints
        .route("/api/field-vision/analyze", post(field_vision::analyze))
        .route("/api/field-vision/job/{id}", get(field_vision::get_job))
        .route("/api/field-vision/video/{id}", get(field_vision::get_video))
        .route("/api/field-vision/sweep", post(field_vision::sweep))
        // Add state and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
