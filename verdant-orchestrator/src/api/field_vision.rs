//! Field Vision API Handlers
//!
//! HTTP endpoints for uploading field photographs and following the
//! resulting video jobs.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;
use verdant_core::domain::job::JobStatus;
use verdant_core::dto::analysis::AnalyzeResponse;
use verdant_core::dto::job::{JobView, SweepReport};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// Uploaded photograph
struct Upload {
    image: Vec<u8>,
    mime_type: String,
    crop_hint: String,
}

// =============================================================================
// Analysis
// =============================================================================

/// POST /api/field-vision/analyze
/// Analyze a field photograph and start generating its video
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    tracing::info!(
        "Analyzing {} byte {} upload",
        upload.image.len(),
        upload.mime_type
    );

    let analytics = state
        .analyzer
        .analyze(&upload.image, &upload.mime_type, &upload.crop_hint)
        .await;

    let job_id = state
        .orchestrator
        .submit(upload.image, upload.mime_type, Some(analytics.clone()))?;
    let job = state
        .orchestrator
        .get_job(job_id)
        .ok_or_else(|| ApiError::InternalError(format!("Job {} vanished", job_id)))?;

    let video_url = (job.status() == JobStatus::Ready)
        .then(|| job.output_url().map(str::to_string))
        .flatten();

    Ok(Json(AnalyzeResponse {
        job_id,
        status: job.status(),
        video_url,
        analytics,
    }))
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> ApiResult<Upload> {
    let mut image = None;
    let mut crop_hint = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !mime_type.starts_with("image/") {
                    return Err(ApiError::BadRequest(format!(
                        "Expected an image upload, got {}",
                        mime_type
                    )));
                }
                image = Some((field.bytes().await?.to_vec(), mime_type));
            }
            "crop_hint" => crop_hint = field.text().await?,
            _ => {}
        }
    }

    let (image, mime_type) =
        image.ok_or_else(|| ApiError::BadRequest("Missing image field".to_string()))?;
    if image.is_empty() {
        return Err(ApiError::BadRequest("Image is empty".to_string()));
    }
    if image.len() > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "Image exceeds the {} byte limit",
            max_bytes
        )));
    }

    Ok(Upload {
        image,
        mime_type,
        crop_hint: crop_hint.trim().to_string(),
    })
}

// =============================================================================
// Jobs
// =============================================================================

/// GET /api/field-vision/job/{id}
/// Get the current state of a video job
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobView>> {
    tracing::debug!("Getting job: {}", id);

    let job = state
        .orchestrator
        .get_job(id)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(JobView::from(&job)))
}

/// GET /api/field-vision/video/{id}
/// Serve a generated video
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let path = state
        .orchestrator
        .artifact_path(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Video for job {} not found", id)))?;

    let bytes = tokio::fs::read(&path).await?;
    Ok(([(header::CONTENT_TYPE, "video/mp4")], bytes))
}

#[derive(Debug, Deserialize)]
pub struct SweepParams {
    pub max_age_seconds: Option<u64>,
}

/// POST /api/field-vision/sweep
/// Evict expired jobs and their videos
pub async fn sweep(
    State(state): State<AppState>,
    Query(params): Query<SweepParams>,
) -> Json<SweepReport> {
    let max_age = params
        .max_age_seconds
        .map(Duration::from_secs)
        .unwrap_or(state.retention);
    tracing::info!("Manual sweep, max age {}s", max_age.as_secs());

    Json(state.orchestrator.sweep(max_age).await)
}
