//! Analysis DTOs for the HTTP API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analytics::FieldAnalytics;
use crate::domain::job::JobStatus;

/// Response to an image upload: the analytics plus the video job tracking it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// Present when the job finished synchronously
    pub video_url: Option<String>,
    pub analytics: FieldAnalytics,
}
