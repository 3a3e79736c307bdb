//! Job DTOs for the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analytics::FieldAnalytics;
use crate::domain::job::{JobRecord, JobStatus};

/// Job state as exposed to polling clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub video_url: Option<String>,
    pub analytics: Option<FieldAnalytics>,
    pub error: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&JobRecord> for JobView {
    fn from(job: &JobRecord) -> Self {
        Self {
            job_id: job.id(),
            status: job.status(),
            video_url: job.output_url().map(str::to_string),
            analytics: job.analytics().cloned(),
            error: job.error().map(str::to_string),
            note: job.note().map(str::to_string),
            created_at: job.created_at(),
            completed_at: job.completed_at(),
        }
    }
}

/// Outcome of a retention sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Jobs evicted from the store
    pub removed: Vec<Uuid>,
    /// Artifact files deleted from storage
    pub artifacts_deleted: usize,
    /// Artifact files that could not be deleted
    pub artifact_failures: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}
