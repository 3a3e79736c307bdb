//! Job domain types

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::analytics::FieldAnalytics;

/// Video generation job status
///
/// `Ready` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Generating,
    Ready,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Ready => write!(f, "ready"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Rejected state change on a job record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job {id} is already {status}")]
    AlreadyTerminal { id: Uuid, status: JobStatus },
}

/// Tracks one video generation request from submission to a terminal state
///
/// State only moves through [`JobRecord::mark_ready`] and
/// [`JobRecord::mark_error`], which refuse to leave a terminal state.
#[derive(Debug, Clone)]
pub struct JobRecord {
    id: Uuid,
    status: JobStatus,
    output_url: Option<String>,
    artifact_path: Option<PathBuf>,
    analytics: Option<FieldAnalytics>,
    error: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Creates a new record in `Generating` state
    pub fn new(analytics: Option<FieldAnalytics>) -> Self {
        Self::new_at(analytics, Utc::now())
    }

    /// Creates a new record with an explicit creation time
    pub fn new_at(analytics: Option<FieldAnalytics>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Generating,
            output_url: None,
            artifact_path: None,
            analytics,
            error: None,
            note: None,
            created_at,
            completed_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// URL a client can render: the generated video or the substitute clip
    pub fn output_url(&self) -> Option<&str> {
        self.output_url.as_deref()
    }

    /// Local file backing the output, when one was generated
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    pub fn analytics(&self) -> Option<&FieldAnalytics> {
        self.analytics.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Age of the record relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Transitions to `Ready` with a renderable output
    pub fn mark_ready(
        &mut self,
        output_url: impl Into<String>,
        artifact_path: Option<PathBuf>,
        note: Option<String>,
    ) -> Result<(), TransitionError> {
        self.ensure_generating()?;

        self.status = JobStatus::Ready;
        self.output_url = Some(output_url.into());
        self.artifact_path = artifact_path;
        self.note = note;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Transitions to `Error`, still attaching a fallback output
    pub fn mark_error(
        &mut self,
        message: impl Into<String>,
        fallback_url: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.ensure_generating()?;

        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.output_url = Some(fallback_url.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_generating(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_generating() {
        let job = JobRecord::new(None);
        assert_eq!(job.status(), JobStatus::Generating);
        assert!(job.output_url().is_none());
        assert!(job.completed_at().is_none());
    }

    #[test]
    fn test_mark_ready_sets_output() {
        let mut job = JobRecord::new(None);
        job.mark_ready("/api/field-vision/video/x", Some(PathBuf::from("/tmp/x.mp4")), None)
            .unwrap();

        assert_eq!(job.status(), JobStatus::Ready);
        assert_eq!(job.output_url(), Some("/api/field-vision/video/x"));
        assert_eq!(job.artifact_path(), Some(Path::new("/tmp/x.mp4")));
        assert!(job.completed_at().is_some());
    }

    #[test]
    fn test_mark_error_keeps_fallback_output() {
        let mut job = JobRecord::new(None);
        job.mark_error("backend down", "https://example.com/clip.mp4")
            .unwrap();

        assert_eq!(job.status(), JobStatus::Error);
        assert_eq!(job.error(), Some("backend down"));
        assert_eq!(job.output_url(), Some("https://example.com/clip.mp4"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = JobRecord::new(None);
        job.mark_ready("https://example.com/a.mp4", None, None).unwrap();

        let err = job.mark_error("late failure", "https://example.com/b.mp4");
        assert!(matches!(
            err,
            Err(TransitionError::AlreadyTerminal {
                status: JobStatus::Ready,
                ..
            })
        ));
        assert!(job.mark_ready("https://example.com/c.mp4", None, None).is_err());
        assert_eq!(job.output_url(), Some("https://example.com/a.mp4"));
        assert!(job.error().is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let value = serde_json::to_value(JobStatus::Generating).unwrap();
        assert_eq!(value, serde_json::json!("generating"));
    }
}
