//! Janitor
//!
//! Evicts jobs past the retention window and deletes their videos.
//! It does not schedule itself; the server runs it on an interval.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use verdant_core::dto::job::SweepReport;

use crate::repository::artifact_repository::ArtifactStorage;
use crate::repository::job_repository::JobStore;

/// Retention used when none is configured (48 hours)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(172_800);

#[derive(Clone)]
pub struct Janitor {
    store: Arc<JobStore>,
    storage: Arc<dyn ArtifactStorage>,
}

impl Janitor {
    pub fn new(store: Arc<JobStore>, storage: Arc<dyn ArtifactStorage>) -> Self {
        Self { store, storage }
    }

    /// Remove every job older than `max_age`
    pub async fn sweep(&self, max_age: Duration) -> SweepReport {
        self.sweep_at(max_age, Utc::now()).await
    }

    /// Remove every job older than `max_age` as seen at `now`
    pub async fn sweep_at(&self, max_age: Duration, now: DateTime<Utc>) -> SweepReport {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let mut report = SweepReport::default();

        for id in self.store.list_expired(max_age, now) {
            let Some(job) = self.store.remove(id) else {
                continue;
            };
            report.removed.push(id);

            let Some(path) = job.artifact_path() else {
                continue;
            };
            match self.storage.remove(path).await {
                Ok(true) => report.artifacts_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to delete video {}: {}", path.display(), e);
                    report.artifact_failures += 1;
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                "Swept {} expired jobs, deleted {} videos",
                report.removed.len(),
                report.artifacts_deleted
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::artifact_repository::FsArtifactStorage;
    use verdant_core::domain::job::JobRecord;

    struct Fixture {
        janitor: Janitor,
        store: Arc<JobStore>,
        storage: Arc<FsArtifactStorage>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JobStore::new());
        let storage = Arc::new(FsArtifactStorage::new(dir.path()));
        let janitor = Janitor::new(store.clone(), storage.clone());

        Fixture {
            janitor,
            store,
            storage,
            _dir: dir,
        }
    }

    async fn ready_job(f: &Fixture, created_at: DateTime<Utc>) -> (uuid::Uuid, std::path::PathBuf) {
        let id = f.store.create(JobRecord::new_at(None, created_at)).unwrap();
        let path = f.storage.persist(id, b"video").await.unwrap();
        let stored = path.clone();
        f.store
            .update(id, |job| job.mark_ready("/video", Some(stored), None))
            .unwrap();
        (id, path)
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_jobs() {
        let f = fixture();
        let now = Utc::now();

        let (old_id, old_path) = ready_job(&f, now - TimeDelta::hours(50)).await;
        let (new_id, new_path) = ready_job(&f, now - TimeDelta::hours(1)).await;
        let pending = f.store.create(JobRecord::new_at(None, now)).unwrap();

        let report = f.janitor.sweep_at(DEFAULT_RETENTION, now).await;

        assert_eq!(report.removed, vec![old_id]);
        assert_eq!(report.artifacts_deleted, 1);
        assert_eq!(report.artifact_failures, 0);
        assert!(f.store.get(old_id).is_none());
        assert!(!old_path.exists());

        assert!(f.store.get(new_id).is_some());
        assert!(f.store.get(pending).is_some());
        assert!(new_path.exists());
    }

    #[tokio::test]
    async fn test_sweep_tolerates_missing_video() {
        let f = fixture();
        let now = Utc::now();

        let (id, path) = ready_job(&f, now - TimeDelta::hours(3)).await;
        std::fs::remove_file(&path).unwrap();

        let report = f.janitor.sweep_at(Duration::from_secs(3600), now).await;

        assert_eq!(report.removed, vec![id]);
        assert_eq!(report.artifacts_deleted, 0);
        assert_eq!(report.artifact_failures, 0);
    }

    #[tokio::test]
    async fn test_sweep_of_empty_store() {
        let f = fixture();
        let report = f.janitor.sweep(Duration::ZERO).await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_huge_retention_keeps_everything() {
        let f = fixture();
        let now = Utc::now();
        f.store
            .create(JobRecord::new_at(None, now - TimeDelta::days(3650)))
            .unwrap();

        let report = f.janitor.sweep_at(Duration::MAX, now).await;

        assert!(report.is_empty());
        assert_eq!(f.store.len(), 1);
    }
}
