//! Artifact Repository
//!
//! Persists generated videos on the local filesystem under a job-id-derived
//! name and removes them on eviction.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const VIDEO_EXTENSION: &str = "mp4";

/// Storage for generated artifacts
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Writes the artifact for a job and returns where it landed
    async fn persist(&self, job_id: Uuid, bytes: &[u8]) -> io::Result<PathBuf>;

    /// Deletes an artifact
    ///
    /// Returns `Ok(false)` when the file was already gone.
    async fn remove(&self, path: &Path) -> io::Result<bool>;

    /// Checks whether an artifact is present
    async fn exists(&self, path: &Path) -> bool;
}

/// Filesystem implementation of ArtifactStorage
#[derive(Debug, Clone)]
pub struct FsArtifactStorage {
    root: PathBuf,
}

impl FsArtifactStorage {
    /// Creates a storage rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if needed
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Final location of a job's video
    pub fn path_for(&self, job_id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", job_id, VIDEO_EXTENSION))
    }
}

#[async_trait]
impl ArtifactStorage for FsArtifactStorage {
    async fn persist(&self, job_id: Uuid, bytes: &[u8]) -> io::Result<PathBuf> {
        self.ensure_root().await?;

        let path = self.path_for(job_id);
        // Write beside the target and rename so readers never see a partial file
        let partial = path.with_extension(format!("{}.part", VIDEO_EXTENSION));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
