//! Test doubles for the generation backend, the poll sleeper and storage

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;
use verdant_core::backend::{
    Artifact, BackendError, GenerationBackend, GenerationRequest, Operation,
};

use crate::repository::artifact_repository::{ArtifactStorage, FsArtifactStorage};
use crate::service::janitor::Janitor;
use crate::service::sleeper::Sleeper;

pub const TEST_VIDEO_URI: &str = "https://files.test/video.mp4";
pub const TEST_VIDEO_BYTES: &[u8] = b"fake-mp4-bytes";

/// How a started operation ends
#[derive(Debug, Clone)]
pub enum Finish {
    Artifacts(Vec<Artifact>),
    Failed(String),
    PollError(BackendError),
}

/// Backend whose every answer is scripted up front
pub struct ScriptedBackend {
    start_failures: HashMap<String, BackendError>,
    content_failures: HashMap<String, BackendError>,
    content: String,
    pending_polls: usize,
    finish: Finish,
    started: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    content_models: Mutex<Vec<String>>,
    polls: Mutex<usize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            start_failures: HashMap::new(),
            content_failures: HashMap::new(),
            content: String::new(),
            pending_polls: 0,
            finish: Finish::Artifacts(vec![Artifact {
                uri: TEST_VIDEO_URI.to_string(),
            }]),
            started: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            content_models: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
        }
    }

    pub fn fail_start(mut self, model: &str, err: BackendError) -> Self {
        self.start_failures.insert(model.to_string(), err);
        self
    }

    pub fn fail_content(mut self, model: &str, err: BackendError) -> Self {
        self.content_failures.insert(model.to_string(), err);
        self
    }

    pub fn with_content(mut self, text: &str) -> Self {
        self.content = text.to_string();
        self
    }

    /// Number of polls that report the operation as still running
    pub fn pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn never_done(self) -> Self {
        self.pending_polls(usize::MAX)
    }

    pub fn finish(mut self, finish: Finish) -> Self {
        self.finish = finish;
        self
    }

    pub fn started_models(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn content_models(&self) -> Vec<String> {
        self.content_models.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn start_generation(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<Operation, BackendError> {
        self.started.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(request.prompt.clone());

        match self.start_failures.get(model) {
            Some(err) => Err(err.clone()),
            None => Ok(Operation::pending(format!("operations/{}", model))),
        }
    }

    async fn poll_operation(&self, operation: &Operation) -> Result<Operation, BackendError> {
        let polls = {
            let mut polls = self.polls.lock().unwrap();
            *polls += 1;
            *polls
        };

        if polls <= self.pending_polls {
            return Ok(Operation::pending(operation.name.clone()));
        }

        let mut finished = Operation::pending(operation.name.clone());
        finished.done = true;
        match &self.finish {
            Finish::Artifacts(artifacts) => finished.artifacts = artifacts.clone(),
            Finish::Failed(message) => finished.error = Some(message.clone()),
            Finish::PollError(err) => return Err(err.clone()),
        }
        Ok(finished)
    }

    async fn fetch_artifact(&self, _artifact: &Artifact) -> Result<Vec<u8>, BackendError> {
        Ok(TEST_VIDEO_BYTES.to_vec())
    }

    async fn generate_content(
        &self,
        model: &str,
        _prompt: &str,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<String, BackendError> {
        self.content_models.lock().unwrap().push(model.to_string());

        match self.content_failures.get(model) {
            Some(err) => Err(err.clone()),
            None => Ok(self.content.clone()),
        }
    }
}

/// Sleeper that returns immediately and remembers every requested wait
#[derive(Default)]
pub struct InstantSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Sleeper that sweeps every job out of the store whenever it is asked to wait
pub struct EvictingSleeper {
    janitor: Janitor,
    evicted: Mutex<Vec<Uuid>>,
}

impl EvictingSleeper {
    pub fn new(janitor: Janitor) -> Self {
        Self {
            janitor,
            evicted: Mutex::new(Vec::new()),
        }
    }

    pub fn evicted(&self) -> Vec<Uuid> {
        self.evicted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for EvictingSleeper {
    async fn sleep(&self, _duration: Duration) {
        let later = chrono::Utc::now() + chrono::Duration::seconds(1);
        let report = self.janitor.sweep_at(Duration::ZERO, later).await;
        self.evicted.lock().unwrap().extend(report.removed);
    }
}

/// Filesystem storage that remembers which files it was asked to remove
pub struct RecordingStorage {
    inner: FsArtifactStorage,
    removed: Mutex<Vec<PathBuf>>,
}

impl RecordingStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FsArtifactStorage::new(root),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn path_for(&self, job_id: Uuid) -> PathBuf {
        self.inner.path_for(job_id)
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStorage for RecordingStorage {
    async fn persist(&self, job_id: Uuid, bytes: &[u8]) -> io::Result<PathBuf> {
        self.inner.persist(job_id, bytes).await
    }

    async fn remove(&self, path: &Path) -> io::Result<bool> {
        let removed = self.inner.remove(path).await;
        self.removed.lock().unwrap().push(path.to_path_buf());
        removed
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }
}
