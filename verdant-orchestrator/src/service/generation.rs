//! Generation Service
//!
//! Accepts field-vision requests, tracks each one as a job and drives the
//! remote video generation in the background until the job reaches a
//! terminal state. A job always ends with something renderable: the
//! generated video, or the substitute clip when generation was not possible.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use verdant_core::backend::{
    BackendError, GenerationBackend, GenerationRequest, Operation, OutputParams,
};
use verdant_core::domain::analytics::FieldAnalytics;
use verdant_core::domain::job::{JobRecord, JobStatus};
use verdant_core::dto::job::SweepReport;

use crate::repository::artifact_repository::ArtifactStorage;
use crate::repository::job_repository::{JobStore, StoreError};
use crate::service::janitor::Janitor;
use crate::service::resolver::{self, Exhausted};
use crate::service::sleeper::{Sleeper, TokioSleeper};

/// Video models tried in order
pub const DEFAULT_VIDEO_MODELS: [&str; 3] = [
    "veo-3.1-generate-preview",
    "veo-3.0-generate-001",
    "veo-2.0-generate-001",
];

/// Stock aerial farm clip served when no video could be generated
pub const DEFAULT_SUBSTITUTE_VIDEO_URL: &str =
    "https://videos.pexels.com/video-files/852395/852395-hd_1280_720_25fps.mp4";

/// Public route under which generated videos are served
pub const DEFAULT_VIDEO_URL_BASE: &str = "/api/field-vision/video";

/// Prompt used when the analysis did not provide one
pub const DEFAULT_VIDEO_PROMPT: &str = "Cinematic aerial timelapse of a barren agricultural \
    field turning into lush, thriving farmland over one growing season. Slow drone orbit.";

const OFFLINE_NOTE: &str = "Video generation is not configured; showing a stock clip.";
/// Attempts at registering a job before giving up
const MAX_CREATE_ATTEMPTS: usize = 3;

const ENTITLEMENT_NOTE: &str =
    "Video generation requires a billing-enabled account; showing a stock clip.";

/// Tunables of the generation pipeline
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub candidate_models: Vec<String>,
    pub output: OutputParams,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub substitute_video_url: String,
    pub video_url_base: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            candidate_models: DEFAULT_VIDEO_MODELS.iter().map(|m| m.to_string()).collect(),
            output: OutputParams::default(),
            poll_interval: Duration::from_secs(10),
            max_polls: 42,
            substitute_video_url: DEFAULT_SUBSTITUTE_VIDEO_URL.to_string(),
            video_url_base: DEFAULT_VIDEO_URL_BASE.to_string(),
        }
    }
}

impl GenerationSettings {
    /// Public URL of a job's generated video
    pub fn video_url(&self, job_id: Uuid) -> String {
        format!("{}/{}", self.video_url_base.trim_end_matches('/'), job_id)
    }
}

/// Why a generation did not produce a video
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend is not configured")]
    ClientUnavailable,

    #[error(transparent)]
    AllCandidatesExhausted(Exhausted),

    #[error("operation not done after {polls} polls ({}s)", .waited.as_secs())]
    OperationTimeout { polls: u32, waited: Duration },

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("operation finished without producing a video")]
    NoArtifactsProduced,

    #[error("entitlement required: {0}")]
    EntitlementRequired(String),

    #[error(transparent)]
    Backend(BackendError),

    #[error("failed to store video: {0}")]
    Storage(#[from] io::Error),
}

impl From<BackendError> for GenerationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Entitlement { message } => GenerationError::EntitlementRequired(message),
            other => GenerationError::Backend(other),
        }
    }
}

impl From<Exhausted> for GenerationError {
    fn from(exhausted: Exhausted) -> Self {
        match exhausted.last_error() {
            Some(BackendError::Entitlement { message }) => {
                GenerationError::EntitlementRequired(message.clone())
            }
            _ => GenerationError::AllCandidatesExhausted(exhausted),
        }
    }
}

impl GenerationError {
    /// Expected failures that still count as a usable result
    pub fn is_substitutable(&self) -> bool {
        matches!(
            self,
            GenerationError::ClientUnavailable | GenerationError::EntitlementRequired(_)
        )
    }
}

/// Owns the job lifecycle for video generation
#[derive(Clone)]
pub struct GenerationOrchestrator {
    store: Arc<JobStore>,
    backend: Option<Arc<dyn GenerationBackend>>,
    storage: Arc<dyn ArtifactStorage>,
    sleeper: Arc<dyn Sleeper>,
    settings: Arc<GenerationSettings>,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        backend: Option<Arc<dyn GenerationBackend>>,
        storage: Arc<dyn ArtifactStorage>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            store,
            backend,
            storage,
            sleeper: Arc::new(TokioSleeper),
            settings: Arc::new(settings),
        }
    }

    /// Replace the sleeper used between polls
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn backend_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Register a job and start generating its video
    ///
    /// Returns immediately. Without a backend the job is already `ready`
    /// with the substitute clip when this returns.
    pub fn submit(
        &self,
        image: Vec<u8>,
        mime_type: impl Into<String>,
        analytics: Option<FieldAnalytics>,
    ) -> Result<Uuid, StoreError> {
        let prompt = analytics
            .as_ref()
            .map(|a| a.generation_prompt().trim())
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_VIDEO_PROMPT)
            .to_string();

        let id = create_job(&self.store, || JobRecord::new(analytics.clone()))?;

        let Some(backend) = self.backend.clone() else {
            let offline = Err(GenerationError::ClientUnavailable);
            if let Err(err) = record_outcome(&self.store, &self.settings, id, offline) {
                tracing::error!("Could not resolve offline job {}: {}", id, err);
            }
            return Ok(id);
        };

        let task = GenerationTask {
            job_id: id,
            request: GenerationRequest {
                prompt,
                image,
                mime_type: mime_type.into(),
                params: self.settings.output.clone(),
            },
            backend,
            store: Arc::clone(&self.store),
            storage: Arc::clone(&self.storage),
            sleeper: Arc::clone(&self.sleeper),
            settings: Arc::clone(&self.settings),
        };
        tokio::spawn(task.run());

        tracing::info!("Job {} created, generation started", id);
        Ok(id)
    }

    /// Get a snapshot of a job
    pub fn get_job(&self, id: Uuid) -> Option<JobRecord> {
        self.store.get(id)
    }

    /// Local file of a finished job's video, if it is still on disk
    pub async fn artifact_path(&self, id: Uuid) -> Option<PathBuf> {
        let job = self.store.get(id)?;
        if job.status() != JobStatus::Ready {
            return None;
        }

        let path = job.artifact_path()?.to_path_buf();
        self.storage.exists(&path).await.then_some(path)
    }

    /// Evict jobs older than `max_age` together with their videos
    pub async fn sweep(&self, max_age: Duration) -> SweepReport {
        self.janitor().sweep(max_age).await
    }

    pub fn janitor(&self) -> Janitor {
        Janitor::new(Arc::clone(&self.store), Arc::clone(&self.storage))
    }
}

/// Store a fresh record, retrying a bounded number of times on id collisions
fn create_job(
    store: &JobStore,
    mut make_record: impl FnMut() -> JobRecord,
) -> Result<Uuid, StoreError> {
    let mut attempt = 1;
    loop {
        match store.create(make_record()) {
            Ok(id) => return Ok(id),
            Err(StoreError::Duplicate(id)) if attempt < MAX_CREATE_ATTEMPTS => {
                tracing::warn!("Job id {} already taken, retrying", id);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Background work for a single job
struct GenerationTask {
    job_id: Uuid,
    request: GenerationRequest,
    backend: Arc<dyn GenerationBackend>,
    store: Arc<JobStore>,
    storage: Arc<dyn ArtifactStorage>,
    sleeper: Arc<dyn Sleeper>,
    settings: Arc<GenerationSettings>,
}

impl GenerationTask {
    async fn run(self) {
        let outcome = self.generate().await;
        let persisted = outcome.as_ref().ok().map(|(_, path)| path.clone());

        match record_outcome(&self.store, &self.settings, self.job_id, outcome) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::warn!("Job {} was evicted before it finished", self.job_id);
                // Nobody can reach the video any more
                if let Some(path) = persisted {
                    if let Err(e) = self.storage.remove(&path).await {
                        tracing::warn!("Failed to remove orphaned video {}: {}", path.display(), e);
                    }
                }
            }
            Err(err) => {
                tracing::error!("Could not record outcome of job {}: {}", self.job_id, err);
            }
        }
    }

    async fn generate(&self) -> Result<(String, PathBuf), GenerationError> {
        let resolved = resolver::start_generation(
            self.backend.as_ref(),
            &self.settings.candidate_models,
            &self.request,
        )
        .await?;
        tracing::info!(
            "Job {} running on {} as {}",
            self.job_id,
            resolved.model,
            resolved.value.name
        );

        let operation = self.await_completion(resolved.value).await?;
        if let Some(message) = operation.error {
            return Err(GenerationError::OperationFailed(message));
        }

        let artifact = operation
            .artifacts
            .first()
            .ok_or(GenerationError::NoArtifactsProduced)?;
        let bytes = self.backend.fetch_artifact(artifact).await?;
        let path = self.storage.persist(self.job_id, &bytes).await?;

        Ok((self.settings.video_url(self.job_id), path))
    }

    /// Poll until the operation is done or the poll budget runs out
    async fn await_completion(&self, mut operation: Operation) -> Result<Operation, GenerationError> {
        let mut polls = 0;

        while !operation.done {
            if polls == self.settings.max_polls {
                return Err(GenerationError::OperationTimeout {
                    polls,
                    waited: self.settings.poll_interval * polls,
                });
            }

            self.sleeper.sleep(self.settings.poll_interval).await;
            operation = self.backend.poll_operation(&operation).await?;
            polls += 1;

            tracing::debug!(
                "Job {} poll {}/{}: done={}",
                self.job_id,
                polls,
                self.settings.max_polls,
                operation.done
            );
        }

        Ok(operation)
    }
}

/// Move a job into its terminal state
fn record_outcome(
    store: &JobStore,
    settings: &GenerationSettings,
    job_id: Uuid,
    outcome: Result<(String, PathBuf), GenerationError>,
) -> Result<(), StoreError> {
    let substitute = settings.substitute_video_url.as_str();

    match outcome {
        Ok((url, path)) => {
            tracing::info!("Job {} ready: {}", job_id, url);
            store.update(job_id, |job| job.mark_ready(url, Some(path), None))
        }
        Err(err) if err.is_substitutable() => {
            let note = match &err {
                GenerationError::ClientUnavailable => OFFLINE_NOTE,
                _ => ENTITLEMENT_NOTE,
            };
            tracing::warn!("Job {} using substitute clip: {}", job_id, err);
            store.update(job_id, |job| {
                job.mark_ready(substitute, None, Some(note.to_string()))
            })
        }
        Err(err) => {
            tracing::error!("Job {} failed: {}", job_id, err);
            store.update(job_id, |job| job.mark_error(err.to_string(), substitute))
        }
    }
}
