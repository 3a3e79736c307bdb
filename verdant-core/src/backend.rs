//! Generation backend interface
//!
//! The orchestrator talks to the remote generation service only through
//! [`GenerationBackend`]. Implementations classify their failures into
//! [`BackendError`] at the boundary so callers can branch on the kind of
//! failure instead of inspecting messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed output parameters for a video generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputParams {
    pub aspect_ratio: String,
    pub duration_seconds: u32,
    pub video_count: u32,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            duration_seconds: 6,
            video_count: 1,
        }
    }
}

/// Everything needed to start one remote video generation
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
    pub params: OutputParams,
}

/// A media file produced by a finished operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub uri: String,
}

/// Handle to a long-running remote operation
///
/// Refreshed by [`GenerationBackend::poll_operation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub done: bool,
    pub artifacts: Vec<Artifact>,
    /// Failure reported by the backend for a finished operation
    pub error: Option<String>,
}

impl Operation {
    /// A freshly started operation that has not finished yet
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            artifacts: Vec::new(),
            error: None,
        }
    }
}

/// Classified failure from the generation backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend refused the request
    #[error("backend rejected request (status {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The account lacks billing or entitlement for the requested model
    #[error("entitlement required: {message}")]
    Entitlement { message: String },

    /// The response could not be understood
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn is_entitlement(&self) -> bool {
        matches!(self, BackendError::Entitlement { .. })
    }
}

/// Capability client for the remote generation service
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Starts a long-running video generation with the given model
    async fn start_generation(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<Operation, BackendError>;

    /// Fetches the current state of an operation
    async fn poll_operation(&self, operation: &Operation) -> Result<Operation, BackendError>;

    /// Downloads the bytes of a produced artifact
    async fn fetch_artifact(&self, artifact: &Artifact) -> Result<Vec<u8>, BackendError>;

    /// Runs a single multimodal text generation over an image
    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError>;
}
