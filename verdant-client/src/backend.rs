//! `GenerationBackend` implementation backed by the Gemini API

use async_trait::async_trait;
use tracing::debug;
use verdant_core::backend::{
    Artifact, BackendError, GenerationBackend, GenerationRequest, Operation,
};

use crate::GeminiClient;

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn start_generation(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<Operation, BackendError> {
        debug!("Starting generation with model {}", model);
        Ok(self.predict_long_running(model, request).await?)
    }

    async fn poll_operation(&self, operation: &Operation) -> Result<Operation, BackendError> {
        debug!("Polling operation {}", operation.name);
        Ok(self.get_operation(&operation.name).await?)
    }

    async fn fetch_artifact(&self, artifact: &Artifact) -> Result<Vec<u8>, BackendError> {
        debug!("Downloading artifact {}", artifact.uri);
        Ok(self.download(&artifact.uri).await?)
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError> {
        debug!("Generating content with model {}", model);
        Ok(GeminiClient::generate_content(self, model, prompt, image, mime_type).await?)
    }
}
