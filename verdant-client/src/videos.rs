//! Veo video generation endpoints

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use verdant_core::backend::{Artifact, GenerationRequest, Operation};

use crate::error::Result;
use crate::{API_KEY_HEADER, GeminiClient};

impl GeminiClient {
    // =============================================================================
    // Long-running Generation
    // =============================================================================

    /// Start a video generation with the given model
    ///
    /// # Arguments
    /// * `model` - Model identifier, e.g. `veo-3.1-generate-preview`
    /// * `request` - Prompt, reference image and output parameters
    ///
    /// # Returns
    /// The started (not yet done) operation
    pub async fn predict_long_running(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<Operation> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        let body = PredictRequest::from(request);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let operation: OperationResponse = self.handle_response(response).await?;
        Ok(operation.into())
    }

    /// Fetch the current state of an operation
    ///
    /// # Arguments
    /// * `name` - Operation resource name returned when it was started
    pub async fn get_operation(&self, name: &str) -> Result<Operation> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let operation: OperationResponse = self.handle_response(response).await?;
        Ok(operation.into())
    }

    /// Download a generated video
    ///
    /// # Arguments
    /// * `uri` - Download URI reported in the finished operation
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        self.handle_bytes(response).await
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    aspect_ratio: String,
    duration_seconds: u32,
    sample_count: u32,
}

impl From<&GenerationRequest> for PredictRequest {
    fn from(request: &GenerationRequest) -> Self {
        let image = (!request.image.is_empty()).then(|| InlineImage {
            bytes_base64_encoded: STANDARD.encode(&request.image),
            mime_type: request.mime_type.clone(),
        });

        Self {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
                image,
            }],
            parameters: PredictParameters {
                aspect_ratio: request.params.aspect_ratio.clone(),
                duration_seconds: request.params.duration_seconds,
                sample_count: request.params.video_count,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResult>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl From<OperationResponse> for Operation {
    fn from(op: OperationResponse) -> Self {
        let artifacts = op
            .response
            .and_then(|r| r.generate_video_response)
            .map(|r| r.generated_samples)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sample| sample.video.and_then(|v| v.uri))
            .map(|uri| Artifact { uri })
            .collect();

        Operation {
            name: op.name,
            done: op.done,
            artifacts,
            error: op.error.map(|e| format!("{} (code {})", e.message, e.code)),
        }
    }
}
