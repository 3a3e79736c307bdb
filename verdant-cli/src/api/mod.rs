//! API client module
//!
//! HTTP client for communicating with the Verdant server API.

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use uuid::Uuid;
use verdant_core::dto::analysis::AnalyzeResponse;
use verdant_core::dto::job::{JobView, SweepReport};

/// HTTP client for the Verdant server API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Upload a field photograph for analysis
    ///
    /// # Arguments
    /// * `image` - Raw image bytes
    /// * `file_name` - Name sent with the upload
    /// * `mime_type` - MIME type of the image
    /// * `crop_hint` - Optional crop the farmer intends to grow
    ///
    /// # Returns
    /// The analytics and the id of the video job
    pub async fn analyze(
        &self,
        image: Vec<u8>,
        file_name: &str,
        mime_type: &str,
        crop_hint: Option<&str>,
    ) -> Result<AnalyzeResponse> {
        let url = format!("{}/api/field-vision/analyze", self.base_url);

        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .context("Invalid image MIME type")?;
        let mut form = Form::new().part("image", part);
        if let Some(hint) = crop_hint {
            form = form.text("crop_hint", hint.to_string());
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send analyze request")?;

        self.handle_response(response).await
    }

    /// Get a job by ID
    ///
    /// # Arguments
    /// * `id` - The job UUID
    ///
    /// # Returns
    /// The job details
    pub async fn get_job(&self, id: Uuid) -> Result<JobView> {
        let url = format!("{}/api/field-vision/job/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get job request")?;

        self.handle_response(response).await
    }

    /// Evict expired jobs on the server
    ///
    /// # Arguments
    /// * `max_age_seconds` - Age threshold, server default when `None`
    pub async fn sweep(&self, max_age_seconds: Option<u64>) -> Result<SweepReport> {
        let url = format!("{}/api/field-vision/sweep", self.base_url);
        let mut request = self.client.post(&url);
        if let Some(max_age) = max_age_seconds {
            request = request.query(&[("max_age_seconds", max_age)]);
        }

        let response = request
            .send()
            .await
            .context("Failed to send sweep request")?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize JSON
    ///
    /// # Arguments
    /// * `response` - The HTTP response
    ///
    /// # Returns
    /// The deserialized response body
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&error_text)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or(error_text);
            anyhow::bail!("Request failed with status {}: {}", status, message);
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}
