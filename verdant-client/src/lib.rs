//! Verdant Gemini Client
//!
//! A small, type-safe HTTP client for the Gemini API endpoints Verdant uses:
//! long-running Veo video generation and multimodal content generation.
//!
//! [`GeminiClient`] implements [`verdant_core::backend::GenerationBackend`], so
//! the orchestrator never sees HTTP details. Failures are classified at this
//! boundary (see [`ClientError::is_entitlement`]).
//!
//! # Example
//!
//! ```no_run
//! use verdant_client::GeminiClient;
//! use verdant_core::backend::{GenerationRequest, OutputParams};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GeminiClient::new("my-api-key")?;
//!
//!     let operation = client
//!         .predict_long_running(
//!             "veo-3.0-generate-001",
//!             &GenerationRequest {
//!                 prompt: "a peaceful farm at sunset".to_string(),
//!                 image: Vec::new(),
//!                 mime_type: "image/png".to_string(),
//!                 params: OutputParams::default(),
//!             },
//!         )
//!         .await?;
//!
//!     println!("Started operation: {}", operation.name);
//!     Ok(())
//! }
//! ```

mod backend;
mod content;
pub mod error;
mod videos;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Default Gemini API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// Base URL of the API (e.g., "https://generativelanguage.googleapis.com/v1beta")
    base_url: String,
    /// API key sent with every request
    api_key: String,
    /// HTTP client instance
    client: Client,
}

impl GeminiClient {
    /// Create a new client against the default endpoint
    ///
    /// Fails with [`ClientError::MissingCredentials`] when the key is blank.
    ///
    /// # Example
    /// ```
    /// use verdant_client::GeminiClient;
    ///
    /// let client = GeminiClient::new("my-api-key").unwrap();
    /// assert!(GeminiClient::new("  ").is_err());
    /// ```
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_client(DEFAULT_BASE_URL, api_key, Client::new())
    }

    /// Create a new client with a custom base URL and HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, or point
    /// the client at a test server.
    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::MissingCredentials);
        }

        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client,
        })
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that carries a binary body
    async fn handle_bytes(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let response = self.check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new("key").unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GeminiClient::with_client("http://localhost:9000/", "key", Client::new())
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_blank_key_is_missing_credentials() {
        let err = GeminiClient::new("").unwrap_err();
        assert!(matches!(err, ClientError::MissingCredentials));
    }
}
