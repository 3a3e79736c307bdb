//! Probe command handler
//!
//! Talks to the Gemini API directly to check whether a video model accepts
//! requests with the configured key.

use anyhow::Result;
use colored::*;
use verdant_client::{ClientError, GeminiClient};
use verdant_core::backend::{GenerationRequest, OutputParams};

/// Start a single generation and report how the backend answered
pub async fn handle_probe(model: &str, prompt: &str, api_key: &str) -> Result<()> {
    let client = GeminiClient::new(api_key)?;
    let request = GenerationRequest {
        prompt: prompt.to_string(),
        image: Vec::new(),
        mime_type: String::new(),
        params: OutputParams::default(),
    };

    println!("{}", format!("Probing {}...", model).dimmed());

    match client.predict_long_running(model, &request).await {
        Ok(operation) => {
            println!("{}", "✓ Model accepted the request".green());
            println!("  Operation: {}", operation.name.cyan());
            Ok(())
        }
        Err(err) => {
            println!("{}", format!("✗ {}", classify(&err)).red());
            println!("  {}", err.to_string().dimmed());
            Err(err.into())
        }
    }
}

fn classify(err: &ClientError) -> &'static str {
    if err.is_entitlement() {
        "Billing must be enabled for this model"
    } else if err.is_not_found() {
        "Model not found for this key"
    } else {
        match err {
            ClientError::MissingCredentials => "No API key configured",
            ClientError::RequestFailed(_) => "Could not reach the API",
            ClientError::ApiError { status: 429, .. } => "Quota exhausted",
            ClientError::ApiError { .. } => "Request rejected",
            ClientError::ParseError(_) => "Unexpected response",
        }
    }
}
