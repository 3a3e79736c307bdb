//! Multimodal content generation endpoint

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::{API_KEY_HEADER, GeminiClient};

impl GeminiClient {
    /// Generate text from an image and a prompt
    ///
    /// # Arguments
    /// * `model` - Model identifier, e.g. `gemini-2.5-flash`
    /// * `prompt` - Instruction text sent after the image
    /// * `image` - Raw image bytes
    /// * `mime_type` - MIME type of the image
    ///
    /// # Returns
    /// The concatenated text of the first candidate
    pub async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(image),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: GenerateContentResponse = self.handle_response(response).await?;
        parsed.first_text()
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if !text.is_empty() {
            return Ok(text);
        }

        let reason = self
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        Err(ClientError::ParseError(format!("empty generation: {}", reason)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_joins_parts() {
        let json = serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}
            ]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.first_text().unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_blocked_prompt_is_parse_error() {
        let json = serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        });
        let parsed: GenerateContentResponse = serde_json::from_value(json).unwrap();
        let err = parsed.first_text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_request_part_shapes() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AA==".to_string(),
                        },
                    },
                    Part::Text {
                        text: "describe".to_string(),
                    },
                ],
            }],
        };

        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(value["contents"][0]["parts"][1]["text"], "describe");
    }
}
