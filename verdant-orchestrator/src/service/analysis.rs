//! Analysis Service
//!
//! Turns an aerial photograph into field analytics using a vision model.
//! Analysis never fails outward: any problem yields the substitute analytics
//! with a note explaining why.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use verdant_core::backend::GenerationBackend;
use verdant_core::domain::analytics::{AnalyticsDraft, FieldAnalytics};

use crate::service::resolver::{self, Exhausted};

/// Vision models tried in order
pub const DEFAULT_ANALYSIS_MODELS: [&str; 3] = [
    "gemini-2.0-flash-lite",
    "gemini-2.5-flash",
    "gemini-flash-latest",
];

#[derive(Debug, Error)]
enum AnalysisError {
    #[error(transparent)]
    Exhausted(#[from] Exhausted),
    #[error("could not parse analysis: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct FieldAnalyzer {
    backend: Option<Arc<dyn GenerationBackend>>,
    models: Vec<String>,
}

impl FieldAnalyzer {
    pub fn new(backend: Option<Arc<dyn GenerationBackend>>, models: Vec<String>) -> Self {
        Self { backend, models }
    }

    /// Analyze a field photograph
    pub async fn analyze(&self, image: &[u8], mime_type: &str, crop_hint: &str) -> FieldAnalytics {
        let Some(backend) = self.backend.as_deref() else {
            tracing::info!("No vision backend configured, using substitute analytics");
            return FieldAnalytics::substitute();
        };

        match self.run(backend, image, mime_type, crop_hint).await {
            Ok(analytics) => analytics,
            Err(e) => {
                tracing::warn!("Field analysis failed: {}", e);
                FieldAnalytics::substitute().with_notes(format!("Analysis unavailable: {}", e))
            }
        }
    }

    async fn run(
        &self,
        backend: &dyn GenerationBackend,
        image: &[u8],
        mime_type: &str,
        crop_hint: &str,
    ) -> Result<FieldAnalytics, AnalysisError> {
        let prompt = build_prompt(crop_hint);

        let resolved = resolver::first_success(&self.models, |model| {
            let prompt = &prompt;
            async move {
                backend
                    .generate_content(&model, prompt, image, mime_type)
                    .await
            }
        })
        .await?;

        let raw: RawAnalysis = serde_json::from_str(strip_fences(&resolved.value))?;
        tracing::debug!("Analysis produced by {}", resolved.model);
        Ok(raw.into())
    }
}

fn build_prompt(crop_hint: &str) -> String {
    let crop_hint = crop_hint.trim();
    let intent = if crop_hint.is_empty() {
        String::new()
    } else {
        format!(" The farmer plans to grow {}.", crop_hint)
    };

    format!(
        "You are an agronomist reviewing an aerial photograph of a land parcel.{intent}\n\
         \n\
         Reply with a single JSON object and nothing else, using exactly these keys:\n\
         {{\n  \
           \"land_area_ha\": number, hectares visible,\n  \
           \"water_need_l_per_day\": number, irrigation litres per day per hectare,\n  \
           \"profit_usd_per_ha\": number, expected profit per hectare per season in USD,\n  \
           \"risk_score\": integer 0-100, 100 meaning extreme risk,\n  \
           \"sustainability_score\": integer 0-100, 100 meaning most sustainable,\n  \
           \"soil_type\": string,\n  \
           \"dominant_vegetation\": string,\n  \
           \"recommended_crop\": string,\n  \
           \"video_prompt\": string, two vivid sentences describing this land flourishing,\n  \
           \"notes\": string, one key observation for the farmer\n\
         }}"
    )
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    match inner.find("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

/// Model output with per-field fallbacks
///
/// Each field is read leniently: numbers may arrive quoted, and a `null`
/// or unusable value falls back to that field's default.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default, deserialize_with = "lenient_number")]
    land_area_ha: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    water_need_l_per_day: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    profit_usd_per_ha: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    risk_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    sustainability_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    soil_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    dominant_vegetation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    recommended_crop: Option<String>,
    #[serde(default, alias = "veo_prompt", deserialize_with = "lenient_text")]
    video_prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    notes: Option<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

impl From<RawAnalysis> for FieldAnalytics {
    fn from(raw: RawAnalysis) -> Self {
        let text = |value: Option<String>, default: &str| {
            value.unwrap_or_else(|| default.to_string())
        };

        AnalyticsDraft {
            land_area_ha: raw.land_area_ha.unwrap_or(10.0),
            water_need_l_per_day: raw.water_need_l_per_day.unwrap_or(3500.0),
            profit_usd_per_ha: raw.profit_usd_per_ha.unwrap_or(1000.0),
            risk_score: raw.risk_score.unwrap_or(30.0),
            sustainability_score: raw.sustainability_score.unwrap_or(65.0),
            soil_type: text(raw.soil_type, "Unknown"),
            dominant_vegetation: text(raw.dominant_vegetation, "Unknown"),
            recommended_crop: text(raw.recommended_crop, "N/A"),
            generation_prompt: raw.video_prompt.unwrap_or_default(),
            is_substitute: false,
            notes: raw.notes.unwrap_or_default(),
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::ScriptedBackend;
    use verdant_core::backend::BackendError;
    use verdant_core::domain::analytics::RiskLabel;

    fn models() -> Vec<String> {
        DEFAULT_ANALYSIS_MODELS.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{\"a\":1}\n```\ntrailing"), "{\"a\":1}");
        assert_eq!(strip_fences("  ```json {\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_prompt_mentions_crop_hint() {
        assert!(build_prompt("maize").contains("plans to grow maize"));
        assert!(!build_prompt("  ").contains("plans to grow"));
    }

    #[tokio::test]
    async fn test_without_backend_returns_substitute() {
        let analyzer = FieldAnalyzer::new(None, models());
        let analytics = analyzer.analyze(b"img", "image/png", "").await;
        assert_eq!(analytics, FieldAnalytics::substitute());
    }

    #[tokio::test]
    async fn test_parses_fenced_reply_with_defaults() {
        let reply = "```json\n{\"land_area_ha\": 4.5, \"risk_score\": 150, \
                     \"veo_prompt\": \"Golden maize sways.\"}\n```";
        let backend = Arc::new(ScriptedBackend::new().with_content(reply));
        let analyzer = FieldAnalyzer::new(Some(backend.clone() as Arc<dyn GenerationBackend>), models());

        let analytics = analyzer.analyze(b"img", "image/png", "maize").await;

        assert!(!analytics.is_substitute());
        assert_eq!(analytics.land_area_ha(), 4.5);
        assert_eq!(analytics.water_need_l_per_day(), 3500.0);
        assert_eq!(analytics.risk_score(), 100);
        assert_eq!(analytics.risk_label(), RiskLabel::Critical);
        assert_eq!(analytics.sustainability_score(), 65);
        assert_eq!(analytics.recommended_crop(), "N/A");
        assert_eq!(analytics.generation_prompt(), "Golden maize sways.");
        assert_eq!(backend.content_models(), vec!["gemini-2.0-flash-lite"]);
    }

    #[tokio::test]
    async fn test_falls_back_across_vision_models() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .fail_content("gemini-2.0-flash-lite", BackendError::Transport("quota".to_string()))
                .with_content("{\"soil_type\": \"Clay\"}"),
        );
        let analyzer = FieldAnalyzer::new(Some(backend.clone() as Arc<dyn GenerationBackend>), models());

        let analytics = analyzer.analyze(b"img", "image/png", "").await;

        assert_eq!(analytics.soil_type(), "Clay");
        assert_eq!(
            backend.content_models(),
            vec!["gemini-2.0-flash-lite", "gemini-2.5-flash"]
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back_to_substitute() {
        let backend = Arc::new(ScriptedBackend::new().with_content("the field looks great"));
        let analyzer = FieldAnalyzer::new(Some(backend as Arc<dyn GenerationBackend>), models());

        let analytics = analyzer.analyze(b"img", "image/png", "").await;

        assert!(analytics.is_substitute());
        assert!(analytics.notes().starts_with("Analysis unavailable"));
    }

    #[tokio::test]
    async fn test_quoted_numbers_and_nulls_use_field_defaults() {
        let reply = "{\"land_area_ha\": \"12.5\", \"risk_score\": \" 70 \", \
                     \"profit_usd_per_ha\": \"lots\", \"soil_type\": \"Clay Loam\", \
                     \"recommended_crop\": null, \"notes\": null}";
        let backend = Arc::new(ScriptedBackend::new().with_content(reply));
        let analyzer = FieldAnalyzer::new(Some(backend as Arc<dyn GenerationBackend>), models());

        let analytics = analyzer.analyze(b"img", "image/png", "").await;

        assert!(!analytics.is_substitute());
        assert_eq!(analytics.land_area_ha(), 12.5);
        assert_eq!(analytics.risk_score(), 70);
        assert_eq!(analytics.profit_usd_per_ha(), 1000.0);
        assert_eq!(analytics.soil_type(), "Clay Loam");
        assert_eq!(analytics.recommended_crop(), "N/A");
        assert_eq!(analytics.notes(), "");
    }

    #[test]
    fn test_null_number_falls_back() {
        let raw: RawAnalysis =
            serde_json::from_str("{\"land_area_ha\": null, \"sustainability_score\": 80}").unwrap();
        let analytics = FieldAnalytics::from(raw);

        assert_eq!(analytics.land_area_ha(), 10.0);
        assert_eq!(analytics.sustainability_score(), 80);
    }
}
