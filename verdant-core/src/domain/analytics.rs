//! Field analytics domain types
//!
//! The structured result of analysing an aerial field photograph. Values are
//! normalised on construction so downstream consumers never see an
//! out-of-range score.

use serde::{Deserialize, Serialize};

/// Risk band derived from a 0-100 risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLabel {
    /// Maps a clamped risk score onto its band
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=33 => RiskLabel::Low,
            34..=59 => RiskLabel::Moderate,
            60..=79 => RiskLabel::High,
            _ => RiskLabel::Critical,
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLabel::Low => write!(f, "Low"),
            RiskLabel::Moderate => write!(f, "Moderate"),
            RiskLabel::High => write!(f, "High"),
            RiskLabel::Critical => write!(f, "Critical"),
        }
    }
}

/// Unvalidated analytics values, as produced by an analysis source
///
/// Convert into [`FieldAnalytics`] to apply clamping and derive the risk label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsDraft {
    pub land_area_ha: f64,
    pub water_need_l_per_day: f64,
    pub profit_usd_per_ha: f64,
    pub risk_score: f64,
    pub sustainability_score: f64,
    pub soil_type: String,
    pub dominant_vegetation: String,
    pub recommended_crop: String,
    pub generation_prompt: String,
    pub is_substitute: bool,
    pub notes: String,
}

/// Analytics derived from an aerial field image
///
/// Immutable once built. `is_substitute` is set whenever the values did not
/// come from a genuine remote analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AnalyticsDraft")]
pub struct FieldAnalytics {
    land_area_ha: f64,
    water_need_l_per_day: f64,
    profit_usd_per_ha: f64,
    risk_score: u8,
    risk_label: RiskLabel,
    sustainability_score: u8,
    soil_type: String,
    dominant_vegetation: String,
    recommended_crop: String,
    generation_prompt: String,
    is_substitute: bool,
    notes: String,
}

impl From<AnalyticsDraft> for FieldAnalytics {
    fn from(draft: AnalyticsDraft) -> Self {
        let risk_score = clamp_score(draft.risk_score);

        Self {
            land_area_ha: non_negative(draft.land_area_ha),
            water_need_l_per_day: non_negative(draft.water_need_l_per_day),
            profit_usd_per_ha: finite_or_zero(draft.profit_usd_per_ha),
            risk_score,
            risk_label: RiskLabel::from_score(risk_score),
            sustainability_score: clamp_score(draft.sustainability_score),
            soil_type: draft.soil_type,
            dominant_vegetation: draft.dominant_vegetation,
            recommended_crop: draft.recommended_crop,
            generation_prompt: draft.generation_prompt,
            is_substitute: draft.is_substitute,
            notes: draft.notes,
        }
    }
}

impl FieldAnalytics {
    /// Fixed analytics used when no genuine analysis is available
    pub fn substitute() -> Self {
        AnalyticsDraft {
            land_area_ha: 12.4,
            water_need_l_per_day: 3800.0,
            profit_usd_per_ha: 1240.0,
            risk_score: 28.0,
            sustainability_score: 74.0,
            soil_type: "Sandy Loam".to_string(),
            dominant_vegetation: "Sparse Grass / Barren".to_string(),
            recommended_crop: "Wheat / Sorghum".to_string(),
            generation_prompt: "Cinematic aerial timelapse of a 12-hectare sandy-loam field. \
                Time begins in early spring with bare rows of dark soil. Over the sequence \
                wheat seedlings emerge, grow into tall golden stalks, irrigation channels \
                glisten in the sunlight, and the field transforms into a lush, productive \
                farmland. Drone shot slowly orbiting the field."
                .to_string(),
            is_substitute: true,
            notes: "Substitute analytics: configure GEMINI_API_KEY for a real analysis."
                .to_string(),
        }
        .into()
    }

    /// Returns a copy with the notes replaced
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn land_area_ha(&self) -> f64 {
        self.land_area_ha
    }

    pub fn water_need_l_per_day(&self) -> f64 {
        self.water_need_l_per_day
    }

    pub fn profit_usd_per_ha(&self) -> f64 {
        self.profit_usd_per_ha
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    pub fn risk_label(&self) -> RiskLabel {
        self.risk_label
    }

    pub fn sustainability_score(&self) -> u8 {
        self.sustainability_score
    }

    pub fn soil_type(&self) -> &str {
        &self.soil_type
    }

    pub fn dominant_vegetation(&self) -> &str {
        &self.dominant_vegetation
    }

    pub fn recommended_crop(&self) -> &str {
        &self.recommended_crop
    }

    /// Prompt handed to the video backend
    pub fn generation_prompt(&self) -> &str {
        &self.generation_prompt
    }

    pub fn is_substitute(&self) -> bool {
        self.is_substitute
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
