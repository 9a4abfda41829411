use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::Classification;

/// Wrapper shared by every JSON response of the analysis backend.
///
/// `data` is always populated, even when `error` is set: a failed operation
/// still carries simulated values so the wizard can keep moving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub error: bool,
    pub message: String,
    #[serde(default)]
    pub simulated: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            simulated: false,
            data,
        }
    }

    pub fn simulated_failure(message: impl Into<String>, data: T) -> Self {
        Self {
            error: true,
            message: message.into(),
            simulated: true,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentData {
    pub mask_url: String,
    #[serde(deserialize_with = "number_or_string")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictData {
    pub classification: Classification,
    #[serde(deserialize_with = "number_or_string")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradcamData {
    pub gradcam_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_intensity: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub accuracy: String,
    pub precision: String,
    pub recall: String,
    pub f1_score: String,
    pub auc: String,
}

impl ModelMetrics {
    /// Illustrative values shown when the backend cannot be reached.
    pub fn illustrative() -> Self {
        Self {
            accuracy: "0.923".into(),
            precision: "0.891".into(),
            recall: "0.887".into(),
            f1_score: "0.889".into(),
            auc: "0.945".into(),
        }
    }

    /// Flattens into the wire key order: accuracy, precision, recall, f1Score, auc.
    pub fn into_entries(self) -> Vec<(String, String)> {
        vec![
            ("accuracy".to_string(), self.accuracy),
            ("precision".to_string(), self.precision),
            ("recall".to_string(), self.recall),
            ("f1Score".to_string(), self.f1_score),
            ("auc".to_string(), self.auc),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub pdf_url: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// JSON-safe view of a client analysis record, sent with report requests.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default)]
    pub mask_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradcam_url: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub analysis_data: AnalysisSummary,
    pub selected_model: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderPdfNote {
    pub message: String,
    pub download_url: String,
    pub note: String,
}

/// Accepts `0.873` as well as `"0.873"`; backends format scores either way.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid numeric value '{text}'"))),
    }
}
